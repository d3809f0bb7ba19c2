//! Seeded train/test partitioning

use crate::core::{Result, SVMError};
use crate::data::LabeledDataset;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A disjoint partition of a dataset's rows
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
    /// Row indices of `train` in the source dataset
    pub train_indices: Vec<usize>,
    /// Row indices of `test` in the source dataset
    pub test_indices: Vec<usize>,
}

/// Number of test rows for `n` samples: `ceil(n * test_size)`
pub fn test_count(n_samples: usize, test_size: f64) -> Result<usize> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SVMError::InvalidParameter(format!(
            "test_size must be between 0 and 1, got: {test_size}"
        )));
    }
    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SVMError::InvalidParameter(format!(
            "test_size {test_size} leaves an empty subset for {n_samples} samples"
        )));
    }
    Ok(n_test)
}

/// Shuffle row indices with `StdRng` seeded from `seed` and cut them into
/// test and train parts
///
/// The first `ceil(n * test_size)` shuffled indices form the test subset.
pub fn train_test_split(
    dataset: &LabeledDataset,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = dataset.n_samples();
    let n_test = test_count(n, test_size)?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();
    debug!(
        "Split {} rows into {} train / {} test (seed={})",
        n,
        train_indices.len(),
        test_indices.len(),
        seed
    );

    Ok(TrainTestSplit {
        train: dataset.subset(&train_indices)?,
        test: dataset.subset(&test_indices)?,
        train_indices,
        test_indices,
    })
}
