//! Labeled datasets
//!
//! [`LabeledDataset`] owns a dense sample matrix, the aligned class indices
//! and the names of both. The bundled Iris table is available through
//! [`iris`]; other tables in the same CSV layout load through
//! [`LabeledDataset::from_csv_file`].

pub mod csv;
pub mod iris;

pub use self::iris::*;

use crate::core::{Dataset, Result, SVMError, Sample};

/// Dense feature matrix with aligned class labels
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    records: Vec<Vec<f64>>,
    targets: Vec<usize>,
    feature_names: Vec<String>,
    target_names: Vec<String>,
}

impl LabeledDataset {
    /// Build a dataset, checking that rows, labels and names line up
    pub fn new(
        records: Vec<Vec<f64>>,
        targets: Vec<usize>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if records.len() != targets.len() {
            return Err(SVMError::DimensionMismatch {
                expected: records.len(),
                actual: targets.len(),
            });
        }
        let width = feature_names.len();
        if let Some(row) = records.iter().find(|row| row.len() != width) {
            return Err(SVMError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        if let Some(&target) = targets.iter().find(|&&t| t >= target_names.len()) {
            return Err(SVMError::InvalidDataset(format!(
                "class index {target} has no name ({} classes known)",
                target_names.len()
            )));
        }

        Ok(Self {
            records,
            targets,
            feature_names,
            target_names,
        })
    }

    /// Same labels and names, different feature values (e.g. after scaling)
    pub fn with_records(&self, records: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(
            records,
            self.targets.clone(),
            self.feature_names.clone(),
            self.target_names.clone(),
        )
    }

    /// Rows at `indices`, in that order
    ///
    /// # Panics
    /// Panics if an index is out of bounds
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        Self::new(
            indices.iter().map(|&i| self.records[i].clone()).collect(),
            indices.iter().map(|&i| self.targets[i]).collect(),
            self.feature_names.clone(),
            self.target_names.clone(),
        )
    }

    /// Project onto the given feature columns
    pub fn select_features(&self, columns: &[usize]) -> Result<Self> {
        if columns.is_empty() {
            return Err(SVMError::InvalidParameter(
                "at least one feature column is required".to_string(),
            ));
        }
        if let Some(&col) = columns.iter().find(|&&c| c >= self.n_features()) {
            return Err(SVMError::InvalidParameter(format!(
                "feature column {col} out of range (dataset has {} features)",
                self.n_features()
            )));
        }

        let records = self
            .records
            .iter()
            .map(|row| columns.iter().map(|&c| row[c]).collect())
            .collect();
        let feature_names = columns
            .iter()
            .map(|&c| self.feature_names[c].clone())
            .collect();
        Self::new(
            records,
            self.targets.clone(),
            feature_names,
            self.target_names.clone(),
        )
    }

    pub fn records(&self) -> &[Vec<f64>] {
        &self.records
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn n_samples(&self) -> usize {
        self.records.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_classes(&self) -> usize {
        self.target_names.len()
    }

    /// Number of rows per class index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &t in &self.targets {
            counts[t] += 1;
        }
        counts
    }

    /// Per-feature (min, max) over all rows
    pub fn feature_ranges(&self) -> Vec<(f64, f64)> {
        (0..self.n_features())
            .map(|c| {
                self.records.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), row| (lo.min(row[c]), hi.max(row[c])),
                )
            })
            .collect()
    }
}

impl Dataset for LabeledDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn dim(&self) -> usize {
        self.n_features()
    }

    fn get_sample(&self, i: usize) -> Sample {
        Sample::new(self.records[i].clone(), self.targets[i])
    }

    fn get_labels(&self) -> Vec<usize> {
        self.targets.clone()
    }
}
