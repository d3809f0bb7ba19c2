//! Multiclass SVM classifier
//!
//! [`SVC`] trains one binary SVM per pair of classes (one-vs-one) and
//! predicts by majority vote.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use iris_svm::api::SVC;
//! use iris_svm::data::iris;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = iris()?;
//! let model = SVC::new().with_c(1.0).fit(&dataset)?;
//!
//! let prediction = model.predict(&[5.1, 3.5, 1.4, 0.2])?;
//! println!("class: {}", dataset.target_names()[prediction.label]);
//! println!("accuracy: {:.2}", model.score(&dataset)?);
//! # Ok(())
//! # }
//! ```

use crate::core::{Classifier, OptimizerConfig, Prediction, Result, SVMError};
use crate::data::LabeledDataset;
use crate::kernel::{Kernel, LinearKernel};
use crate::metrics::accuracy;
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

/// Multiclass SVM with builder-style configuration
pub struct SVC<K: Kernel = LinearKernel> {
    kernel: K,
    config: OptimizerConfig,
}

impl SVC<LinearKernel> {
    /// Create a linear SVC with default parameters
    pub fn new() -> Self {
        Self::with_kernel(LinearKernel::new())
    }
}

impl Default for SVC<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> SVC<K> {
    /// Create an SVC with a custom kernel
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: OptimizerConfig::default(),
        }
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set maximum number of iterations per pairwise problem
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Train one binary SVM per pair of classes present in `dataset`
    pub fn fit(self, dataset: &LabeledDataset) -> Result<TrainedModel<K>> {
        self.config.validate()?;

        let counts = dataset.class_counts();
        let present: Vec<usize> = (0..counts.len()).filter(|&k| counts[k] > 0).collect();
        if present.len() < 2 {
            return Err(SVMError::InvalidDataset(format!(
                "need at least two classes to train, found {}",
                present.len()
            )));
        }

        let kernel = Arc::new(self.kernel);
        let optimizer = SVMOptimizer::with_shared_kernel(Arc::clone(&kernel), self.config);

        let mut pairs = Vec::with_capacity(present.len() * (present.len() - 1) / 2);
        for (i, &positive) in present.iter().enumerate() {
            for &negative in &present[i + 1..] {
                let mut x = Vec::with_capacity(counts[positive] + counts[negative]);
                let mut y = Vec::with_capacity(x.capacity());
                for (row, &target) in dataset.records().iter().zip(dataset.targets()) {
                    if target == positive {
                        x.push(row.clone());
                        y.push(1.0);
                    } else if target == negative {
                        x.push(row.clone());
                        y.push(-1.0);
                    }
                }

                let model = optimizer.train(&x, &y)?;
                debug!(
                    "Pair ({positive}, {negative}): {} support vectors, bias {:.4}, {} iterations",
                    model.n_support_vectors(),
                    model.bias(),
                    model.iterations()
                );
                pairs.push(PairwiseModel {
                    positive,
                    negative,
                    model,
                });
            }
        }

        info!(
            "Trained {} pairwise {} models on {} rows",
            pairs.len(),
            kernel.name(),
            dataset.n_samples()
        );

        Ok(TrainedModel {
            kernel,
            pairs,
            class_names: dataset.target_names().to_vec(),
            feature_names: dataset.feature_names().to_vec(),
        })
    }
}

/// Binary model separating class `positive` (+1) from class `negative` (-1)
#[derive(Debug, Clone)]
pub struct PairwiseModel<K: Kernel> {
    pub positive: usize,
    pub negative: usize,
    pub model: TrainedSVM<K>,
}

/// Fitted one-vs-one classifier
#[derive(Debug, Clone)]
pub struct TrainedModel<K: Kernel> {
    kernel: Arc<K>,
    pairs: Vec<PairwiseModel<K>>,
    class_names: Vec<String>,
    feature_names: Vec<String>,
}

impl<K: Kernel> TrainedModel<K> {
    /// Assemble a classifier from already trained pairwise models
    pub fn from_pairwise(
        kernel: Arc<K>,
        pairs: Vec<PairwiseModel<K>>,
        class_names: Vec<String>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if pairs.is_empty() {
            return Err(SVMError::InvalidDataset(
                "a classifier needs at least one pairwise model".to_string(),
            ));
        }
        let n_classes = class_names.len();
        if let Some(pair) = pairs
            .iter()
            .find(|p| p.positive >= n_classes || p.negative >= n_classes || p.positive == p.negative)
        {
            return Err(SVMError::InvalidDataset(format!(
                "invalid class pair ({}, {}) for {n_classes} classes",
                pair.positive, pair.negative
            )));
        }
        let width = feature_names.len();
        for pair in &pairs {
            if let Some(sv) = pair.model.support_vectors().iter().find(|sv| sv.len() != width) {
                return Err(SVMError::DimensionMismatch {
                    expected: width,
                    actual: sv.len(),
                });
            }
        }

        Ok(Self {
            kernel,
            pairs,
            class_names,
            feature_names,
        })
    }

    /// Predict a single row by pairwise majority vote
    ///
    /// Ties go to the lowest class index.
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        self.check_width(features.len())?;

        let mut votes = vec![0usize; self.n_classes()];
        let decision_values: Vec<f64> = self
            .pairs
            .iter()
            .map(|pair| {
                let value = pair.model.decision_function(features);
                if value >= 0.0 {
                    votes[pair.positive] += 1;
                } else {
                    votes[pair.negative] += 1;
                }
                value
            })
            .collect();

        let mut label = 0;
        for (k, &v) in votes.iter().enumerate() {
            if v > votes[label] {
                label = k;
            }
        }
        Ok(Prediction::new(label, votes[label], decision_values))
    }

    /// Predict several rows
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<Prediction>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Predict every row of a dataset
    pub fn predict_dataset(&self, dataset: &LabeledDataset) -> Result<Vec<Prediction>> {
        self.check_width(dataset.n_features())?;
        self.predict_batch(dataset.records())
    }

    /// Predicted class indices for every row of a dataset
    pub fn predict_labels(&self, dataset: &LabeledDataset) -> Result<Vec<usize>> {
        Ok(self
            .predict_dataset(dataset)?
            .into_iter()
            .map(|p| p.label)
            .collect())
    }

    /// Mean accuracy on a labeled dataset
    pub fn score(&self, dataset: &LabeledDataset) -> Result<f64> {
        let predicted = self.predict_labels(dataset)?;
        accuracy(dataset.targets(), &predicted)
    }

    /// Summary of the fitted model
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            kernel: self.kernel.name().to_string(),
            class_names: self.class_names.clone(),
            n_features: self.n_features(),
            pairs: self
                .pairs
                .iter()
                .map(|p| PairInfo {
                    positive: p.positive,
                    negative: p.negative,
                    n_support_vectors: p.model.n_support_vectors(),
                    bias: p.model.bias(),
                    iterations: p.model.iterations(),
                })
                .collect(),
        }
    }

    pub fn pairwise_models(&self) -> &[PairwiseModel<K>] {
        &self.pairs
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features() {
            return Err(SVMError::DimensionMismatch {
                expected: self.n_features(),
                actual: width,
            });
        }
        Ok(())
    }
}

impl<K: Kernel> Classifier for TrainedModel<K> {
    fn predict(&self, features: &[f64]) -> Result<Prediction> {
        TrainedModel::predict(self, features)
    }

    fn n_classes(&self) -> usize {
        TrainedModel::n_classes(self)
    }
}

/// Per-pair training summary
#[derive(Debug, Clone, PartialEq)]
pub struct PairInfo {
    pub positive: usize,
    pub negative: usize,
    pub n_support_vectors: usize,
    pub bias: f64,
    pub iterations: usize,
}

/// Model information
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub kernel: String,
    pub class_names: Vec<String>,
    pub n_features: usize,
    pub pairs: Vec<PairInfo>,
}

impl ModelInfo {
    /// Support vectors summed over all pairwise models
    pub fn total_support_vectors(&self) -> usize {
        self.pairs.iter().map(|p| p.n_support_vectors).sum()
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kernel: {}", self.kernel)?;
        writeln!(f, "Classes: {}", self.class_names.join(", "))?;
        writeln!(f, "Features: {}", self.n_features)?;
        writeln!(f, "Pairwise models: {}", self.pairs.len())?;
        for p in &self.pairs {
            let name = |k: usize| self.class_names.get(k).map_or("?", String::as_str);
            writeln!(
                f,
                "  {} vs {}: {} support vectors, bias {:.6}",
                name(p.positive),
                name(p.negative),
                p.n_support_vectors,
                p.bias
            )?;
        }
        write!(f, "Total support vectors: {}", self.total_support_vectors())
    }
}
