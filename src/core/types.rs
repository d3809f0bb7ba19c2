//! Core type definitions shared by the solver, models and metrics

/// Prediction for a single row: the winning class and its vote count
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class index
    pub label: usize,
    /// Number of pairwise classifiers that voted for `label`
    pub votes: usize,
    /// Raw decision values, one per class pair in training order
    pub decision_values: Vec<f64>,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: usize, votes: usize, decision_values: Vec<f64>) -> Self {
        Self {
            label,
            votes,
            decision_values,
        }
    }

    /// Confidence as the largest absolute pairwise decision value
    pub fn confidence(&self) -> f64 {
        self.decision_values
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

/// A labeled row: dense feature values and a class index
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Dense feature values
    pub features: Vec<f64>,
    /// Class index
    pub label: usize,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: Vec<f64>, label: usize) -> Self {
        Self { features, label }
    }

    /// Number of features in this row
    pub fn dim(&self) -> usize {
        self.features.len()
    }
}

/// Result of optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b)
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final dual objective value (maximization form)
    pub objective_value: f64,
}

/// Configuration for optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance on the KKT violation gap
    pub epsilon: f64,
    /// Maximum number of pair updates
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 100_000,
            cache_size: 16_000_000, // 16MB
        }
    }
}

impl OptimizerConfig {
    /// Check that the configuration describes a solvable problem
    pub fn validate(&self) -> crate::core::Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(crate::core::SVMError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.c
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(crate::core::SVMError::InvalidParameter(format!(
                "epsilon must be positive, got: {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(crate::core::SVMError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
