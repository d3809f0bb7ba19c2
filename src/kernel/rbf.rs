//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)

use crate::kernel::Kernel;

/// RBF kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// The gamma parameter controls the reach of each training example:
/// - High gamma: close points dominate (potential overfitting)
/// - Low gamma: distant points still matter (potential underfitting)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    ///
    /// # Panics
    /// Panics if gamma is not positive
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0, "Gamma must be positive, got: {}", gamma);
        Self { gamma }
    }

    /// Create RBF kernel with gamma = 1.0 / n_features
    pub fn with_auto_gamma(n_features: usize) -> Self {
        assert!(n_features > 0, "Number of features must be positive");
        Self::new(1.0 / n_features as f64)
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for RBFKernel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }

    fn name(&self) -> &'static str {
        "rbf"
    }
}

/// Squared Euclidean distance between two dense rows
fn squared_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}
