//! Kernel trait definition

/// Kernel function trait
///
/// A kernel function K(x, y) must satisfy Mercer's condition to be valid for SVM.
/// Rows are dense and of equal length; implementations may assume this.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// Short identifier used in logs and saved models
    fn name(&self) -> &'static str;

    /// Whether K(x, y) is the plain dot product, so a trained model
    /// can be collapsed into an explicit weight vector
    fn is_linear(&self) -> bool {
        false
    }
}
