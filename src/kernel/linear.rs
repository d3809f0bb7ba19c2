//! Linear kernel implementation

use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
///
/// The kernel used by the Iris walkthrough. A model trained with it has an
/// explicit hyperplane normal, see [`crate::optimizer::TrainedSVM::weights`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        dot(x, y)
    }

    fn name(&self) -> &'static str {
        "linear"
    }

    fn is_linear(&self) -> bool {
        true
    }
}

/// Dot product of two dense rows
pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
