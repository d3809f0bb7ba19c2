//! Runtime-selectable kernel

use crate::core::{Result, SVMError};
use crate::kernel::{Kernel, LinearKernel, RBFKernel};
use serde::{Deserialize, Serialize};

/// Kernel chosen at runtime from configuration, CLI flags or a saved model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Rbf { gamma: f64 },
}

impl Default for KernelKind {
    fn default() -> Self {
        KernelKind::Linear
    }
}

impl KernelKind {
    /// Build an RBF kernel, defaulting gamma to 1 / n_features
    pub fn rbf(gamma: Option<f64>, n_features: usize) -> Result<Self> {
        let gamma = match gamma {
            Some(g) => g,
            None if n_features > 0 => 1.0 / n_features as f64,
            None => {
                return Err(SVMError::InvalidParameter(
                    "cannot derive gamma for zero features".to_string(),
                ))
            }
        };
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "gamma must be positive, got: {gamma}"
            )));
        }
        Ok(KernelKind::Rbf { gamma })
    }
}

impl Kernel for KernelKind {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        match *self {
            KernelKind::Linear => LinearKernel.compute(x, y),
            KernelKind::Rbf { gamma } => RBFKernel::new(gamma).compute(x, y),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            KernelKind::Linear => "linear",
            KernelKind::Rbf { .. } => "rbf",
        }
    }

    fn is_linear(&self) -> bool {
        matches!(self, KernelKind::Linear)
    }
}
