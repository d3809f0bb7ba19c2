//! Binary SVM training
//!
//! Couples a kernel with the SMO solver and turns the dual solution into a
//! compact model that keeps only the support vectors.

use crate::core::{OptimizationResult, OptimizerConfig, Result, SVMError};
use crate::kernel::Kernel;
use crate::kernel::linear::dot;
use crate::solver::SMOSolver;
use std::sync::Arc;

/// Binary SVM trainer over rows labeled `+1.0` / `-1.0`
pub struct SVMOptimizer<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel> SVMOptimizer<K> {
    /// Create a new SVM optimizer with the given kernel and configuration
    pub fn new(kernel: K, config: OptimizerConfig) -> Self {
        Self::with_shared_kernel(Arc::new(kernel), config)
    }

    /// Create an optimizer that shares its kernel with other models
    pub fn with_shared_kernel(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    /// Train on dense rows and binary labels
    pub fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<TrainedSVM<K>> {
        let solver = SMOSolver::new(Arc::clone(&self.kernel), self.config.clone());
        let result = solver.solve(x, y)?;
        Ok(TrainedSVM::from_solution(Arc::clone(&self.kernel), x, y, result))
    }

    /// Get the optimizer configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Get the kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// A trained binary SVM: `f(x) = Σ coefᵢ K(svᵢ, x) + b`, with `coefᵢ = αᵢyᵢ`
///
/// Immutable once built. Positive decision values mean the `+1` class.
#[derive(Debug, Clone)]
pub struct TrainedSVM<K: Kernel> {
    kernel: Arc<K>,
    support_vectors: Vec<Vec<f64>>,
    dual_coef: Vec<f64>,
    bias: f64,
    support_indices: Vec<usize>,
    iterations: usize,
}

impl<K: Kernel> TrainedSVM<K> {
    fn from_solution(
        kernel: Arc<K>,
        x: &[Vec<f64>],
        y: &[f64],
        result: OptimizationResult,
    ) -> Self {
        let support_vectors = result
            .support_vectors
            .iter()
            .map(|&i| x[i].clone())
            .collect();
        let dual_coef = result
            .support_vectors
            .iter()
            .map(|&i| result.alpha[i] * y[i])
            .collect();

        Self {
            kernel,
            support_vectors,
            dual_coef,
            bias: result.b,
            support_indices: result.support_vectors,
            iterations: result.iterations,
        }
    }

    /// Rebuild a model from stored parts (used when loading saved models)
    pub fn from_parts(
        kernel: Arc<K>,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
        bias: f64,
    ) -> Result<Self> {
        if support_vectors.len() != dual_coef.len() {
            return Err(SVMError::DimensionMismatch {
                expected: support_vectors.len(),
                actual: dual_coef.len(),
            });
        }
        if let Some(first) = support_vectors.first() {
            let dim = first.len();
            if let Some(sv) = support_vectors.iter().find(|sv| sv.len() != dim) {
                return Err(SVMError::DimensionMismatch {
                    expected: dim,
                    actual: sv.len(),
                });
            }
        }
        let support_indices = (0..support_vectors.len()).collect();
        Ok(Self {
            kernel,
            support_vectors,
            dual_coef,
            bias,
            support_indices,
            iterations: 0,
        })
    }

    /// Decision function value for a row
    pub fn decision_function(&self, features: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * self.kernel.compute(sv, features))
            .sum::<f64>()
            + self.bias
    }

    /// Predicted sign: `1.0` or `-1.0`
    pub fn predict_sign(&self, features: &[f64]) -> f64 {
        if self.decision_function(features) >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Hyperplane normal `w = Σ coefᵢ svᵢ`, available for linear kernels only
    pub fn weights(&self) -> Option<Vec<f64>> {
        if !self.kernel.is_linear() {
            return None;
        }
        let dim = self.support_vectors.first().map_or(0, Vec::len);
        let mut w = vec![0.0; dim];
        for (sv, coef) in self.support_vectors.iter().zip(&self.dual_coef) {
            for (wk, xk) in w.iter_mut().zip(sv) {
                *wk += coef * xk;
            }
        }
        Some(w)
    }

    /// Geometric margin width `2 / ||w||` for linear models
    pub fn margin_width(&self) -> Option<f64> {
        let w = self.weights()?;
        let norm = dot(&w, &w).sqrt();
        if norm > 0.0 {
            Some(2.0 / norm)
        } else {
            None
        }
    }

    pub fn support_vectors(&self) -> &[Vec<f64>] {
        &self.support_vectors
    }

    /// Dual coefficients `αᵢyᵢ`, aligned with [`Self::support_vectors`]
    pub fn dual_coef(&self) -> &[f64] {
        &self.dual_coef
    }

    /// Indices of support vectors in the training rows
    pub fn support_vector_indices(&self) -> &[usize] {
        &self.support_indices
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Solver iterations spent (0 for models rebuilt from parts)
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}
