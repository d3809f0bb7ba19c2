//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the binary C-SVM dual problem
//!
//! ```text
//! min  ½ αᵀQα − eᵀα
//! s.t. yᵀα = 0,  0 ≤ αᵢ ≤ C,  Qᵢⱼ = yᵢ yⱼ K(xᵢ, xⱼ)
//! ```
//!
//! by repeatedly optimizing the maximal violating pair of multipliers.
//! The solver tracks `Eᵢ = Σⱼ αⱼ yⱼ K(xᵢ, xⱼ) − yᵢ` (the prediction error
//! without bias), which equals `yᵢ ∇f(α)ᵢ` and therefore drives both the
//! working-set selection and the stopping rule.

use crate::cache::KernelCache;
use crate::core::{OptimizationResult, OptimizerConfig, Result, SVMError};
use crate::kernel::Kernel;
use log::{debug, warn};
use std::sync::Arc;

/// Substitute for a non-positive curvature along the update direction
const TAU: f64 = 1e-12;

/// Multipliers within this fraction of C from a bound are placed on it
const BOUND_TOLERANCE: f64 = 1e-12;

/// SMO solver for SVM optimization
///
/// Labels must be `+1.0` or `-1.0`, and both classes must be present.
pub struct SMOSolver<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel> SMOSolver<K> {
    /// Create a new SMO solver with the given kernel and configuration
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    /// Solve the SVM optimization problem
    pub fn solve(&self, x: &[Vec<f64>], y: &[f64]) -> Result<OptimizationResult> {
        let mut cache = KernelCache::with_memory_limit(self.config.cache_size, x.len());
        self.solve_with_cache(x, y, &mut cache)
    }

    /// Solve the SVM optimization problem with a caller-provided kernel cache
    ///
    /// Cached rows are indexed by position in `x`, so a cache must not be
    /// shared between problems with different rows.
    pub fn solve_with_cache(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        cache: &mut KernelCache,
    ) -> Result<OptimizationResult> {
        self.config.validate()?;
        validate_problem(x, y)?;

        let n = x.len();
        let c = self.config.c;
        let diag: Vec<f64> = x.iter().map(|row| self.kernel.compute(row, row)).collect();

        let mut alpha = vec![0.0; n];
        // All multipliers start at zero, so every prediction is zero
        let mut errors: Vec<f64> = y.iter().map(|&label| -label).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            let Some((i, j)) = self.select_working_set(x, y, &alpha, &errors, &diag, cache)
            else {
                converged = true;
                break;
            };
            let moved = self.take_step(i, j, x, y, &mut alpha, &mut errors, &diag, cache);
            iterations += 1;
            if !moved {
                warn!("SMO stalled on pair ({i}, {j}) after {iterations} iterations");
                break;
            }
        }

        if !converged && iterations >= self.config.max_iterations {
            warn!(
                "SMO reached max_iterations={} before the KKT gap fell below {}",
                self.config.max_iterations, self.config.epsilon
            );
        }

        let b = self.calculate_bias(y, &alpha, &errors);
        if !b.is_finite() {
            return Err(SVMError::OptimizationError(format!(
                "bias diverged to {b} after {iterations} iterations"
            )));
        }

        let support_vectors: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| if a > 0.0 { Some(i) } else { None })
            .collect();

        // Σα − ½ αᵀQα, using Σⱼ αⱼ yⱼ K(xᵢ, xⱼ) = Eᵢ + yᵢ
        let objective_value = alpha.iter().sum::<f64>()
            - 0.5
                * (0..n)
                    .map(|i| alpha[i] * y[i] * (errors[i] + y[i]))
                    .sum::<f64>();

        debug!(
            "SMO finished: n={}, iterations={}, support_vectors={}, b={:.6}, c={}, cache_hit_rate={:.3}",
            n,
            iterations,
            support_vectors.len(),
            b,
            c,
            cache.hit_rate()
        );

        Ok(OptimizationResult {
            alpha,
            b,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    /// Whether alpha can still move in the direction that raises y·α
    fn in_up_set(&self, label: f64, a: f64) -> bool {
        (label > 0.0 && a < self.config.c) || (label < 0.0 && a > 0.0)
    }

    /// Whether alpha can still move in the direction that lowers y·α
    fn in_low_set(&self, label: f64, a: f64) -> bool {
        (label > 0.0 && a > 0.0) || (label < 0.0 && a < self.config.c)
    }

    /// Pick the maximal violating pair, returning `None` once the KKT gap
    /// is below `epsilon`
    ///
    /// The first index maximizes `-E` over the up set. The second index is
    /// chosen among the low set by the largest guaranteed decrease of the
    /// objective (second-order selection).
    fn select_working_set(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        alpha: &[f64],
        errors: &[f64],
        diag: &[f64],
        cache: &mut KernelCache,
    ) -> Option<(usize, usize)> {
        let mut g_max = f64::NEG_INFINITY;
        let mut first = None;
        for t in 0..alpha.len() {
            if self.in_up_set(y[t], alpha[t]) && -errors[t] > g_max {
                g_max = -errors[t];
                first = Some(t);
            }
        }
        let i = first?;
        let row_i = cache.row(i, alpha.len(), |t| self.kernel.compute(&x[i], &x[t]));

        let mut g_min = f64::INFINITY;
        let mut second = None;
        let mut best_decrease = f64::INFINITY;
        for t in 0..alpha.len() {
            if !self.in_low_set(y[t], alpha[t]) {
                continue;
            }
            let value = -errors[t];
            g_min = g_min.min(value);

            let grad_diff = g_max - value;
            if grad_diff > 0.0 {
                let mut curvature = diag[i] + diag[t] - 2.0 * row_i[t];
                if curvature <= 0.0 {
                    curvature = TAU;
                }
                let decrease = -(grad_diff * grad_diff) / curvature;
                if decrease < best_decrease {
                    best_decrease = decrease;
                    second = Some(t);
                }
            }
        }

        if g_max - g_min < self.config.epsilon {
            return None;
        }
        second.map(|j| (i, j))
    }

    /// Place a multiplier exactly on a bound when rounding left it just inside
    fn snap_to_bounds(&self, a: f64) -> f64 {
        let c = self.config.c;
        let tolerance = BOUND_TOLERANCE * c;
        if a <= tolerance {
            0.0
        } else if a >= c - tolerance {
            c
        } else {
            a
        }
    }

    /// Jointly optimize alpha[i] and alpha[j] along the equality constraint
    ///
    /// Returns `false` when neither multiplier changed.
    #[allow(clippy::too_many_arguments)]
    fn take_step(
        &self,
        i: usize,
        j: usize,
        x: &[Vec<f64>],
        y: &[f64],
        alpha: &mut [f64],
        errors: &mut [f64],
        diag: &[f64],
        cache: &mut KernelCache,
    ) -> bool {
        let c = self.config.c;
        let (y_i, y_j) = (y[i], y[j]);
        let (alpha_i_old, alpha_j_old) = (alpha[i], alpha[j]);

        let (low, high) = if y_i != y_j {
            let diff = alpha_j_old - alpha_i_old;
            (diff.max(0.0), (c + diff).min(c))
        } else {
            let sum = alpha_i_old + alpha_j_old;
            ((sum - c).max(0.0), sum.min(c))
        };

        let n = alpha.len();
        let row_i = cache.row(i, n, |t| self.kernel.compute(&x[i], &x[t]));
        let row_j = cache.row(j, n, |t| self.kernel.compute(&x[j], &x[t]));
        let mut eta = diag[i] + diag[j] - 2.0 * row_i[j];
        if eta <= 0.0 {
            eta = TAU;
        }

        let unclipped = alpha_j_old + y_j * (errors[i] - errors[j]) / eta;
        let alpha_j_new = self.snap_to_bounds(if unclipped < low {
            low
        } else if unclipped > high {
            high
        } else {
            unclipped
        });
        let alpha_i_new = self.snap_to_bounds(
            (alpha_i_old + y_i * y_j * (alpha_j_old - alpha_j_new)).clamp(0.0, c),
        );
        if alpha_i_new == alpha_i_old && alpha_j_new == alpha_j_old {
            return false;
        }

        alpha[i] = alpha_i_new;
        alpha[j] = alpha_j_new;

        let delta_i = y_i * (alpha_i_new - alpha_i_old);
        let delta_j = y_j * (alpha_j_new - alpha_j_old);
        for (k, error) in errors.iter_mut().enumerate() {
            *error += delta_i * row_i[k] + delta_j * row_j[k];
        }
        true
    }

    /// Bias term `b` such that the decision function is `Σ αᵢyᵢK(xᵢ, x) + b`
    ///
    /// Averages over free support vectors; without any, takes the midpoint
    /// of the interval allowed by the bounded ones.
    fn calculate_bias(&self, y: &[f64], alpha: &[f64], errors: &[f64]) -> f64 {
        let c = self.config.c;
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..alpha.len() {
            let at_upper = alpha[t] >= c;
            let at_lower = alpha[t] <= 0.0;
            let positive = y[t] > 0.0;
            if (at_upper && !positive) || (at_lower && positive) {
                upper = upper.min(errors[t]);
            } else if at_upper || at_lower {
                lower = lower.max(errors[t]);
            } else {
                free_sum += errors[t];
                free_count += 1;
            }
        }

        let rho = if free_count > 0 {
            free_sum / free_count as f64
        } else if upper.is_finite() && lower.is_finite() {
            (upper + lower) / 2.0
        } else if upper.is_finite() {
            upper
        } else if lower.is_finite() {
            lower
        } else {
            0.0
        };
        -rho
    }
}

fn validate_problem(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if x.is_empty() {
        return Err(SVMError::EmptyDataset);
    }
    if x.len() != y.len() {
        return Err(SVMError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let dim = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != dim) {
        return Err(SVMError::DimensionMismatch {
            expected: dim,
            actual: row.len(),
        });
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(SVMError::InvalidDataset(
            "feature values must be finite".to_string(),
        ));
    }
    if let Some(&label) = y.iter().find(|&&label| label != 1.0 && label != -1.0) {
        return Err(SVMError::InvalidLabel(label));
    }
    let has_positive = y.iter().any(|&label| label > 0.0);
    let has_negative = y.iter().any(|&label| label < 0.0);
    if !(has_positive && has_negative) {
        return Err(SVMError::InvalidDataset(
            "binary problem needs samples from both classes".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LinearKernel, RBFKernel};
    use approx::assert_abs_diff_eq;

    fn linear_solver(config: OptimizerConfig) -> SMOSolver<LinearKernel> {
        SMOSolver::new(Arc::new(LinearKernel::new()), config)
    }

    fn decision(x: &[Vec<f64>], y: &[f64], result: &OptimizationResult, point: &[f64]) -> f64 {
        let kernel = LinearKernel::new();
        result
            .support_vectors
            .iter()
            .map(|&i| result.alpha[i] * y[i] * kernel.compute(&x[i], point))
            .sum::<f64>()
            + result.b
    }

    #[test]
    fn test_smo_solver_empty_dataset() {
        let solver = linear_solver(OptimizerConfig::default());
        let result = solver.solve(&[], &[]);
        assert!(matches!(result, Err(SVMError::EmptyDataset)));
    }

    #[test]
    fn test_smo_solver_invalid_labels() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![1.0], vec![-1.0]];
        let result = solver.solve(&x, &[1.0, 0.5]);
        assert!(matches!(result, Err(SVMError::InvalidLabel(l)) if l == 0.5));
    }

    #[test]
    fn test_smo_solver_length_mismatch() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![1.0], vec![-1.0]];
        let result = solver.solve(&x, &[1.0]);
        assert!(matches!(
            result,
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_smo_solver_single_class() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![1.0], vec![2.0]];
        let result = solver.solve(&x, &[1.0, 1.0]);
        assert!(matches!(result, Err(SVMError::InvalidDataset(_))));
    }

    #[test]
    fn test_smo_solver_non_finite_features() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![f64::NAN], vec![-1.0]];
        assert!(matches!(
            solver.solve(&x, &[1.0, -1.0]),
            Err(SVMError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_smo_solver_rejects_bad_config() {
        let solver = linear_solver(OptimizerConfig {
            c: -1.0,
            ..OptimizerConfig::default()
        });
        let x = vec![vec![1.0], vec![-1.0]];
        assert!(matches!(
            solver.solve(&x, &[1.0, -1.0]),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_smo_recovers_max_margin_in_one_dimension() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![2.0], vec![-2.0], vec![1.5], vec![-1.5]];
        let y = vec![1.0, -1.0, 1.0, -1.0];

        let result = solver.solve(&x, &y).expect("Should solve");

        // Margin points are ±1.5, so w = 1/1.5 and each alpha is 2/9
        assert_eq!(result.support_vectors, vec![2, 3]);
        assert_abs_diff_eq!(result.alpha[2], 2.0 / 9.0, epsilon = 1e-3);
        assert_abs_diff_eq!(result.alpha[3], 2.0 / 9.0, epsilon = 1e-3);
        assert_abs_diff_eq!(result.b, 0.0, epsilon = 1e-3);
        assert!(result.iterations > 0);

        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(decision(&x, &y, &result, row).signum(), label);
        }
    }

    #[test]
    fn test_smo_keeps_dual_feasibility() {
        let config = OptimizerConfig {
            c: 0.5,
            ..OptimizerConfig::default()
        };
        let solver = linear_solver(config);
        // Overlapping classes force some multipliers onto the upper bound
        let x = vec![
            vec![1.0, 1.0],
            vec![2.0, 1.5],
            vec![0.2, 0.1],
            vec![-1.0, -1.0],
            vec![-2.0, -0.5],
            vec![0.1, 0.3],
        ];
        let y = vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0];

        let result = solver.solve(&x, &y).expect("Should solve");

        let balance: f64 = result.alpha.iter().zip(&y).map(|(a, l)| a * l).sum();
        assert_abs_diff_eq!(balance, 0.0, epsilon = 1e-9);
        for &a in &result.alpha {
            assert!((0.0..=0.5).contains(&a));
        }
        assert!(result.objective_value > 0.0);
    }

    #[test]
    fn test_snap_to_bounds() {
        let solver = linear_solver(OptimizerConfig::default());
        assert_eq!(solver.snap_to_bounds(0.9999999999999999), 1.0);
        assert_eq!(solver.snap_to_bounds(8.9e-16), 0.0);
        assert_eq!(solver.snap_to_bounds(0.5), 0.5);
        assert_eq!(solver.snap_to_bounds(1e-6), 1e-6);
    }

    #[test]
    fn test_bounded_multipliers_sit_exactly_on_the_box() {
        let c = 0.5;
        let solver = linear_solver(OptimizerConfig {
            c,
            ..OptimizerConfig::default()
        });
        let x = vec![
            vec![1.0, 1.0],
            vec![2.0, 1.5],
            vec![0.2, 0.1],
            vec![-1.0, -1.0],
            vec![-2.0, -0.5],
            vec![0.1, 0.3],
            vec![0.15, 0.2],
            vec![0.3, 0.05],
        ];
        let y = vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0];

        let result = solver.solve(&x, &y).expect("Should solve");

        assert!(result.iterations < OptimizerConfig::default().max_iterations);
        for &a in &result.alpha {
            let on_bound = a == 0.0 || a == c;
            let inside = a > BOUND_TOLERANCE * c && a < c - BOUND_TOLERANCE * c;
            assert!(on_bound || inside, "multiplier {a} is neither bounded nor free");
        }
        for &i in &result.support_vectors {
            assert!(result.alpha[i] > 0.0);
        }
    }

    #[test]
    fn test_smo_with_rbf_kernel_separates_xor() {
        let solver = SMOSolver::new(
            Arc::new(RBFKernel::new(2.0)),
            OptimizerConfig {
                c: 10.0,
                ..OptimizerConfig::default()
            },
        );
        let x = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
        ];
        let y = vec![1.0, 1.0, -1.0, -1.0];

        let result = solver.solve(&x, &y).expect("Should solve");
        let kernel = RBFKernel::new(2.0);
        for (row, &label) in x.iter().zip(&y) {
            let value: f64 = result
                .support_vectors
                .iter()
                .map(|&i| result.alpha[i] * y[i] * kernel.compute(&x[i], row))
                .sum::<f64>()
                + result.b;
            assert_eq!(value.signum(), label);
        }
    }

    #[test]
    fn test_solve_with_cache_reports_hits() {
        let solver = linear_solver(OptimizerConfig::default());
        let x = vec![vec![2.0], vec![-2.0], vec![1.5], vec![-1.5]];
        let y = vec![1.0, -1.0, 1.0, -1.0];
        let mut cache = KernelCache::new(4);

        solver
            .solve_with_cache(&x, &y, &mut cache)
            .expect("Should solve");
        assert!(cache.stats().hits > 0);
    }
}
