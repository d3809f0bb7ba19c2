//! Pipeline configuration
//!
//! Every field has a default, so a JSON file only needs the keys it
//! changes:
//!
//! ```json
//! { "c": 10.0, "kernel": { "type": "rbf", "gamma": 0.5 }, "output_dir": "figures" }
//! ```

use crate::core::{OptimizerConfig, Result, SVMError};
use crate::kernel::KernelKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one run of the walkthrough
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed of the split shuffle
    pub seed: u64,
    /// Regularization parameter C
    pub c: f64,
    pub kernel: KernelKind,
    /// Re-derive the RBF gamma as 1 / n_features for every fitted dataset
    pub auto_gamma: bool,
    /// Solver tolerance
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
    /// The two feature columns used by the visualization model
    pub plot_features: [usize; 2],
    /// Mesh points per axis of the decision grid
    pub grid_resolution: usize,
    /// Where to write SVG figures; nothing is drawn when unset
    pub output_dir: Option<PathBuf>,
    /// CSV dataset to use instead of the bundled Iris table
    pub data_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let optimizer = OptimizerConfig::default();
        Self {
            test_size: 0.3,
            seed: 42,
            c: optimizer.c,
            kernel: KernelKind::Linear,
            auto_gamma: false,
            epsilon: optimizer.epsilon,
            max_iterations: optimizer.max_iterations,
            cache_size: optimizer.cache_size,
            plot_features: [0, 1],
            grid_resolution: 200,
            output_dir: None,
            data_path: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Solver settings derived from this configuration
    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            c: self.c,
            epsilon: self.epsilon,
            max_iterations: self.max_iterations,
            cache_size: self.cache_size,
        }
    }

    /// Kernel for a model fitted on `n_features` columns
    pub fn kernel_for(&self, n_features: usize) -> Result<KernelKind> {
        match self.kernel {
            KernelKind::Rbf { .. } if self.auto_gamma => KernelKind::rbf(None, n_features),
            kernel => Ok(kernel),
        }
    }

    /// Check value ranges that do not depend on the dataset
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SVMError::InvalidParameter(format!(
                "test_size must be between 0 and 1, got: {}",
                self.test_size
            )));
        }
        self.optimizer_config().validate()?;
        if let KernelKind::Rbf { gamma } = self.kernel {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(SVMError::InvalidParameter(format!(
                    "gamma must be positive, got: {gamma}"
                )));
            }
        }
        if self.plot_features[0] == self.plot_features[1] {
            return Err(SVMError::InvalidParameter(format!(
                "plot features must be two different columns, got: {:?}",
                self.plot_features
            )));
        }
        if self.grid_resolution < 2 {
            return Err(SVMError::InvalidParameter(format!(
                "grid_resolution must be at least 2, got: {}",
                self.grid_resolution
            )));
        }
        Ok(())
    }
}
