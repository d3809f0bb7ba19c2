//! Support Vector Machine classification of the Iris dataset
//!
//! A seeded train/test split, standard scaling fitted on the training rows,
//! a one-vs-one SVM trained with Sequential Minimal Optimization, and the
//! usual evaluation artifacts: classification report, confusion matrix and
//! a decision-boundary plot of a two-feature model.

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod data;
pub mod kernel;
pub mod metrics;
pub mod model_selection;
pub mod optimizer;
pub mod persistence;
pub mod pipeline;
pub mod plot;
pub mod preprocessing;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{ModelInfo, TrainedModel, SVC};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::config::PipelineConfig;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::{iris, LabeledDataset};
pub use crate::kernel::{Kernel, KernelKind, LinearKernel, RBFKernel};
pub use crate::metrics::{ClassificationReport, ConfusionMatrix};
pub use crate::model_selection::{train_test_split, TrainTestSplit};
pub use crate::optimizer::{SVMOptimizer, TrainedSVM};
pub use crate::preprocessing::StandardScaler;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
