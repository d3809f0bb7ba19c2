//! Model serialization and persistence
//!
//! A [`SavedModel`] holds everything needed to classify raw measurements
//! later: the scaler statistics, every pairwise model, and the names of
//! classes and features. It also records the split seed and test size so
//! the held-out rows can be rebuilt for evaluation.

use crate::api::{PairwiseModel, TrainedModel};
use crate::config::PipelineConfig;
use crate::core::{Result, SVMError};
use crate::kernel::{Kernel, KernelKind};
use crate::optimizer::TrainedSVM;
use crate::preprocessing::StandardScaler;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Serializable representation of a fitted scaler and classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub kernel: KernelKind,
    pub class_names: Vec<String>,
    pub feature_names: Vec<String>,
    pub scaler: SavedScaler,
    pub pairs: Vec<SavedPair>,
    pub metadata: ModelMetadata,
}

/// Per-feature statistics of the training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScaler {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    pub n_samples_seen: usize,
}

/// One binary model of the one-vs-one ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPair {
    /// Class voted for by a non-negative decision value
    pub positive: usize,
    /// Class voted for by a negative decision value
    pub negative: usize,
    pub support_vectors: Vec<Vec<f64>>,
    /// Alpha values times labels (alpha_i * y_i)
    pub dual_coef: Vec<f64>,
    pub bias: f64,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub training_params: TrainingParams,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Training parameters for reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub c: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
    pub test_size: f64,
    pub seed: u64,
    /// CSV the model was trained on; `None` for the bundled Iris table
    #[serde(default)]
    pub data_path: Option<PathBuf>,
}

impl SavedModel {
    /// Capture a fitted scaler and model along with the settings that produced them
    pub fn from_trained(
        model: &TrainedModel<KernelKind>,
        scaler: &StandardScaler,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let (mean, variance) = scaler
            .mean()
            .zip(scaler.variance())
            .ok_or(SVMError::NotFitted)?;

        let pairs = model
            .pairwise_models()
            .iter()
            .map(|p| SavedPair {
                positive: p.positive,
                negative: p.negative,
                support_vectors: p.model.support_vectors().to_vec(),
                dual_coef: p.model.dual_coef().to_vec(),
                bias: p.model.bias(),
            })
            .collect();

        Ok(Self {
            kernel: *model.kernel(),
            class_names: model.class_names().to_vec(),
            feature_names: model.feature_names().to_vec(),
            scaler: SavedScaler {
                mean: mean.to_vec(),
                variance: variance.to_vec(),
                n_samples_seen: scaler.n_samples_seen(),
            },
            pairs,
            metadata: ModelMetadata {
                library_version: crate::VERSION.to_string(),
                training_params: TrainingParams {
                    c: config.c,
                    epsilon: config.epsilon,
                    max_iterations: config.max_iterations,
                    test_size: config.test_size,
                    seed: config.seed,
                    data_path: config.data_path.clone(),
                },
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        })
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        let model = serde_json::from_reader(reader)?;
        Ok(model)
    }

    /// Rebuild the fitted scaler
    pub fn to_scaler(&self) -> Result<StandardScaler> {
        StandardScaler::from_parts(
            self.scaler.mean.clone(),
            self.scaler.variance.clone(),
            self.scaler.n_samples_seen,
        )
    }

    /// Rebuild a classifier that predicts exactly like the saved one
    pub fn to_trained(&self) -> Result<TrainedModel<KernelKind>> {
        let kernel = Arc::new(self.kernel);
        let pairs = self
            .pairs
            .iter()
            .map(|p| {
                let model = TrainedSVM::from_parts(
                    Arc::clone(&kernel),
                    p.support_vectors.clone(),
                    p.dual_coef.clone(),
                    p.bias,
                )?;
                Ok(PairwiseModel {
                    positive: p.positive,
                    negative: p.negative,
                    model,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        TrainedModel::from_pairwise(
            kernel,
            pairs,
            self.class_names.clone(),
            self.feature_names.clone(),
        )
    }

    /// Pipeline settings that reproduce the training split
    pub fn split_config(&self) -> PipelineConfig {
        let params = &self.metadata.training_params;
        PipelineConfig {
            test_size: params.test_size,
            seed: params.seed,
            c: params.c,
            kernel: self.kernel,
            epsilon: params.epsilon,
            max_iterations: params.max_iterations,
            data_path: params.data_path.clone(),
            ..PipelineConfig::default()
        }
    }

    pub fn n_support_vectors(&self) -> usize {
        self.pairs.iter().map(|p| p.support_vectors.len()).sum()
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== SVM Model Summary ===");
        println!("Kernel Type: {}", self.kernel.name());
        if let KernelKind::Rbf { gamma } = self.kernel {
            println!("Gamma: {gamma}");
        }
        println!("Classes: {}", self.class_names.join(", "));
        println!("Features: {}", self.feature_names.join(", "));
        println!("Pairwise Models: {}", self.pairs.len());
        for p in &self.pairs {
            println!(
                "  {} vs {}: {} support vectors, bias {:.6}",
                self.class_name(p.positive),
                self.class_name(p.negative),
                p.support_vectors.len(),
                p.bias
            );
        }
        println!("Support Vectors: {}", self.n_support_vectors());
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        let params = &self.metadata.training_params;
        println!("Training Parameters:");
        println!("  C: {}", params.c);
        println!("  Epsilon: {}", params.epsilon);
        println!("  Max Iterations: {}", params.max_iterations);
        println!("  Test Size: {}", params.test_size);
        println!("  Seed: {}", params.seed);
        match &params.data_path {
            Some(path) => println!("  Data: {}", path.display()),
            None => println!("  Data: bundled Iris"),
        }
    }

    fn class_name(&self, k: usize) -> &str {
        self.class_names.get(k).map_or("?", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::iris;
    use crate::pipeline::{fit_scaled, split_dataset};
    use approx::assert_abs_diff_eq;
    use tempfile::NamedTempFile;

    fn fitted(config: &PipelineConfig) -> (StandardScaler, TrainedModel<KernelKind>) {
        let dataset = iris().unwrap();
        let split = split_dataset(config, &dataset).unwrap();
        fit_scaled(config, &split.train).unwrap()
    }

    #[test]
    fn test_model_serialization() -> Result<()> {
        let config = PipelineConfig::default();
        let (scaler, model) = fitted(&config);
        let saved = SavedModel::from_trained(&model, &scaler, &config)?;

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        saved.save_to_file(temp_file.path())?;
        let loaded = SavedModel::load_from_file(temp_file.path())?;

        assert_eq!(loaded.kernel, KernelKind::Linear);
        assert_eq!(loaded.class_names, saved.class_names);
        assert_eq!(loaded.feature_names, saved.feature_names);
        assert_eq!(loaded.scaler.n_samples_seen, 105);
        for (a, b) in loaded.pairs.iter().zip(&saved.pairs) {
            assert_eq!((a.positive, a.negative), (b.positive, b.negative));
            assert_eq!(a.support_vectors.len(), b.support_vectors.len());
            assert_abs_diff_eq!(a.bias, b.bias, epsilon = 1e-12);
        }
        assert_eq!(loaded.pairs.len(), 3);
        assert_eq!(loaded.metadata.training_params.seed, 42);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.metadata.created_at).is_ok());
        Ok(())
    }

    #[test]
    fn test_round_trip_predicts_identically() -> Result<()> {
        let config = PipelineConfig {
            kernel: KernelKind::Rbf { gamma: 0.25 },
            ..PipelineConfig::default()
        };
        let (scaler, model) = fitted(&config);
        let saved = SavedModel::from_trained(&model, &scaler, &config)?;

        let restored_scaler = saved.to_scaler()?;
        let restored = saved.to_trained()?;
        assert_eq!(restored_scaler, scaler);

        for row in iris()?.records() {
            let a = model.predict(&scaler.transform_row(row)?)?;
            let b = restored.predict(&restored_scaler.transform_row(row)?)?;
            assert_eq!(a.label, b.label);
            assert_eq!(a.decision_values, b.decision_values);
        }
        Ok(())
    }

    #[test]
    fn test_split_config() -> Result<()> {
        let config = PipelineConfig {
            seed: 9,
            test_size: 0.2,
            ..PipelineConfig::default()
        };
        let (scaler, model) = fitted(&config);
        let restored = SavedModel::from_trained(&model, &scaler, &config)?.split_config();
        assert_eq!(restored.seed, 9);
        assert_eq!(restored.test_size, 0.2);
        assert_eq!(restored.data_path, None);
        Ok(())
    }

    #[test]
    fn test_split_config_keeps_data_path() -> Result<()> {
        let config = PipelineConfig {
            data_path: Some(PathBuf::from("measurements.csv")),
            ..PipelineConfig::default()
        };
        let (scaler, model) = fitted(&config);
        let saved = SavedModel::from_trained(&model, &scaler, &config)?;
        assert_eq!(
            saved.split_config().data_path,
            Some(PathBuf::from("measurements.csv"))
        );

        // Files written before the field existed still load
        let mut value = serde_json::to_value(&saved)?;
        value["metadata"]["training_params"]
            .as_object_mut()
            .unwrap()
            .remove("data_path");
        let old: SavedModel = serde_json::from_value(value)?;
        assert_eq!(old.split_config().data_path, None);
        Ok(())
    }

    #[test]
    fn test_unfitted_scaler_rejected() {
        let config = PipelineConfig::default();
        let (_, model) = fitted(&config);
        assert!(matches!(
            SavedModel::from_trained(&model, &StandardScaler::new(), &config),
            Err(SVMError::NotFitted)
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp_file.path(), "{}").unwrap();
        assert!(matches!(
            SavedModel::load_from_file(temp_file.path()),
            Err(SVMError::SerializationError(_))
        ));
    }
}
