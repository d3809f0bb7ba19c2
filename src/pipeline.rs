//! The end-to-end walkthrough
//!
//! load → split → scale (fitted on the training rows only) → fit → predict
//! → report, then a second model on two features for the decision plot.

use crate::api::{ModelInfo, TrainedModel, SVC};
use crate::config::PipelineConfig;
use crate::core::Result;
use crate::data::{iris, LabeledDataset};
use crate::kernel::KernelKind;
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model_selection::{train_test_split, TrainTestSplit};
use crate::plot::{axis_range, render_confusion_heatmap, render_decision_boundary, DecisionGrid};
use crate::preprocessing::StandardScaler;
use log::info;
use std::fs;
use std::path::PathBuf;

/// Margin added around the data when laying out the decision grid
const GRID_PADDING: f64 = 1.0;

pub const DECISION_BOUNDARY_FILE: &str = "decision_boundary.svg";
pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.svg";

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub n_train: usize,
    pub n_test: usize,
    /// Scaler fitted on the training rows of the full model
    pub scaler: StandardScaler,
    pub model_info: ModelInfo,
    /// True classes of the test rows
    pub y_test: Vec<usize>,
    /// Predicted classes of the test rows
    pub predictions: Vec<usize>,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    pub visualization: VisualizationReport,
    /// SVG files written, empty when no output directory was configured
    pub figures: Vec<PathBuf>,
}

/// The two-feature model behind the decision plot
#[derive(Debug, Clone)]
pub struct VisualizationReport {
    pub feature_names: [String; 2],
    /// Test accuracy of the two-feature model
    pub accuracy: f64,
    pub grid: DecisionGrid,
    /// Scaled training rows in the two plot features
    pub points: Vec<Vec<f64>>,
    /// Classes of `points`
    pub labels: Vec<usize>,
}

/// Load the configured dataset, or the bundled Iris table
pub fn load_dataset(config: &PipelineConfig) -> Result<LabeledDataset> {
    match &config.data_path {
        Some(path) => {
            info!("Loading dataset from {}", path.display());
            LabeledDataset::from_csv_file(path)
        }
        None => iris(),
    }
}

/// Split `dataset` the way the configuration says
pub fn split_dataset(config: &PipelineConfig, dataset: &LabeledDataset) -> Result<TrainTestSplit> {
    train_test_split(dataset, config.test_size, config.seed)
}

/// Fit a scaler on `train` and a classifier on the scaled rows
pub fn fit_scaled(
    config: &PipelineConfig,
    train: &LabeledDataset,
) -> Result<(StandardScaler, TrainedModel<KernelKind>)> {
    let mut scaler = StandardScaler::new();
    scaler.fit(train.records())?;
    let scaled = scaler.transform_dataset(train)?;

    let model = SVC::with_kernel(config.kernel_for(train.n_features())?)
        .with_c(config.c)
        .with_epsilon(config.epsilon)
        .with_max_iterations(config.max_iterations)
        .with_cache_size(config.cache_size)
        .fit(&scaled)?;
    Ok((scaler, model))
}

/// Scale `test` with `scaler`, predict it and build the evaluation artifacts
pub fn evaluate(
    scaler: &StandardScaler,
    model: &TrainedModel<KernelKind>,
    test: &LabeledDataset,
) -> Result<(Vec<usize>, ClassificationReport, ConfusionMatrix)> {
    let scaled = scaler.transform_dataset(test)?;
    let predictions = model.predict_labels(&scaled)?;
    let confusion = ConfusionMatrix::new(test.targets(), &predictions, test.n_classes())?;
    let report = ClassificationReport::from_confusion(&confusion, test.target_names());
    Ok((predictions, report, confusion))
}

/// Run the whole walkthrough once
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;

    let dataset = load_dataset(config)?;
    info!(
        "Loaded {} rows, {} features, {} classes",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.n_classes()
    );

    let split = split_dataset(config, &dataset)?;
    info!(
        "Split into {} training and {} test rows (seed {})",
        split.train.n_samples(),
        split.test.n_samples(),
        config.seed
    );

    let (scaler, model) = fit_scaled(config, &split.train)?;
    let (predictions, report, confusion) = evaluate(&scaler, &model, &split.test)?;
    info!("Test accuracy: {:.4}", report.accuracy);

    let visualization = visualize(config, &split)?;
    info!(
        "Two-feature model ({} vs {}) test accuracy: {:.4}",
        visualization.feature_names[0], visualization.feature_names[1], visualization.accuracy
    );

    let mut figures = Vec::new();
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir)?;

        let boundary = dir.join(DECISION_BOUNDARY_FILE);
        render_decision_boundary(
            &boundary,
            &visualization.grid,
            &visualization.points,
            &visualization.labels,
            (
                visualization.feature_names[0].as_str(),
                visualization.feature_names[1].as_str(),
            ),
            dataset.target_names(),
        )?;
        figures.push(boundary);

        let heatmap = dir.join(CONFUSION_MATRIX_FILE);
        render_confusion_heatmap(&heatmap, &confusion, dataset.target_names())?;
        figures.push(heatmap);
        info!("Wrote {} figures to {}", figures.len(), dir.display());
    }

    Ok(PipelineReport {
        n_train: split.train.n_samples(),
        n_test: split.test.n_samples(),
        scaler,
        model_info: model.info(),
        y_test: split.test.targets().to_vec(),
        predictions,
        report,
        confusion,
        visualization,
        figures,
    })
}

/// Fit the two-feature model and lay its predictions over a mesh
fn visualize(config: &PipelineConfig, split: &TrainTestSplit) -> Result<VisualizationReport> {
    let train_2d = split.train.select_features(&config.plot_features)?;
    let test_2d = split.test.select_features(&config.plot_features)?;

    let (scaler, model) = fit_scaled(config, &train_2d)?;
    let (_, report, _) = evaluate(&scaler, &model, &test_2d)?;

    let points = scaler.transform(train_2d.records())?;
    let x_range = axis_range(&points, 0, GRID_PADDING)?;
    let y_range = axis_range(&points, 1, GRID_PADDING)?;
    let grid = DecisionGrid::compute(&model, x_range, y_range, config.grid_resolution)?;

    let names = train_2d.feature_names();
    Ok(VisualizationReport {
        feature_names: [names[0].clone(), names[1].clone()],
        accuracy: report.accuracy,
        grid,
        points,
        labels: train_2d.targets().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            grid_resolution: 20,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_run_without_figures() {
        let report = run(&fast_config()).unwrap();

        assert_eq!(report.n_train, 105);
        assert_eq!(report.n_test, 45);
        assert_eq!(report.predictions.len(), 45);
        assert!(report.predictions.iter().all(|&p| p < 3));
        assert_eq!(report.confusion.total(), 45);
        assert_eq!(report.report.total_support(), 45);
        assert!(report.report.accuracy > 0.85);
        assert!(report.figures.is_empty());
        assert_eq!(report.model_info.pairs.len(), 3);
        assert_eq!(report.scaler.n_samples_seen(), 105);
    }

    #[test]
    fn test_visualization_model() {
        let report = run(&fast_config()).unwrap();
        let vis = &report.visualization;

        assert_eq!(vis.feature_names, ["sepal_length".to_string(), "sepal_width".to_string()]);
        assert_eq!(vis.grid.xs.len(), 20);
        assert!(vis.accuracy > 0.5);
        // Sepal measurements separate setosa, so its region is never empty
        assert!(vis.grid.class_area(3)[0] > 0);
        assert_eq!(vis.points.len(), 105);
        assert_eq!(vis.labels.len(), 105);
    }

    #[test]
    fn test_auto_gamma_tracks_feature_count() {
        let config = PipelineConfig {
            kernel: KernelKind::Rbf { gamma: 0.25 },
            auto_gamma: true,
            ..fast_config()
        };
        let dataset = load_dataset(&config).unwrap();
        let split = split_dataset(&config, &dataset).unwrap();

        let (_, full) = fit_scaled(&config, &split.train).unwrap();
        assert_eq!(*full.kernel(), KernelKind::Rbf { gamma: 0.25 });

        let train_2d = split.train.select_features(&config.plot_features).unwrap();
        let (_, two_feature) = fit_scaled(&config, &train_2d).unwrap();
        assert_eq!(*two_feature.kernel(), KernelKind::Rbf { gamma: 0.5 });
    }

    #[test]
    fn test_fit_scaled_uses_training_rows_only() {
        let config = fast_config();
        let dataset = load_dataset(&config).unwrap();
        let split = split_dataset(&config, &dataset).unwrap();
        let (scaler, _) = fit_scaled(&config, &split.train).unwrap();

        let scaled = scaler.transform(split.train.records()).unwrap();
        for col in 0..4 {
            let mean: f64 = scaled.iter().map(|r| r[col]).sum::<f64>() / 105.0;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_run_writes_figures() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = PipelineConfig {
            output_dir: Some(dir.path().join("figures")),
            ..fast_config()
        };

        let report = run(&config).unwrap();
        assert_eq!(report.figures.len(), 2);
        for path in &report.figures {
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let config = PipelineConfig {
            test_size: 0.0,
            ..fast_config()
        };
        assert!(run(&config).is_err());
    }
}
