//! Integration tests for the iris-svm library
//!
//! These tests exercise the full workflow across modules: split, scale,
//! train, predict, evaluate and persist.

use approx::assert_abs_diff_eq;
use iris_svm::api::SVC;
use iris_svm::config::PipelineConfig;
use iris_svm::kernel::KernelKind;
use iris_svm::metrics::{accuracy, ClassificationReport, ConfusionMatrix};
use iris_svm::persistence::SavedModel;
use iris_svm::pipeline;
use iris_svm::{iris, train_test_split, StandardScaler};
use std::collections::HashSet;
use tempfile::{tempdir, NamedTempFile};

/// Test complete workflow: split -> scale -> train -> evaluate
#[test]
fn test_complete_workflow() {
    let dataset = iris().expect("Bundled dataset should load");
    let split = train_test_split(&dataset, 0.3, 42).expect("Split should succeed");

    let mut scaler = StandardScaler::new();
    let train = scaler
        .fit(split.train.records())
        .and_then(|_| scaler.transform_dataset(&split.train))
        .expect("Scaling should succeed");
    let test = scaler
        .transform_dataset(&split.test)
        .expect("Scaling should succeed");

    let model = SVC::new()
        .with_c(1.0)
        .fit(&train)
        .expect("Training should succeed");

    let predicted: Vec<usize> = model
        .predict_dataset(&test)
        .expect("Prediction should succeed")
        .iter()
        .map(|p| p.label)
        .collect();

    assert_eq!(predicted.len(), test.n_samples());
    assert!(predicted.iter().all(|&l| l < 3));

    let acc = accuracy(test.targets(), &predicted).unwrap();
    assert!(acc >= 0.85, "Test accuracy too low: {acc}");
    assert_abs_diff_eq!(acc, model.score(&test).unwrap());
}

#[test]
fn test_split_is_reproducible_and_partitions_rows() {
    let dataset = iris().unwrap();
    let a = train_test_split(&dataset, 0.3, 42).unwrap();
    let b = train_test_split(&dataset, 0.3, 42).unwrap();

    assert_eq!(a.train_indices, b.train_indices);
    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.train.records(), b.train.records());

    let train: HashSet<_> = a.train_indices.iter().collect();
    let test: HashSet<_> = a.test_indices.iter().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 150);
}

#[test]
fn test_scaler_statistics_come_from_training_rows() {
    let dataset = iris().unwrap();
    let split = train_test_split(&dataset, 0.3, 42).unwrap();

    let mut scaler = StandardScaler::new();
    let scaled_train = scaler.fit_transform(split.train.records()).unwrap();
    assert_eq!(scaler.n_samples_seen(), 105);

    for col in 0..4 {
        let n = scaled_train.len() as f64;
        let mean = scaled_train.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = scaled_train.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-9);
    }

    // Statistics differ from those of the whole table
    let mut full = StandardScaler::new();
    full.fit(dataset.records()).unwrap();
    assert_ne!(full.mean(), scaler.mean());
}

#[test]
fn test_confusion_matrix_sums_match_supports() {
    let report = pipeline::run(&PipelineConfig {
        grid_resolution: 10,
        ..PipelineConfig::default()
    })
    .unwrap();

    let mut support = vec![0; 3];
    for &t in &report.y_test {
        support[t] += 1;
    }
    let mut predicted = vec![0; 3];
    for &p in &report.predictions {
        predicted[p] += 1;
    }

    assert_eq!(report.confusion.support(), support);
    assert_eq!(report.confusion.predicted_counts(), predicted);
    let report_support: Vec<usize> = report.report.classes.iter().map(|c| c.support).collect();
    assert_eq!(report_support, support);
}

#[test]
fn test_report_matches_manual_metrics() {
    let dataset = iris().unwrap();
    let split = train_test_split(&dataset, 0.3, 42).unwrap();
    let config = PipelineConfig::default();
    let (scaler, model) = pipeline::fit_scaled(&config, &split.train).unwrap();

    let test = scaler.transform_dataset(&split.test).unwrap();
    let predicted = model.predict_labels(&test).unwrap();
    let matrix = ConfusionMatrix::new(test.targets(), &predicted, 3).unwrap();
    let report = ClassificationReport::new(test.targets(), &predicted, test.target_names()).unwrap();

    for (k, class) in report.classes.iter().enumerate() {
        let tp = matrix.get(k, k) as f64;
        let predicted_k = matrix.predicted_counts()[k] as f64;
        let expected_precision = if predicted_k == 0.0 { 0.0 } else { tp / predicted_k };
        assert_abs_diff_eq!(class.precision, expected_precision, epsilon = 1e-12);
    }
    assert_abs_diff_eq!(report.accuracy, matrix.accuracy(), epsilon = 1e-12);
}

#[test]
fn test_different_c_values() {
    let dataset = iris().unwrap();
    let split = train_test_split(&dataset, 0.3, 42).unwrap();

    for c in [0.1, 1.0, 10.0] {
        let config = PipelineConfig {
            c,
            ..PipelineConfig::default()
        };
        let (scaler, model) = pipeline::fit_scaled(&config, &split.train).unwrap();
        let score = model
            .score(&scaler.transform_dataset(&split.test).unwrap())
            .unwrap();
        assert!(score >= 0.8, "C={c} gave accuracy {score}");
    }
}

#[test]
fn test_training_converges_across_seeds() {
    let dataset = iris().unwrap();

    for seed in [2, 3, 42] {
        for c in [0.1, 1.0, 10.0] {
            let config = PipelineConfig {
                seed,
                c,
                ..PipelineConfig::default()
            };
            let split = pipeline::split_dataset(&config, &dataset).unwrap();
            let (_, model) = pipeline::fit_scaled(&config, &split.train).unwrap();

            for pair in &model.info().pairs {
                assert!(
                    pair.iterations < config.max_iterations,
                    "seed {seed}, C={c}: pair ({}, {}) hit the iteration limit",
                    pair.positive,
                    pair.negative
                );
            }

            // Free support vectors sit on the margin
            for pairwise in model.pairwise_models() {
                let svm = &pairwise.model;
                for (sv, &coef) in svm.support_vectors().iter().zip(svm.dual_coef()) {
                    if coef.abs() >= c {
                        continue;
                    }
                    let margin = coef.signum() * svm.decision_function(sv);
                    assert!(
                        (margin - 1.0).abs() <= 2.0 * config.epsilon,
                        "seed {seed}, C={c}: free support vector at y*f = {margin}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_rbf_pipeline() {
    let config = PipelineConfig {
        kernel: KernelKind::Rbf { gamma: 0.25 },
        grid_resolution: 10,
        ..PipelineConfig::default()
    };
    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.model_info.kernel, "rbf");
    assert!(report.report.accuracy >= 0.85);
}

#[test]
fn test_saved_model_reproduces_evaluation() {
    let config = PipelineConfig::default();
    let dataset = iris().unwrap();
    let split = pipeline::split_dataset(&config, &dataset).unwrap();
    let (scaler, model) = pipeline::fit_scaled(&config, &split.train).unwrap();
    let (predictions, _, _) = pipeline::evaluate(&scaler, &model, &split.test).unwrap();

    let file = NamedTempFile::new().expect("Failed to create temp file");
    SavedModel::from_trained(&model, &scaler, &config)
        .unwrap()
        .save_to_file(file.path())
        .unwrap();

    let loaded = SavedModel::load_from_file(file.path()).unwrap();
    let restored_config = loaded.split_config();
    let restored_split = pipeline::split_dataset(&restored_config, &dataset).unwrap();
    let (restored_predictions, _, _) = pipeline::evaluate(
        &loaded.to_scaler().unwrap(),
        &loaded.to_trained().unwrap(),
        &restored_split.test,
    )
    .unwrap();

    assert_eq!(restored_split.test_indices, split.test_indices);
    assert_eq!(restored_predictions, predictions);
}

#[test]
fn test_pipeline_figures() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = PipelineConfig {
        grid_resolution: 25,
        plot_features: [2, 3],
        output_dir: Some(dir.path().to_path_buf()),
        ..PipelineConfig::default()
    };
    let report = pipeline::run(&config).unwrap();

    assert_eq!(report.figures.len(), 2);
    for figure in &report.figures {
        let svg = std::fs::read_to_string(figure).unwrap();
        assert!(svg.starts_with("<svg") || svg.contains("<svg"));
    }
    // Petal measurements separate the species well
    assert!(report.visualization.accuracy >= 0.85);
}
