//! iris-svm Command Line Interface
//!
//! Runs the Iris SVM walkthrough, and trains, evaluates and inspects saved
//! models.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use iris_svm::config::PipelineConfig;
use iris_svm::core::{Result, SVMError};
use iris_svm::kernel::KernelKind;
use iris_svm::persistence::SavedModel;
use iris_svm::pipeline::{self, PipelineReport};
use log::{error, info};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "iris-svm")]
#[command(about = "Support Vector Machine classification of the Iris dataset")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split, scale, train, evaluate and plot in one go
    Run(RunArgs),
    /// Train on the training split and save the model
    Train(TrainArgs),
    /// Evaluate a saved model on its held-out split
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum CliKernel {
    /// Linear kernel K(x, y) = x · y
    Linear,
    /// Gaussian kernel K(x, y) = exp(-gamma ||x - y||²)
    Rbf,
}

/// Settings shared by `run` and `train`
#[derive(Args, Debug)]
struct PipelineArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV dataset (defaults to the bundled Iris table)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Regularization parameter C
    #[arg(short = 'C', long)]
    c: Option<f64>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    test_size: Option<f64>,

    /// Seed of the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Kernel function
    #[arg(long)]
    kernel: Option<CliKernel>,

    /// RBF kernel width (defaults to 1 / n_features)
    #[arg(long)]
    gamma: Option<f64>,

    /// Convergence tolerance
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Maximum solver iterations per class pair
    #[arg(short, long)]
    max_iterations: Option<usize>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Feature columns of the decision-boundary plot, e.g. "0,1"
    #[arg(long, value_delimiter = ',')]
    plot_features: Option<Vec<usize>>,

    /// Mesh points per axis of the decision-boundary plot
    #[arg(long)]
    grid_resolution: Option<usize>,

    /// Directory for SVG figures (no figures without it)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(long)]
    model: PathBuf,

    /// CSV dataset to rebuild the split from (defaults to the one recorded in the model)
    #[arg(long)]
    data: Option<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Train(args) => train_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

/// Configuration file (or defaults) with command-line overrides applied
fn build_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Reading configuration from {path:?}");
            PipelineConfig::from_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(data) = &args.data {
        config.data_path = Some(data.clone());
    }
    if let Some(c) = args.c {
        config.c = c;
    }
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }

    let wants_rbf = match args.kernel {
        Some(kernel) => kernel == CliKernel::Rbf,
        None => matches!(config.kernel, KernelKind::Rbf { .. }),
    };
    if wants_rbf {
        let gamma = match (args.gamma, config.kernel) {
            (Some(gamma), _) => Some(gamma),
            (None, KernelKind::Rbf { gamma }) if !config.auto_gamma => Some(gamma),
            (None, _) => None,
        };
        config.auto_gamma = gamma.is_none();
        let n_features = pipeline::load_dataset(&config)?.n_features();
        config.kernel = KernelKind::rbf(gamma, n_features)?;
    } else if args.gamma.is_some() {
        return Err(SVMError::InvalidParameter(
            "--gamma only applies to the rbf kernel".to_string(),
        ));
    } else {
        config.kernel = KernelKind::Linear;
        config.auto_gamma = false;
    }

    Ok(config)
}

fn run_command(args: RunArgs) -> Result<()> {
    let mut config = build_config(&args.pipeline)?;
    if let Some(features) = &args.plot_features {
        let [a, b] = features.as_slice() else {
            return Err(SVMError::InvalidParameter(format!(
                "--plot-features takes exactly two columns, got: {features:?}"
            )));
        };
        config.plot_features = [*a, *b];
    }
    if let Some(resolution) = args.grid_resolution {
        config.grid_resolution = resolution;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }

    info!("Running pipeline with {config:?}");
    let report = pipeline::run(&config)?;
    print_run_report(&report);
    Ok(())
}

fn print_run_report(report: &PipelineReport) {
    println!("=== Iris SVM ===");
    println!("Training rows: {}", report.n_train);
    println!("Test rows:     {}", report.n_test);
    println!();
    println!("Classification Report:");
    println!("{}", report.report);
    println!("Confusion Matrix:");
    print!("{}", report.confusion);
    println!();
    println!("{}", report.model_info);
    println!();
    let vis = &report.visualization;
    println!(
        "Two-feature model ({}, {}) accuracy: {:.2}",
        vis.feature_names[0], vis.feature_names[1], vis.accuracy
    );
    for path in &report.figures {
        println!("Figure written: {}", path.display());
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let config = build_config(&args.pipeline)?;
    config.validate()?;
    info!(
        "Parameters: C={}, epsilon={}, max_iter={}, kernel={:?}",
        config.c, config.epsilon, config.max_iterations, config.kernel
    );

    let dataset = pipeline::load_dataset(&config)?;
    let split = pipeline::split_dataset(&config, &dataset)?;
    info!(
        "Training on {} of {} rows",
        split.train.n_samples(),
        dataset.n_samples()
    );

    let (scaler, model) = pipeline::fit_scaled(&config, &split.train)?;
    info!("Training completed successfully");

    let saved = SavedModel::from_trained(&model, &scaler, &config)?;
    saved.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    let train_accuracy = model.score(&scaler.transform_dataset(&split.train)?)?;
    println!("Model saved to: {}", args.output.display());
    println!("Support vectors: {}", saved.n_support_vectors());
    println!("Training accuracy: {:.2}%", train_accuracy * 100.0);
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let saved = SavedModel::load_from_file(&args.model)?;
    let scaler = saved.to_scaler()?;
    let model = saved.to_trained()?;

    let mut config = saved.split_config();
    if args.data.is_some() {
        config.data_path = args.data;
    }
    let dataset = pipeline::load_dataset(&config)?;
    if dataset.target_names() != saved.class_names.as_slice() {
        return Err(SVMError::InvalidDataset(format!(
            "dataset classes {:?} differ from the model's {:?}",
            dataset.target_names(),
            saved.class_names
        )));
    }
    let split = pipeline::split_dataset(&config, &dataset)?;
    info!(
        "Rebuilt test split: {} rows (seed {}, test size {})",
        split.test.n_samples(),
        config.seed,
        config.test_size
    );

    let (_, report, confusion) = pipeline::evaluate(&scaler, &model, &split.test)?;

    println!("=== Model Evaluation ===");
    saved.print_summary();
    println!();
    println!("Classification Report:");
    println!("{report}");
    println!("Confusion Matrix:");
    print!("{confusion}");
    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let saved = SavedModel::load_from_file(&args.model)?;
    saved.print_summary();

    println!("\nScaler:");
    for ((name, mean), variance) in saved
        .feature_names
        .iter()
        .zip(&saved.scaler.mean)
        .zip(&saved.scaler.variance)
    {
        println!("  {name}: mean {mean:.4}, std {:.4}", variance.sqrt());
    }
    Ok(())
}
