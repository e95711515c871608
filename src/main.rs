//! Poverty Regression Training CLI
//!
//! Fine-tunes the convolutional regressor on satellite tiles for one
//! country and satellite source, writing all artifacts of the run into a
//! freshly claimed directory under the output root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use predicting_poverty::backend::{backend_name, default_device, TrainingBackend};
use predicting_poverty::dataset::{
    BatchLoader, Country, Phase, SatType, SurveyTileConfig, SurveyTileDataset, TransformPipeline,
};
use predicting_poverty::model::{PovertyRegressor, PovertyRegressorConfig};
use predicting_poverty::training::checkpoint::{create_run_dir, default_run_root, MODEL_FILE};
use predicting_poverty::training::{Trainer, TrainerConfig};
use predicting_poverty::utils::logging::setup_cli_logging;

/// Satellite Poverty Regression Training Tool
#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Fine-tune a CNN to regress consumption from satellite tiles",
    long_about = "Fine-tune a convolutional regression network to predict a \
                  consumption-based poverty proxy from satellite imagery tiles, \
                  with plateau LR scheduling and best-model selection by \
                  validation R²."
)]
struct Args {
    /// Run name (defaults to <country>_<sat>_<year>_<timestamp>)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Number of training epochs
    #[arg(long, default_value = "10")]
    epochs: usize,

    /// Survey country (bangladesh or india)
    #[arg(long, default_value = "india")]
    country: Country,

    /// Satellite imagery source (s1 or l8)
    #[arg(long, default_value = "s1")]
    sat_type: SatType,

    /// Imagery acquisition year
    #[arg(long, default_value = "2015")]
    year: u16,

    /// Manifest column holding the scalar label
    #[arg(long, default_value = "secc_cons_per_cap_scaled")]
    label: String,

    /// Fraction of manifest rows to train on
    #[arg(long, default_value = "1.0")]
    train_frac: f64,

    /// Learning rate
    #[arg(long, default_value = "1e-5")]
    lr: f64,

    /// Adam weight decay
    #[arg(long, default_value = "0")]
    weight_decay: f64,

    /// Batch size
    #[arg(long, default_value = "128")]
    batch_size: usize,

    /// Persist an intermediate checkpoint every N epochs when verbose
    #[arg(long, default_value = "20")]
    log_epoch_interval: usize,

    /// Start from a prior run's model snapshot (run directory or file stem)
    #[arg(long, value_name = "PATH")]
    preload_model: Option<PathBuf>,

    /// Subdirectory of the data root holding train.csv and valid.csv
    #[arg(long, value_name = "DIR")]
    data_subdir: Option<String>,

    /// Train only the regression head, freezing the encoder
    #[arg(long)]
    no_fine_tune: bool,

    /// Verbose logging (per-batch losses, interval checkpoints)
    #[arg(short, long)]
    verbose: bool,

    /// Random seed for shuffling and initialization
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Directory holding the manifest subdirectories
    #[arg(long, default_value = "data", value_name = "DIR")]
    data_root: PathBuf,

    /// Directory holding the satellite tiles (defaults to ~/imagery)
    #[arg(long, value_name = "DIR")]
    imagery_root: Option<PathBuf>,

    /// Root for run output directories (defaults to ~/predicting-poverty/models)
    #[arg(long, value_name = "DIR")]
    output_root: Option<PathBuf>,
}

/// Resolved run configuration, persisted to the run directory
#[derive(Debug, Serialize, Deserialize)]
struct RunConfig {
    name: String,
    epochs: usize,
    country: Country,
    sat_type: SatType,
    year: u16,
    label: String,
    train_frac: f64,
    lr: f64,
    weight_decay: f64,
    batch_size: usize,
    log_epoch_interval: usize,
    preload_model: Option<PathBuf>,
    fine_tune: bool,
    seed: u64,
    train_manifest: PathBuf,
    val_manifest: PathBuf,
    imagery_root: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    let run_name = args.name.clone().unwrap_or_else(|| {
        format!(
            "{}_{}_{}_{}",
            args.country,
            args.sat_type,
            args.year,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )
    });

    let output_root = match args.output_root.clone() {
        Some(root) => root,
        None => default_run_root()?,
    };
    let run_dir = create_run_dir(&output_root, &run_name)?;

    let home = dirs::home_dir().context("could not determine home directory")?;
    let imagery_root = args
        .imagery_root
        .clone()
        .unwrap_or_else(|| home.join("imagery"));

    let manifest_dir = match &args.data_subdir {
        Some(subdir) => args.data_root.join(subdir),
        None => args.data_root.clone(),
    };
    let train_manifest = manifest_dir.join("train.csv");
    let val_manifest = manifest_dir.join("valid.csv");

    let config = RunConfig {
        name: run_name.clone(),
        epochs: args.epochs,
        country: args.country,
        sat_type: args.sat_type,
        year: args.year,
        label: args.label.clone(),
        train_frac: args.train_frac,
        lr: args.lr,
        weight_decay: args.weight_decay,
        batch_size: args.batch_size,
        log_epoch_interval: args.log_epoch_interval,
        preload_model: args.preload_model.clone(),
        fine_tune: !args.no_fine_tune,
        seed: args.seed,
        train_manifest: train_manifest.clone(),
        val_manifest: val_manifest.clone(),
        imagery_root: imagery_root.clone(),
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    std::fs::write(run_dir.join("config.json"), config_json)
        .context("Failed to save run configuration")?;

    print_config_summary(&config, &run_dir);

    TrainingBackend::seed(args.seed);
    let device = default_device();

    info!("Loading datasets...");
    let train_dataset = SurveyTileDataset::new(
        dataset_config(&config, train_manifest),
        TransformPipeline::new(args.sat_type, Phase::Train),
    )?;
    let val_dataset = SurveyTileDataset::new(
        dataset_config(&config, val_manifest),
        TransformPipeline::new(args.sat_type, Phase::Val),
    )?;
    info!(
        "Dataset sizes: train {}, val {}",
        train_dataset.len(),
        val_dataset.len(),
    );

    let mut train_loader = BatchLoader::train(train_dataset, args.batch_size, args.seed);
    let mut val_loader = BatchLoader::val(val_dataset, args.batch_size);

    let model_config = PovertyRegressorConfig::new();
    let mut model: PovertyRegressor<TrainingBackend> = PovertyRegressor::new(&model_config, &device);

    if let Some(preload) = &args.preload_model {
        let snapshot = if preload.is_dir() {
            preload.join(MODEL_FILE)
        } else {
            preload.clone()
        };
        info!("Preloading model weights from {}", snapshot.display());
        model = model.load_weights(&snapshot, &device)?;
    }

    let trainer_config = TrainerConfig {
        epochs: args.epochs,
        learning_rate: args.lr,
        weight_decay: args.weight_decay,
        fine_tune: !args.no_fine_tune,
        log_epoch_interval: args.log_epoch_interval,
        verbose: args.verbose,
        tile_size: predicting_poverty::TILE_SIZE,
    };
    let trainer = Trainer::new(trainer_config, device, run_dir.clone());

    let outcome = trainer.fit(model, &mut train_loader, &mut val_loader)?;

    info!("");
    info!("Training Summary:");
    info!("  Best val R2: {:.4} (epoch {})", outcome.best.r2, outcome.best.epoch);
    info!("  Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn dataset_config(config: &RunConfig, manifest: PathBuf) -> SurveyTileConfig {
    SurveyTileConfig {
        manifest,
        imagery_root: config.imagery_root.clone(),
        label_column: config.label.clone(),
        country: config.country,
        sat_type: config.sat_type,
        year: config.year,
        frac: config.train_frac,
        seed: config.seed,
    }
}

fn print_config_summary(config: &RunConfig, run_dir: &std::path::Path) {
    info!("Satellite Poverty Regression - Training Tool");
    info!("============================================");
    info!("Begin training for {}", config.country);
    info!("  Epochs: {}", config.epochs);
    info!("  Batch size: {}", config.batch_size);
    info!("  Learning rate: {}", config.lr);
    info!("  Weight decay: {}", config.weight_decay);
    info!("  Fine tune full network: {}", config.fine_tune);
    info!(
        "  Satellite (type, year): {}, {}",
        config.sat_type, config.year
    );
    info!("  Label column: {}", config.label);
    info!("  Train manifest: {}", config.train_manifest.display());
    info!("  Val manifest: {}", config.val_manifest.display());
    info!("  Imagery root: {}", config.imagery_root.display());
    info!("  Backend: {}", backend_name());
    info!("  Run directory: {}", run_dir.display());
    info!("");
}
