//! # Predicting Poverty
//!
//! A Rust library for regressing consumption-based poverty proxies from
//! satellite imagery tiles using the Burn framework.
//!
//! ## Features
//!
//! - **Manifest-driven datasets** for Bangladesh and India survey tiles
//! - **Per-satellite preprocessing** (Sentinel-1 and Landsat-8 crop presets)
//! - **Burn framework** for portable convolutional training and inference
//! - **Best-model selection** by validation R² with plateau LR scheduling
//!
//! ## Modules
//!
//! - `dataset`: Manifest loading, image preprocessing, and batching
//! - `model`: CNN encoder with a scalar regression head
//! - `training`: Training loop, LR scheduling, and checkpointing
//! - `utils`: Logging, metrics, and error handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use predicting_poverty::dataset::{
//!     Phase, SatType, SurveyTileDataset, TransformPipeline,
//! };
//! use predicting_poverty::model::PovertyRegressorConfig;
//!
//! // Load dataset
//! let transform = TransformPipeline::new(SatType::S1, Phase::Train);
//! let dataset = SurveyTileDataset::new(config, transform)?;
//!
//! // Create model
//! let model_config = PovertyRegressorConfig::new();
//! // ... training via training::Trainer
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::loader::BatchLoader;
pub use dataset::survey::{Country, SurveyTileConfig, SurveyTileDataset};
pub use dataset::tile::{TileBatch, TileBatcher, TileItem};
pub use dataset::transform::{Phase, SatType, TransformPipeline};
pub use model::regressor::{PovertyRegressor, PovertyRegressorConfig};
pub use training::checkpoint::BestEpoch;
pub use training::scheduler::PlateauScheduler;
pub use training::trainer::{Trainer, TrainerConfig, TrainingOutcome};
pub use utils::error::{PovertyError, Result};
pub use utils::metrics::{r_squared, MetricsHistory};

/// Side length of a preprocessed tile fed to the network
pub const TILE_SIZE: usize = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
