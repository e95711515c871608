//! Training module for poverty regression
//!
//! This module provides:
//! - The epoch-wise train/validation loop with best-model tracking
//! - Plateau-triggered learning rate scheduling
//! - Run directory management and artifact persistence

pub mod checkpoint;
pub mod scheduler;
pub mod trainer;

// Re-export main types for convenience
pub use checkpoint::{create_run_dir, default_run_root, save_artifacts, BestEpoch};
pub use scheduler::PlateauScheduler;
pub use trainer::{PhaseMetrics, Trainer, TrainerConfig, TrainingOutcome};

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 10;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-5;

/// Multiplicative learning-rate reduction applied on a validation-loss plateau
pub const LR_REDUCTION_FACTOR: f64 = 0.1;

/// Epochs without validation-loss improvement before the rate is reduced
pub const LR_PATIENCE: usize = 3;
