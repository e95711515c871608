//! Logging Module
//!
//! Structured logging via the `tracing` crate, plus a progress logger for
//! the epoch loop.

use crate::dataset::transform::Phase;
use crate::utils::error::{PovertyError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber for a CLI run.
///
/// `verbose` lowers the filter to `debug`, which also enables per-batch
/// loss logging in the trainer.
pub fn setup_cli_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| PovertyError::Config(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}

/// Training progress logger
pub struct TrainingLogger {
    /// Current epoch (1-based)
    epoch: usize,
    /// Total epochs
    total_epochs: usize,
    /// Epoch start time
    epoch_start: std::time::Instant,
    /// Training start time
    training_start: std::time::Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: std::time::Instant::now(),
            training_start: std::time::Instant::now(),
        }
    }

    /// Log start of an epoch
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = std::time::Instant::now();

        tracing::info!("Epoch {}/{} started", epoch, self.total_epochs);
    }

    /// Log the metrics of a finished phase
    pub fn end_phase(&self, phase: Phase, loss: f64, r2: f64) {
        tracing::info!("  {} Loss: {:.4} | R2: {:.4}", phase, loss, r2);
    }

    /// Log end of an epoch with the current learning rate
    pub fn end_epoch(&self, learning_rate: f64) {
        let epoch_time = self.epoch_start.elapsed();
        let total_time = self.training_start.elapsed();

        let epochs_remaining = self.total_epochs - self.epoch;
        let avg_epoch_time = total_time.as_secs_f64() / self.epoch as f64;
        let eta_secs = epochs_remaining as f64 * avg_epoch_time;

        tracing::info!(
            "Epoch {}/{} completed in {:.1}s | LR: {:.6} | ETA: {:.0}s",
            self.epoch,
            self.total_epochs,
            epoch_time.as_secs_f64(),
            learning_rate,
            eta_secs
        );
    }

    /// Log a new best model
    pub fn log_new_best(&self, r2: f64) {
        tracing::info!("New best model! Val R2: {:.4}", r2);
    }

    /// Log training completion
    pub fn log_complete(&self, best_r2: f64) {
        let total_time = self.training_start.elapsed();
        let minutes = (total_time.as_secs_f64() / 60.0).floor();
        let seconds = total_time.as_secs_f64() % 60.0;

        tracing::info!(
            "Training complete in {:.0}m {:.0}s | Best R2: {:.4}",
            minutes,
            seconds,
            best_r2
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_logger_tracks_epoch() {
        let mut logger = TrainingLogger::new(10);
        logger.start_epoch(3);
        assert_eq!(logger.epoch, 3);
    }
}
