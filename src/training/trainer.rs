//! Training Loop
//!
//! A custom epoch-wise train/validation loop on Burn's API: forward pass,
//! MSE loss, backward pass, and functional Adam updates, with plateau LR
//! scheduling and best-model selection by validation R². Validation is a
//! pure forward evaluation on the inner backend; no parameter ever changes
//! outside the train phase.

use std::path::PathBuf;

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, backend::Backend, ElementConversion, Tensor},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::loader::BatchLoader;
use crate::dataset::tile::{TileBatcher, TileItem};
use crate::dataset::transform::Phase;
use crate::model::PovertyRegressor;
use crate::training::checkpoint::{save_artifacts, BestEpoch};
use crate::training::scheduler::PlateauScheduler;
use crate::training::{DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, LR_PATIENCE, LR_REDUCTION_FACTOR};
use crate::utils::error::{PovertyError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{r_squared, MetricsHistory};

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of epochs
    pub epochs: usize,
    /// Initial learning rate
    pub learning_rate: f64,
    /// Adam weight decay
    pub weight_decay: f64,
    /// Update the whole network (true) or only the regression head (false)
    pub fine_tune: bool,
    /// Persist an intermediate checkpoint every N epochs when verbose
    pub log_epoch_interval: usize,
    /// Enable per-batch logging and interval checkpoints
    pub verbose: bool,
    /// Side length of the preprocessed tiles the loaders yield
    pub tile_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            weight_decay: 0.0,
            fine_tune: true,
            log_epoch_interval: 20,
            verbose: false,
            tile_size: crate::TILE_SIZE,
        }
    }
}

/// Metrics of one completed phase
#[derive(Debug, Clone)]
pub struct PhaseMetrics {
    /// Sample-weighted mean loss over the phase
    pub loss: f64,
    /// R² over the phase's full set of (true, predicted) pairs
    pub r2: f64,
    /// True labels in iteration order
    pub y_true: Vec<f32>,
    /// Predictions in iteration order
    pub y_pred: Vec<f32>,
}

/// Result of a completed run
pub struct TrainingOutcome<B: Backend> {
    /// The model restored to its best-validation-R² parameters
    pub model: PovertyRegressor<B>,
    /// Per-phase loss and R² histories over all epochs
    pub history: MetricsHistory,
    /// The best validation epoch
    pub best: BestEpoch<B>,
}

/// Epoch-wise trainer for the poverty regressor
pub struct Trainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
    run_dir: PathBuf,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a trainer writing artifacts into `run_dir`
    pub fn new(config: TrainerConfig, device: B::Device, run_dir: PathBuf) -> Self {
        Self {
            config,
            device,
            run_dir,
        }
    }

    /// Run the full training loop.
    ///
    /// Each epoch trains over every batch of `train_loader`, then
    /// evaluates `val_loader`, feeds the validation loss to the plateau
    /// scheduler, and snapshots the model whenever validation R² strictly
    /// improves. After the final epoch the best snapshot is restored,
    /// persisted, and returned. Any batch or persistence error aborts the
    /// run; there are no retries.
    pub fn fit<DT, DV>(
        &self,
        mut model: PovertyRegressor<B>,
        train_loader: &mut BatchLoader<DT>,
        val_loader: &mut BatchLoader<DV>,
    ) -> Result<TrainingOutcome<B>>
    where
        DT: Dataset<TileItem>,
        DV: Dataset<TileItem>,
    {
        let mut optimizer = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(self.config.weight_decay)))
            .init();
        let mut scheduler =
            PlateauScheduler::new(self.config.learning_rate, LR_REDUCTION_FACTOR, LR_PATIENCE);
        let mut logger = TrainingLogger::new(self.config.epochs);
        let batcher = TileBatcher::<B>::with_image_size(self.device.clone(), self.config.tile_size);

        let mut history = MetricsHistory::new();
        let mut best: Option<BestEpoch<B>> = None;
        let mut lr = self.config.learning_rate;

        let train_size = train_loader.num_samples();

        for epoch in 1..=self.config.epochs {
            logger.start_epoch(epoch);

            // Train phase
            let mut running_loss = 0.0f64;
            let mut y_true = Vec::with_capacity(train_size);
            let mut y_pred = Vec::with_capacity(train_size);

            for (batch_idx, batch) in train_loader.epoch().enumerate() {
                let batch = batcher.batch(batch?);
                let batch_len = batch.targets.dims()[0];

                let preds = model.forward(batch.images);
                let loss =
                    MseLoss::new().forward(preds.clone(), batch.targets.clone(), Reduction::Mean);
                let loss_value: f64 = loss.clone().into_scalar().elem();

                running_loss += loss_value * batch_len as f64;
                extend_from_tensor(&mut y_true, batch.targets)?;
                extend_from_tensor(&mut y_pred, preds)?;

                let grads = loss.backward();
                let grads = if self.config.fine_tune {
                    GradientsParams::from_grads(grads, &model)
                } else {
                    // Only the regression head receives updates
                    GradientsParams::from_grads(grads, &model.head)
                };
                model = optimizer.step(lr, model, grads);

                debug!("  Batch {}: loss = {:.4}", batch_idx + 1, loss_value);
            }

            let train_loss = running_loss / train_size as f64;
            let train_r2 = r_squared(&y_true, &y_pred);
            history.record(Phase::Train, train_loss, train_r2);
            logger.end_phase(Phase::Train, train_loss, train_r2);

            // Val phase
            let val = self.evaluate(&model, val_loader)?;
            history.record(Phase::Val, val.loss, val.r2);
            logger.end_phase(Phase::Val, val.loss, val.r2);

            lr = scheduler.step(val.loss);

            let best_r2 = best.as_ref().map(|b| b.r2).unwrap_or(f64::NEG_INFINITY);
            if val.r2 > best_r2 {
                logger.log_new_best(val.r2);
                best = Some(BestEpoch {
                    epoch,
                    r2: val.r2,
                    y_true: val.y_true,
                    y_pred: val.y_pred,
                    model: model.clone(),
                });
            }

            if self.config.verbose && epoch % self.config.log_epoch_interval == 0 {
                if let Some(best) = best.as_ref() {
                    save_artifacts(&self.run_dir, Some(epoch), &history, best)?;
                }
            }

            logger.end_epoch(lr);
        }

        let best = best
            .ok_or_else(|| PovertyError::Training("training ran for zero epochs".to_string()))?;

        save_artifacts(&self.run_dir, None, &history, &best)?;
        logger.log_complete(best.r2);

        // Discard the final epoch's parameters unless they are the best
        let model = best.model.clone();

        Ok(TrainingOutcome {
            model,
            history,
            best,
        })
    }

    /// Evaluate the model over one ordered pass of a loader.
    ///
    /// Runs on the inner backend via `valid()`: a pure forward pass that
    /// cannot touch the model's parameters.
    pub fn evaluate<D>(
        &self,
        model: &PovertyRegressor<B>,
        loader: &mut BatchLoader<D>,
    ) -> Result<PhaseMetrics>
    where
        D: Dataset<TileItem>,
    {
        let inner_model = model.clone().valid();
        let batcher =
            TileBatcher::<B::InnerBackend>::with_image_size(self.device.clone(), self.config.tile_size);

        let num_samples = loader.num_samples();
        let mut running_loss = 0.0f64;
        let mut y_true = Vec::with_capacity(num_samples);
        let mut y_pred = Vec::with_capacity(num_samples);

        for batch in loader.epoch() {
            let batch = batcher.batch(batch?);
            let batch_len = batch.targets.dims()[0];

            let preds = inner_model.forward(batch.images);
            let loss =
                MseLoss::new().forward(preds.clone(), batch.targets.clone(), Reduction::Mean);
            let loss_value: f64 = loss.into_scalar().elem();

            running_loss += loss_value * batch_len as f64;
            extend_from_tensor(&mut y_true, batch.targets)?;
            extend_from_tensor(&mut y_pred, preds)?;
        }

        let loss = if num_samples == 0 {
            0.0
        } else {
            running_loss / num_samples as f64
        };

        Ok(PhaseMetrics {
            loss,
            r2: r_squared(&y_true, &y_pred),
            y_true,
            y_pred,
        })
    }
}

fn extend_from_tensor<B: Backend>(dst: &mut Vec<f32>, tensor: Tensor<B, 1>) -> Result<()> {
    let values: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| PovertyError::Training(format!("failed to read tensor data: {e:?}")))?;
    dst.extend(values);
    Ok(())
}
