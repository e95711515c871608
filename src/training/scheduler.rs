//! Learning Rate Scheduler
//!
//! Reduce-on-plateau scheduling: the validation loss is monitored in
//! "min" mode, and the learning rate is multiplied by a fixed factor after
//! a configured number of epochs without improvement.

/// State for the reduce-on-plateau scheduler
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    best_loss: f64,
    epochs_without_improvement: usize,
    current_lr: f64,
    reduction_factor: f64,
    patience: usize,
    threshold: f64,
    min_lr: f64,
}

impl PlateauScheduler {
    /// Create a new scheduler monitoring a loss that should decrease
    pub fn new(initial_lr: f64, reduction_factor: f64, patience: usize) -> Self {
        Self {
            best_loss: f64::INFINITY,
            epochs_without_improvement: 0,
            current_lr: initial_lr,
            reduction_factor,
            patience,
            threshold: 1e-4,
            min_lr: 0.0,
        }
    }

    /// Set the minimum improvement that counts as progress
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the lower bound the learning rate is clamped to
    pub fn with_min_lr(mut self, min_lr: f64) -> Self {
        self.min_lr = min_lr;
        self
    }

    /// Update the scheduler with this epoch's validation loss and return
    /// the learning rate to use next.
    pub fn step(&mut self, loss: f64) -> f64 {
        let improved = loss < self.best_loss - self.threshold;

        if improved {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;

            if self.epochs_without_improvement >= self.patience {
                let new_lr = (self.current_lr * self.reduction_factor).max(self.min_lr);
                if new_lr < self.current_lr {
                    tracing::info!(
                        "Validation loss plateaued; reducing LR {:.6} -> {:.6}",
                        self.current_lr,
                        new_lr
                    );
                    self.current_lr = new_lr;
                    self.epochs_without_improvement = 0;
                }
            }
        }

        self.current_lr
    }

    /// Get the current learning rate
    pub fn get_lr(&self) -> f64 {
        self.current_lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduces_after_patience() {
        let mut scheduler = PlateauScheduler::new(0.1, 0.5, 3);

        // Loss improves
        assert_eq!(scheduler.step(1.0), 0.1);
        assert_eq!(scheduler.step(0.9), 0.1);
        assert_eq!(scheduler.step(0.8), 0.1);

        // Loss stagnates
        assert_eq!(scheduler.step(0.85), 0.1);
        assert_eq!(scheduler.step(0.86), 0.1);
        assert_eq!(scheduler.step(0.87), 0.05); // reduced after patience=3
    }

    #[test]
    fn test_improvement_resets_the_counter() {
        let mut scheduler = PlateauScheduler::new(0.1, 0.1, 2);

        scheduler.step(1.0);
        scheduler.step(1.1); // stall 1
        scheduler.step(0.5); // improvement resets the counter
        assert_eq!(scheduler.step(0.6), 0.1); // stall 1, no reduction yet
        assert!((scheduler.step(0.6) - 0.01).abs() < 1e-12); // stall 2 -> reduced
    }

    #[test]
    fn test_clamps_at_min_lr() {
        let mut scheduler = PlateauScheduler::new(0.1, 0.1, 1).with_min_lr(0.01);

        scheduler.step(1.0);
        assert_eq!(scheduler.step(1.0), 0.01);
        // Already clamped; no further reduction
        assert_eq!(scheduler.step(1.0), 0.01);
    }

    #[test]
    fn test_sub_threshold_change_is_a_plateau() {
        let mut scheduler = PlateauScheduler::new(0.1, 0.5, 1).with_threshold(1e-2);

        scheduler.step(1.0);
        // 0.995 is within the threshold of 1.0, so it does not count
        assert_eq!(scheduler.step(0.995), 0.05);
    }
}
