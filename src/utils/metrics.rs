//! Regression metrics and per-run metric history.

use serde::{Deserialize, Serialize};

use crate::dataset::transform::Phase;

/// Coefficient of determination over paired observations.
///
/// Returns `1 - ss_res / ss_tot`. When the labels have zero variance the
/// score degenerates to 1.0 for a perfect fit and 0.0 otherwise; an empty
/// input yields 0.0.
pub fn r_squared(y_true: &[f32], y_pred: &[f32]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }

    let n = y_true.len() as f64;
    let mean: f64 = y_true.iter().map(|&y| y as f64).sum::<f64>() / n;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| {
            let d = t as f64 - p as f64;
            d * d
        })
        .sum();
    let ss_tot: f64 = y_true
        .iter()
        .map(|&t| {
            let d = t as f64 - mean;
            d * d
        })
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

/// Append-only per-phase history of epoch losses and R² scores.
///
/// Owned by the training loop; the checkpoint writer only ever reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsHistory {
    train_loss: Vec<f64>,
    val_loss: Vec<f64>,
    train_r2: Vec<f64>,
    val_r2: Vec<f64>,
}

impl MetricsHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the metrics of a finished phase
    pub fn record(&mut self, phase: Phase, loss: f64, r2: f64) {
        match phase {
            Phase::Train => {
                self.train_loss.push(loss);
                self.train_r2.push(r2);
            }
            Phase::Val => {
                self.val_loss.push(loss);
                self.val_r2.push(r2);
            }
        }
    }

    /// Epoch losses recorded for a phase, in epoch order
    pub fn losses(&self, phase: Phase) -> &[f64] {
        match phase {
            Phase::Train => &self.train_loss,
            Phase::Val => &self.val_loss,
        }
    }

    /// Epoch R² scores recorded for a phase, in epoch order
    pub fn r2s(&self, phase: Phase) -> &[f64] {
        match phase {
            Phase::Train => &self.train_r2,
            Phase::Val => &self.val_r2,
        }
    }

    /// Number of completed epochs recorded for a phase
    pub fn epochs(&self, phase: Phase) -> usize {
        self.losses(phase).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r_squared_perfect_fit() {
        let y = [0.0f32, 1.0, 2.0, 3.0];
        assert_eq!(r_squared(&y, &y), 1.0);
    }

    #[test]
    fn test_r_squared_mean_predictor_is_zero() {
        let y_true = [1.0f32, 2.0, 3.0, 4.0];
        let y_pred = [2.5f32, 2.5, 2.5, 2.5];
        assert!(r_squared(&y_true, &y_pred).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_known_value() {
        let y_true = [1.0f32, 2.0, 3.0];
        let y_pred = [1.0f32, 2.0, 4.0];
        // ss_res = 1, ss_tot = 2
        assert!((r_squared(&y_true, &y_pred) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_degenerate_labels() {
        let y_true = [2.0f32, 2.0, 2.0];
        assert_eq!(r_squared(&y_true, &[2.0, 2.0, 2.0]), 1.0);
        assert_eq!(r_squared(&y_true, &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_r_squared_empty() {
        assert_eq!(r_squared(&[], &[]), 0.0);
    }

    #[test]
    fn test_history_is_per_phase_and_ordered() {
        let mut history = MetricsHistory::new();
        history.record(Phase::Train, 1.0, 0.1);
        history.record(Phase::Val, 2.0, 0.2);
        history.record(Phase::Train, 0.5, 0.3);

        assert_eq!(history.losses(Phase::Train), &[1.0, 0.5]);
        assert_eq!(history.losses(Phase::Val), &[2.0]);
        assert_eq!(history.r2s(Phase::Train), &[0.1, 0.3]);
        assert_eq!(history.epochs(Phase::Val), 1);
    }
}
