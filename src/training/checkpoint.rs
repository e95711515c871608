//! Checkpointing and Run Artifacts
//!
//! Each training invocation owns one run directory under the output root.
//! The directory is claimed atomically at startup (create-fail-if-exists),
//! so a name collision aborts the run instead of overwriting a prior one.
//! Artifact writes are idempotent: saving twice for the same run and epoch
//! tag produces byte-identical files.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use serde::Serialize;
use tracing::info;

use crate::dataset::transform::Phase;
use crate::model::PovertyRegressor;
use crate::utils::error::{PovertyError, Result};
use crate::utils::metrics::MetricsHistory;

/// File stem of the model snapshot (the recorder appends `.mpk`)
pub const MODEL_FILE: &str = "model";

/// The best validation epoch seen so far: its R², the full prediction and
/// label vectors, and the model parameters that produced them.
#[derive(Debug, Clone)]
pub struct BestEpoch<B: Backend> {
    /// Epoch number (1-based) that produced this snapshot
    pub epoch: usize,
    /// Validation R² of the snapshot
    pub r2: f64,
    /// True labels of the validation set, in evaluation order
    pub y_true: Vec<f32>,
    /// Predictions of the validation set, in evaluation order
    pub y_pred: Vec<f32>,
    /// Model parameters at the snapshot epoch
    pub model: PovertyRegressor<B>,
}

/// Default run output root: `~/predicting-poverty/models`
pub fn default_run_root() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PovertyError::Config("could not determine home directory".to_string()))?;
    Ok(home.join("predicting-poverty").join("models"))
}

/// Claim a fresh run directory under `root`.
///
/// The root is created if absent; the run directory itself must not exist
/// yet. The create is atomic, so two runs racing for the same name cannot
/// both win.
pub fn create_run_dir(root: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(root)?;

    let run_dir = root.join(name);
    fs::create_dir(&run_dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            PovertyError::AlreadyExists(format!("run directory {}", run_dir.display()))
        } else {
            PovertyError::Io(e)
        }
    })?;

    info!("Created run directory {}", run_dir.display());
    Ok(run_dir)
}

/// Persist the run's artifacts: best-epoch label/prediction arrays, the
/// cumulative loss and R² histories, and the best model snapshot.
///
/// With an epoch tag the artifacts land in a per-epoch subdirectory of the
/// run; without one they land in the run directory itself. The target
/// directory is created if absent.
pub fn save_artifacts<B: Backend>(
    run_dir: &Path,
    epoch: Option<usize>,
    history: &MetricsHistory,
    best: &BestEpoch<B>,
) -> Result<()> {
    let basedir = match epoch {
        Some(e) => run_dir.join(e.to_string()),
        None => run_dir.to_path_buf(),
    };
    fs::create_dir_all(&basedir)?;

    write_json(&basedir.join("y_true.json"), &best.y_true)?;
    write_json(&basedir.join("y_pred.json"), &best.y_pred)?;
    write_json(&basedir.join("losses_train.json"), history.losses(Phase::Train))?;
    write_json(&basedir.join("losses_val.json"), history.losses(Phase::Val))?;
    write_json(&basedir.join("rsq_train.json"), history.r2s(Phase::Train))?;
    write_json(&basedir.join("rsq_val.json"), history.r2s(Phase::Val))?;

    best.model
        .clone()
        .save_file(basedir.join(MODEL_FILE), &CompactRecorder::new())
        .map_err(|e| PovertyError::Model(format!("failed to save model snapshot: {e}")))?;

    info!("Saved artifacts to {}", basedir.display());
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PovertyRegressorConfig;
    use burn::backend::NdArray;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn tiny_best(device: &<TestBackend as Backend>::Device) -> BestEpoch<TestBackend> {
        let config = PovertyRegressorConfig::new()
            .with_input_size(8)
            .with_base_filters(2);
        BestEpoch {
            epoch: 1,
            r2: 0.5,
            y_true: vec![0.0, 1.0],
            y_pred: vec![0.1, 0.9],
            model: PovertyRegressor::new(&config, device),
        }
    }

    fn sample_history() -> MetricsHistory {
        let mut history = MetricsHistory::new();
        history.record(Phase::Train, 1.0, 0.2);
        history.record(Phase::Val, 1.5, 0.1);
        history
    }

    fn read_all(dir: &Path) -> BTreeMap<String, Vec<u8>> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| {
                let path = entry.unwrap().path();
                path.is_file().then(|| {
                    (
                        path.file_name().unwrap().to_string_lossy().to_string(),
                        fs::read(&path).unwrap(),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn test_run_dir_collision_fails() {
        let root = TempDir::new().unwrap();

        create_run_dir(root.path(), "run1").unwrap();
        let err = create_run_dir(root.path(), "run1").unwrap_err();

        assert!(matches!(err, PovertyError::AlreadyExists(_)));
    }

    #[test]
    fn test_save_writes_expected_artifacts() {
        let root = TempDir::new().unwrap();
        let run_dir = create_run_dir(root.path(), "run1").unwrap();
        let device = Default::default();

        save_artifacts(&run_dir, None, &sample_history(), &tiny_best(&device)).unwrap();

        for name in [
            "y_true.json",
            "y_pred.json",
            "losses_train.json",
            "losses_val.json",
            "rsq_train.json",
            "rsq_val.json",
            "model.mpk",
        ] {
            assert!(run_dir.join(name).exists(), "missing {name}");
        }

        let losses: Vec<f64> =
            serde_json::from_str(&fs::read_to_string(run_dir.join("losses_val.json")).unwrap())
                .unwrap();
        assert_eq!(losses, vec![1.5]);
    }

    #[test]
    fn test_epoch_tag_nests_a_subdirectory() {
        let root = TempDir::new().unwrap();
        let run_dir = create_run_dir(root.path(), "run1").unwrap();
        let device = Default::default();

        save_artifacts(&run_dir, Some(3), &sample_history(), &tiny_best(&device)).unwrap();

        assert!(run_dir.join("3").join("y_pred.json").exists());
        assert!(run_dir.join("3").join("model.mpk").exists());
    }

    #[test]
    fn test_double_save_is_byte_identical() {
        let root = TempDir::new().unwrap();
        let run_dir = create_run_dir(root.path(), "run1").unwrap();
        let device = Default::default();

        let history = sample_history();
        let best = tiny_best(&device);

        save_artifacts(&run_dir, None, &history, &best).unwrap();
        let first = read_all(&run_dir);

        save_artifacts(&run_dir, None, &history, &best).unwrap();
        let second = read_all(&run_dir);

        assert_eq!(first, second);
    }
}
