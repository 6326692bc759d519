//! Checkpoint loading and best-model saving.

use super::history::{EpochLog, History};
use crate::common::*;

/// A model whose parameters live in a variable store.
pub trait Checkpointable {
    fn var_store(&self) -> &nn::VarStore;
    fn var_store_mut(&mut self) -> &mut nn::VarStore;
}

/// The result of looking for a saved model.
#[derive(Debug)]
pub enum LoadOutcome<M> {
    /// The parameters were restored from the checkpoint.
    Loaded(M),
    /// No usable checkpoint exists.
    NeedsTraining,
}

impl<M> LoadOutcome<M> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// The result of a build-or-load call.
#[derive(Debug)]
pub enum BuildOutcome<M> {
    /// Restored from a checkpoint without training.
    Loaded(M),
    /// Trained from scratch.
    Trained { model: M, history: History },
}

impl<M> BuildOutcome<M> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn model(&self) -> &M {
        match self {
            Self::Loaded(model) => model,
            Self::Trained { model, .. } => model,
        }
    }

    pub fn history(&self) -> Option<&History> {
        match self {
            Self::Loaded(_) => None,
            Self::Trained { history, .. } => Some(history),
        }
    }
}

/// Restores the parameters of `model` from `path`.
///
/// An absent, unreadable or mismatching checkpoint is reported as
/// [LoadOutcome::NeedsTraining] and never fails. The passed model is dropped
/// in that case since a failed load may have overwritten part of its parameters.
pub fn try_load_checkpoint<M>(mut model: M, path: &Path) -> LoadOutcome<M>
where
    M: Checkpointable,
{
    if !path.is_file() {
        info!("no checkpoint found at '{}'", path.display());
        return LoadOutcome::NeedsTraining;
    }

    match model.var_store_mut().load(path) {
        Ok(()) => {
            info!("load checkpoint file '{}'", path.display());
            LoadOutcome::Loaded(model)
        }
        Err(err) => {
            warn!(
                "unable to load checkpoint file '{}', train from scratch: {}",
                path.display(),
                err
            );
            LoadOutcome::NeedsTraining
        }
    }
}

/// Whether the monitored metric should decrease or increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Maximize accuracy metrics and minimize everything else.
    Auto,
    Min,
    Max,
}

/// Saves the model at the end of an epoch when the monitored metric improves.
#[derive(Debug, Clone)]
pub struct ModelCheckpoint {
    path: PathBuf,
    monitor: String,
    mode: MonitorMode,
    save_best_only: bool,
    best: Option<f64>,
}

impl ModelCheckpoint {
    /// Monitors `val_loss` and keeps only the best model.
    pub fn new<P>(path: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            path: path.as_ref().to_owned(),
            monitor: "val_loss".into(),
            mode: MonitorMode::Auto,
            save_best_only: true,
            best: None,
        }
    }

    pub fn monitor<S>(mut self, monitor: S, mode: MonitorMode) -> Self
    where
        S: Into<String>,
    {
        self.monitor = monitor.into();
        self.mode = mode;
        self
    }

    pub fn save_best_only(mut self, save_best_only: bool) -> Self {
        self.save_best_only = save_best_only;
        self
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    fn minimize(&self) -> bool {
        match self.mode {
            MonitorMode::Min => true,
            MonitorMode::Max => false,
            MonitorMode::Auto => !self.monitor.contains("acc"),
        }
    }

    fn is_improvement(&self, value: f64) -> bool {
        match self.best {
            None => !value.is_nan(),
            Some(best) if self.minimize() => value < best,
            Some(best) => value > best,
        }
    }

    /// Inspects the epoch log and saves `vs` if needed. Returns true if saved.
    pub fn on_epoch_end(&mut self, log: &EpochLog, vs: &nn::VarStore) -> Result<bool> {
        if !self.save_best_only {
            info!("epoch {}: saving model to '{}'", log.epoch, self.path.display());
            self.save(vs)?;
            return Ok(true);
        }

        let value = match log.get(&self.monitor) {
            Some(value) => value,
            None => {
                warn!(
                    "can save best model only with {} available, skipping",
                    self.monitor
                );
                return Ok(false);
            }
        };

        if !self.is_improvement(value) {
            info!(
                "epoch {}: {} did not improve from {:.5}",
                log.epoch,
                self.monitor,
                self.best.unwrap_or(f64::NAN)
            );
            return Ok(false);
        }

        let previous = self
            .best
            .unwrap_or(if self.minimize() { f64::INFINITY } else { f64::NEG_INFINITY });
        info!(
            "epoch {}: {} improved from {:.5} to {:.5}, saving model to '{}'",
            log.epoch,
            self.monitor,
            previous,
            value,
            self.path.display()
        );
        self.save(vs)?;
        self.best = Some(value);
        Ok(true)
    }

    fn save(&self, vs: &nn::VarStore) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create checkpoint directory '{}'", dir.display())
                })?;
            }
        }
        vs.save(&self.path)
            .with_context(|| format!("failed to save checkpoint '{}'", self.path.display()))?;
        Ok(())
    }
}
