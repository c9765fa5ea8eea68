use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::error::{NnError, Result};
use crate::train::epoch_stats::EpochStats;

/// How many samples contribute to each weight update.
///
/// - `Stochastic` — update after every sample (batch size 1)
/// - `MiniBatch`  — update after every `batch_size` samples
/// - `FullBatch`  — update once per epoch, after every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDescent {
    Stochastic,
    MiniBatch,
    FullBatch,
}

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `learning_rate` — step size of the gradient-descent update
/// - `epochs`        — total number of full passes over the training data
/// - `batch_size`    — samples per batch; only read in `MiniBatch` mode
/// - `mode`          — update cadence, see [`GradientDescent`]
/// - `progress_tx`   — optional channel sender; one `EpochStats` is sent per
///                     completed epoch.  If the receiver is dropped the loop
///                     terminates early (clean shutdown).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub mode: GradientDescent,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

fn default_batch_size() -> usize {
    1
}

impl TrainConfig {
    /// Creates a `TrainConfig` with batch size 1 and no progress channel.
    pub fn new(learning_rate: f64, epochs: usize, mode: GradientDescent) -> Self {
        TrainConfig {
            learning_rate,
            epochs,
            batch_size: default_batch_size(),
            mode,
            progress_tx: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Samples per weight update for a training set of `num_samples`.
    pub fn effective_batch_size(&self, num_samples: usize) -> usize {
        match self.mode {
            GradientDescent::Stochastic => 1,
            GradientDescent::MiniBatch => self.batch_size,
            GradientDescent::FullBatch => num_samples,
        }
    }

    pub fn validate(&self, num_samples: usize) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NnError::config(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(NnError::config("epochs must be at least 1"));
        }
        if num_samples == 0 {
            return Err(NnError::config("training set has no samples"));
        }
        if self.mode == GradientDescent::MiniBatch {
            if self.batch_size == 0 {
                return Err(NnError::config("batch_size must be at least 1"));
            }
            if self.batch_size > num_samples {
                return Err(NnError::config(format!(
                    "batch_size {} exceeds the {num_samples} available samples",
                    self.batch_size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_follows_mode() {
        let cfg = TrainConfig::new(0.1, 10, GradientDescent::Stochastic).with_batch_size(3);
        assert_eq!(cfg.effective_batch_size(8), 1);
        let cfg = TrainConfig { mode: GradientDescent::MiniBatch, ..cfg };
        assert_eq!(cfg.effective_batch_size(8), 3);
        let cfg = TrainConfig { mode: GradientDescent::FullBatch, ..cfg };
        assert_eq!(cfg.effective_batch_size(8), 8);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let ok = TrainConfig::new(0.5, 10, GradientDescent::MiniBatch).with_batch_size(2);
        assert!(ok.validate(4).is_ok());
        assert!(ok.clone().with_batch_size(0).validate(4).is_err());
        assert!(ok.clone().with_batch_size(5).validate(4).is_err());
        assert!(TrainConfig { learning_rate: 0.0, ..ok.clone() }.validate(4).is_err());
        assert!(TrainConfig { epochs: 0, ..ok.clone() }.validate(4).is_err());
        assert!(ok.validate(0).is_err());
    }

    #[test]
    fn batch_size_is_ignored_outside_mini_batch() {
        let cfg = TrainConfig::new(0.5, 10, GradientDescent::Stochastic).with_batch_size(0);
        assert!(cfg.validate(4).is_ok());
    }
}
