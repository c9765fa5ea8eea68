use serde::{Deserialize, Serialize};

/// Per-epoch training statistics emitted by `train_loop`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop sends one `EpochStats` value at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean squared error over the samples processed this epoch.
    pub loss: f64,
    /// Mean squared error of each output dimension.
    pub loss_per_output: Vec<f64>,
    /// Mean squared error of the epoch's final batch.
    pub last_batch_loss: f64,
    /// Samples that contributed; remainder samples beyond the last full
    /// batch are skipped.
    pub samples: usize,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
