use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::loss::mse::SquaredErrorAccumulator;
use crate::math::matrix::MatrixView;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::{GradientDescent, TrainConfig};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the mean squared
/// error of the **last completed epoch**.
///
/// # Arguments
/// - `network` — mutable reference to the network; modified in place
/// - `x`       — training inputs, one row per sample
/// - `y`       — training targets, one row per sample
/// - `config`  — hyperparameters and optional progress channel
/// - `rng`     — source of the per-epoch sample shuffle
///
/// Each epoch visits the samples in a fresh random order, split into
/// batches of the mode's size. Samples left over after the last full batch
/// are skipped for that epoch.
///
/// # Early termination
/// The loop stops after an epoch if the `progress_tx` receiver has been
/// dropped.
///
/// # Errors
/// Fails before touching the network if `x`/`y` do not match its widths or
/// each other, or if `config` is invalid for this many samples.
pub fn train_loop<R: Rng + ?Sized>(
    network: &mut Network,
    x: MatrixView<'_>,
    y: MatrixView<'_>,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<f64> {
    network.check_dataset(x, y)?;
    config.validate(x.rows())?;
    let optimizer = Sgd::new(config.learning_rate)?;
    let batch_size = config.effective_batch_size(x.rows());

    let mut order: Vec<usize> = (0..x.rows()).collect();
    let mut losses = LossScopes::new(network.output_size())?;
    let mut last_loss = 0.0;

    network.zero_gradients();

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        losses.epoch.reset();
        order.shuffle(rng);
        run_one_epoch(network, x, y, &order, batch_size, config.mode, &optimizer, &mut losses)?;

        if config.mode == GradientDescent::FullBatch {
            optimizer.step_network(network, losses.epoch.samples())?;
        }
        last_loss = losses.epoch.mean();

        // ── Emit progress ─────────────────────────────────────────────────
        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss: last_loss,
            loss_per_output: losses.epoch.mean_per_output(),
            last_batch_loss: losses.batch.mean(),
            samples: losses.epoch.samples(),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last_loss)
}

/// Mean squared error over a whole set, without touching gradients.
pub fn evaluate_mse(network: &mut Network, x: MatrixView<'_>, y: MatrixView<'_>) -> Result<f64> {
    network.check_dataset(x, y)?;
    let mut acc = SquaredErrorAccumulator::new(network.output_size())?;
    for s in 0..x.rows() {
        let prediction = network.predict(x.row_view(s)?)?;
        acc.accumulate(&prediction, y.row(s))?;
    }
    Ok(acc.mean())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Squared-error sums for the current sample, batch and epoch.
struct LossScopes {
    step: SquaredErrorAccumulator,
    batch: SquaredErrorAccumulator,
    epoch: SquaredErrorAccumulator,
}

impl LossScopes {
    fn new(outputs: usize) -> Result<LossScopes> {
        Ok(LossScopes {
            step: SquaredErrorAccumulator::new(outputs)?,
            batch: SquaredErrorAccumulator::new(outputs)?,
            epoch: SquaredErrorAccumulator::new(outputs)?,
        })
    }
}

/// Runs every full batch of `order`, applying per-sample or per-batch
/// updates as the mode requires. Full-batch updates are left to the caller.
#[allow(clippy::too_many_arguments)]
fn run_one_epoch(
    network: &mut Network,
    x: MatrixView<'_>,
    y: MatrixView<'_>,
    order: &[usize],
    batch_size: usize,
    mode: GradientDescent,
    optimizer: &Sgd,
    losses: &mut LossScopes,
) -> Result<()> {
    for batch in order.chunks_exact(batch_size) {
        losses.batch.reset();

        for &idx in batch {
            sample_step(network, x, y, idx, losses)?;
            if mode == GradientDescent::Stochastic {
                optimizer.step_network(network, 1)?;
            }
        }

        if mode == GradientDescent::MiniBatch {
            optimizer.step_network(network, batch_size)?;
        }
    }
    Ok(())
}

/// Forward pass, loss bookkeeping and gradient accumulation for one sample.
fn sample_step(
    network: &mut Network,
    x: MatrixView<'_>,
    y: MatrixView<'_>,
    idx: usize,
    losses: &mut LossScopes,
) -> Result<()> {
    let target = y.row_view(idx)?;

    network.set_input(x.row_view(idx)?)?;
    network.forward()?;

    losses.step.reset();
    losses.step.accumulate(network.output().row(0), target.row(0))?;
    losses.batch.merge(&losses.step)?;
    losses.epoch.merge(&losses.step)?;

    network.backward(target)
}
