use crate::error::{NnError, Result};
use crate::math::matrix::{Matrix, Shape};

pub struct MseLoss;

impl MseLoss {
    /// Per-output gradient of ½(predicted - expected)²: predicted - expected
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| a - b)
            .collect()
    }
}

/// Running sum of squared errors per output dimension over some scope
/// (one sample, one batch, one epoch).
#[derive(Debug, Clone)]
pub struct SquaredErrorAccumulator {
    sums: Matrix,
    samples: usize,
}

impl SquaredErrorAccumulator {
    pub fn new(outputs: usize) -> Result<SquaredErrorAccumulator> {
        Ok(SquaredErrorAccumulator {
            sums: Matrix::allocate(1, outputs)?,
            samples: 0,
        })
    }

    pub fn reset(&mut self) {
        self.sums.fill(0.0);
        self.samples = 0;
    }

    /// Adds `(p - y)²` for every output dimension of one sample.
    pub fn accumulate(&mut self, predicted: &[f64], expected: &[f64]) -> Result<()> {
        let width = self.sums.cols();
        if predicted.len() != width || expected.len() != width {
            return Err(NnError::shape(
                "loss",
                Shape::new(1, predicted.len()),
                Shape::new(1, expected.len()),
            ));
        }
        for ((s, p), y) in self.sums.as_mut_slice().iter_mut().zip(predicted).zip(expected) {
            *s += (p - y).powi(2);
        }
        self.samples += 1;
        Ok(())
    }

    /// Folds another accumulator of the same width into this one.
    pub fn merge(&mut self, other: &SquaredErrorAccumulator) -> Result<()> {
        self.sums.add_in_place(&other.sums)?;
        self.samples += other.samples;
        Ok(())
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn sums(&self) -> &[f64] {
        self.sums.as_slice()
    }

    /// Mean squared error of each output dimension over the accumulated samples.
    pub fn mean_per_output(&self) -> Vec<f64> {
        let n = self.samples.max(1) as f64;
        self.sums.as_slice().iter().map(|s| s / n).collect()
    }

    /// Mean squared error averaged over samples and output dimensions.
    pub fn mean(&self) -> f64 {
        let per_output = self.mean_per_output();
        if per_output.is_empty() {
            return 0.0;
        }
        per_output.iter().sum::<f64>() / per_output.len() as f64
    }
}
