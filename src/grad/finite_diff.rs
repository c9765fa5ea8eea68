//! Gradient snapshots and a finite-difference estimator for checking them.
//!
//! Both estimators differentiate [`dataset_cost`], the mean over samples of
//! `½ Σ (a - y)²`. Its gradient is exactly the mean of what backprop
//! accumulates, so the two are directly comparable.

use crate::error::{NnError, Result};
use crate::math::matrix::{Matrix, MatrixView};
use crate::network::network::Network;

/// Mean over samples of half the summed squared error.
pub fn dataset_cost(network: &mut Network, x: MatrixView<'_>, y: MatrixView<'_>) -> Result<f64> {
    network.check_dataset(x, y)?;
    let mut total = 0.0;
    for s in 0..x.rows() {
        network.set_input(x.row_view(s)?)?;
        network.forward()?;
        total += network
            .output()
            .row(0)
            .iter()
            .zip(y.row(s))
            .map(|(a, t)| 0.5 * (a - t).powi(2))
            .sum::<f64>();
    }
    Ok(total / x.rows() as f64)
}

/// Per-layer weight and bias gradients, shaped like the network's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub weights: Vec<Matrix>,
    pub biases: Vec<Matrix>,
}

impl Gradients {
    /// Copies the network's gradient accumulators, divided by the `n`
    /// samples they cover.
    pub fn from_accumulators(network: &Network, n: usize) -> Result<Gradients> {
        if n == 0 {
            return Err(NnError::config("gradient average needs at least one sample"));
        }
        let inv = 1.0 / n as f64;
        let scaled = |m: &Matrix| {
            let mut m = m.clone();
            m.scale(inv);
            m
        };
        Ok(Gradients {
            weights: network.layers().iter().map(|l| scaled(&l.weight_grads)).collect(),
            biases: network.layers().iter().map(|l| scaled(&l.bias_grads)).collect(),
        })
    }

    /// Mean backprop gradient over every sample. Leaves the network's
    /// accumulators zeroed.
    pub fn backprop(network: &mut Network, x: MatrixView<'_>, y: MatrixView<'_>) -> Result<Gradients> {
        network.check_dataset(x, y)?;
        network.zero_gradients();
        for s in 0..x.rows() {
            network.set_input(x.row_view(s)?)?;
            network.forward()?;
            network.backward(y.row_view(s)?)?;
        }
        let grads = Gradients::from_accumulators(network, x.rows())?;
        network.zero_gradients();
        Ok(grads)
    }

    /// Forward-difference estimate `(cost(p + eps) - cost(p)) / eps` for
    /// every weight and bias. Each parameter is restored after its probe.
    pub fn finite_difference(
        network: &mut Network,
        x: MatrixView<'_>,
        y: MatrixView<'_>,
        eps: f64,
    ) -> Result<Gradients> {
        if !(eps.is_finite() && eps != 0.0) {
            return Err(NnError::config(format!("finite-difference step must be finite and non-zero, got {eps}")));
        }
        let base = dataset_cost(network, x, y)?;
        let mut grads = Gradients::zeros_like(network)?;

        for l in 0..network.layers().len() {
            for k in 0..network.layers()[l].weights.as_slice().len() {
                let d = probe(network, x, y, base, eps, |n| &mut n.layers_mut()[l].weights.as_mut_slice()[k])?;
                grads.weights[l].as_mut_slice()[k] = d;
            }
            for k in 0..network.layers()[l].biases.as_slice().len() {
                let d = probe(network, x, y, base, eps, |n| &mut n.layers_mut()[l].biases.as_mut_slice()[k])?;
                grads.biases[l].as_mut_slice()[k] = d;
            }
        }

        Ok(grads)
    }

    fn zeros_like(network: &Network) -> Result<Gradients> {
        let layers = network.layers();
        Ok(Gradients {
            weights: layers
                .iter()
                .map(|l| Matrix::allocate(l.weights.rows(), l.weights.cols()))
                .collect::<Result<_>>()?,
            biases: layers
                .iter()
                .map(|l| Matrix::allocate(1, l.size()))
                .collect::<Result<_>>()?,
        })
    }

    /// Every gradient entry, layer by layer, weights before biases.
    pub fn flatten(&self) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .flat_map(|(w, b)| w.as_slice().iter().chain(b.as_slice()).copied())
            .collect()
    }

    /// Largest `|a - b| / max(1, |a|, |b|)` over all entries.
    pub fn max_relative_error(&self, other: &Gradients) -> Result<f64> {
        for (a, b) in self.weights.iter().chain(&self.biases).zip(other.weights.iter().chain(&other.biases)) {
            if a.shape() != b.shape() {
                return Err(NnError::shape("gradient comparison", a.shape(), b.shape()));
            }
        }
        if self.weights.len() != other.weights.len() || self.biases.len() != other.biases.len() {
            return Err(NnError::config("gradients come from networks with different depths"));
        }
        Ok(self
            .flatten()
            .iter()
            .zip(other.flatten())
            .map(|(a, b)| (a - b).abs() / 1f64.max(a.abs()).max(b.abs()))
            .fold(0.0, f64::max))
    }
}

/// Nudges one parameter by `eps`, re-measures the cost, then puts it back.
fn probe<F>(network: &mut Network, x: MatrixView<'_>, y: MatrixView<'_>, base: f64, eps: f64, param: F) -> Result<f64>
where
    F: Fn(&mut Network) -> &mut f64,
{
    let original = *param(network);
    *param(network) = original + eps;
    let cost = dataset_cost(network, x, y);
    *param(network) = original;
    Ok((cost? - base) / eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;

    /// Single identity unit y = w x + b on one sample: cost = ½ (w x + b - t)².
    #[test]
    fn linear_unit_gradients_are_exact() {
        let mut net = Network::new(&[1, 1], ActivationFunction::Identity, ActivationFunction::Identity).unwrap();
        net.layers_mut()[0].weights.set(0, 0, 2.0);
        net.layers_mut()[0].biases.set(0, 0, 1.0);
        let x = Matrix::from_data(vec![vec![3.0]]).unwrap();
        let y = Matrix::from_data(vec![vec![4.0]]).unwrap();

        // residual = 2*3 + 1 - 4 = 3; dw = 3 * 3, db = 3
        assert_eq!(dataset_cost(&mut net, x.view(), y.view()).unwrap(), 4.5);
        let analytic = Gradients::backprop(&mut net, x.view(), y.view()).unwrap();
        assert_eq!(analytic.flatten(), vec![9.0, 3.0]);

        let numeric = Gradients::finite_difference(&mut net, x.view(), y.view(), 1e-6).unwrap();
        assert!(analytic.max_relative_error(&numeric).unwrap() < 1e-4);
        assert_eq!(net.layers()[0].weights.get(0, 0), 2.0);
        assert_eq!(net.layers()[0].biases.get(0, 0), 1.0);
        assert!(net.layers()[0].weight_grads.as_slice().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn averaging_over_zero_samples_is_rejected() {
        let net = Network::new(&[2, 1], ActivationFunction::Sigmoid, ActivationFunction::Sigmoid).unwrap();
        assert!(matches!(Gradients::from_accumulators(&net, 0), Err(NnError::InvalidConfig(_))));
        assert_eq!(Gradients::from_accumulators(&net, 2).unwrap().flatten(), vec![0.0; 3]);
    }

    #[test]
    fn rejects_zero_step() {
        let mut net = Network::new(&[1, 1], ActivationFunction::Identity, ActivationFunction::Identity).unwrap();
        let x = Matrix::from_data(vec![vec![1.0]]).unwrap();
        assert!(matches!(
            Gradients::finite_difference(&mut net, x.view(), x.view(), 0.0),
            Err(NnError::InvalidConfig(_))
        ));
    }
}
