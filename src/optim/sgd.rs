use crate::{
    error::{NnError, Result},
    layers::dense::Layer,
    network::network::Network,
};

/// Plain gradient descent: `w -= lr * (sum of gradients) / n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Result<Sgd> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(NnError::config(format!(
                "learning rate must be positive and finite, got {learning_rate}"
            )));
        }
        Ok(Sgd { learning_rate })
    }

    /// Applies one update to a layer from its accumulated gradients, which
    /// cover `n` samples, and resets them. Fails if `n` is zero.
    pub fn step(&self, layer: &mut Layer, n: usize) -> Result<()> {
        layer.apply_gradients(self.learning_rate, n)
    }

    /// [`Sgd::step`] for every layer of the network.
    pub fn step_network(&self, network: &mut Network, n: usize) -> Result<()> {
        if n == 0 {
            return Err(NnError::config("gradient update needs at least one sample"));
        }
        for layer in network.layers_mut() {
            self.step(layer, n)?;
        }
        Ok(())
    }
}
