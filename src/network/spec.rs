use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::network::network::Network;

/// Serializable description of a network architecture.
///
/// Fields:
/// - `layers`            — layer widths, input first and output last
/// - `hidden_activation` — applied by every layer between input and output
/// - `output_activation` — applied by the output layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<usize>,
    pub hidden_activation: ActivationFunction,
    pub output_activation: ActivationFunction,
}

impl NetworkSpec {
    pub fn new(
        layers: Vec<usize>,
        hidden_activation: ActivationFunction,
        output_activation: ActivationFunction,
    ) -> NetworkSpec {
        NetworkSpec { layers, hidden_activation, output_activation }
    }

    /// Allocates the described network with zeroed parameters.
    pub fn build(&self) -> Result<Network> {
        Network::new(&self.layers, self.hidden_activation, self.output_activation)
    }

    /// Allocates the network and draws its parameters from `[min, max]`.
    pub fn build_randomized<R: Rng + ?Sized>(&self, rng: &mut R, min: f64, max: f64) -> Result<Network> {
        let mut network = self.build()?;
        network.randomize_parameters(rng, min, max)?;
        Ok(network)
    }
}

/// Snapshot of a trained network's parameters in persisted-model order:
/// layer count and widths, then per-layer biases, then per-layer weights.
///
/// `biases[l]` and `weights[l]` belong to the layer `l + 1` (the input
/// layer has no parameters). `weights[l]` is stored row by row, one row per
/// unit of the previous layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub dims: Vec<usize>,
    pub hidden_activation: ActivationFunction,
    pub output_activation: ActivationFunction,
    pub biases: Vec<Vec<f64>>,
    pub weights: Vec<Vec<Vec<f64>>>,
}

impl NetworkParams {
    pub fn n_layers(&self) -> usize {
        self.dims.len()
    }

    /// Rebuilds a network with exactly these parameters.
    pub fn to_network(&self) -> Result<Network> {
        let mut network = Network::new(&self.dims, self.hidden_activation, self.output_activation)?;
        network.load_params(self)?;
        Ok(network)
    }
}
