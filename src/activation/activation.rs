use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NnError;

/// Slope applied to non-positive inputs by `LeakyReLU`.
pub const LEAKY_SLOPE: f64 = 0.01;

/// Scalar nonlinearity applied element-wise to a layer's weighted sums.
///
/// A network picks one kind for every hidden layer and one for the output
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Identity,
    Sigmoid,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
}

impl ActivationFunction {
    pub fn activate(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::LeakyReLU => if x > 0.0 { x } else { LEAKY_SLOPE * x },
        }
    }

    /// Derivative evaluated at the pre-activation value `x` (not at `f(x)`).
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Sigmoid => {
                let fx = self.activate(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::LeakyReLU => if x > 0.0 { 1.0 } else { LEAKY_SLOPE },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Identity => "identity",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::LeakyReLU => "leaky_relu",
        }
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationFunction {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "linear" => Ok(ActivationFunction::Identity),
            "sigmoid" => Ok(ActivationFunction::Sigmoid),
            "leaky_relu" | "leakyrelu" => Ok(ActivationFunction::LeakyReLU),
            other => Err(NnError::config(format!("unknown activation function '{other}'"))),
        }
    }
}
