pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod grad;
pub mod data;
pub mod train;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::matrix::{Matrix, MatrixView, Shape};
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use network::spec::{NetworkParams, NetworkSpec};
pub use loss::mse::{MseLoss, SquaredErrorAccumulator};
pub use optim::sgd::Sgd;
pub use grad::finite_diff::{dataset_cost, Gradients};
pub use data::table::{LogicGate, TrainingTable};
pub use train::{evaluate_mse, train_epoch_finite_difference, train_loop};
pub use train::{EpochStats, GradientDescent, TrainConfig};
