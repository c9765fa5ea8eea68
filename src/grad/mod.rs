pub mod finite_diff;

pub use finite_diff::{dataset_cost, Gradients};
