pub mod trainer;
pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;

pub use trainer::train_epoch_finite_difference;
pub use epoch_stats::EpochStats;
pub use train_config::{GradientDescent, TrainConfig};
pub use loop_fn::{evaluate_mse, train_loop};
