pub mod table;

pub use table::{LogicGate, TrainingTable};
