use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NnError, Result};
use crate::math::matrix::MatrixView;

/// Flat training table where every row is `x_1 .. x_k, y_1 .. y_m`.
///
/// The inputs and targets are exposed as two strided views over the same
/// buffer, so no sample is copied to train on it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    data: Vec<f64>,
    x_cols: usize,
    y_cols: usize,
}

impl TrainingTable {
    pub fn from_flat(data: Vec<f64>, x_cols: usize, y_cols: usize) -> Result<TrainingTable> {
        if x_cols == 0 || y_cols == 0 {
            return Err(NnError::config("training table needs at least one input and one target column"));
        }
        let stride = x_cols + y_cols;
        if data.is_empty() || data.len() % stride != 0 {
            return Err(NnError::config(format!(
                "training table of {} values does not split into rows of {stride}",
                data.len()
            )));
        }
        Ok(TrainingTable { data, x_cols, y_cols })
    }

    /// Concatenates per-sample inputs and targets into one table.
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<TrainingTable> {
        if inputs.len() != targets.len() {
            return Err(NnError::config(format!(
                "{} input rows but {} target rows",
                inputs.len(),
                targets.len()
            )));
        }
        let x_cols = inputs.first().map_or(0, Vec::len);
        let y_cols = targets.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(inputs.len() * (x_cols + y_cols));
        for (i, (x, y)) in inputs.iter().zip(targets).enumerate() {
            if x.len() != x_cols || y.len() != y_cols {
                return Err(NnError::config(format!("row {i} has a different width")));
            }
            data.extend_from_slice(x);
            data.extend_from_slice(y);
        }
        TrainingTable::from_flat(data, x_cols, y_cols)
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stride(&self) -> usize {
        self.x_cols + self.y_cols
    }

    /// Inputs, one row per sample.
    pub fn x(&self) -> MatrixView<'_> {
        self.view(0, self.x_cols)
    }

    /// Targets, one row per sample.
    pub fn y(&self) -> MatrixView<'_> {
        self.view(self.x_cols, self.y_cols)
    }

    fn view(&self, offset: usize, cols: usize) -> MatrixView<'_> {
        // The constructor guarantees whole rows, so this cannot fail.
        MatrixView::new(&self.data[offset..], self.len(), cols, self.stride())
            .unwrap_or_else(|_| unreachable!("training table rows are validated on construction"))
    }
}

/// Two-input boolean functions used as training sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicGate {
    And,
    Or,
    Nand,
    Xor,
}

impl LogicGate {
    pub const ALL: [LogicGate; 4] = [LogicGate::And, LogicGate::Or, LogicGate::Nand, LogicGate::Xor];

    pub fn eval(&self, a: bool, b: bool) -> bool {
        match self {
            LogicGate::And => a && b,
            LogicGate::Or => a || b,
            LogicGate::Nand => !(a && b),
            LogicGate::Xor => a ^ b,
        }
    }

    /// Truth table with rows `[x1, x2, y]` in the order 00, 10, 01, 11.
    pub fn table(&self) -> TrainingTable {
        let mut data = Vec::with_capacity(12);
        for (a, b) in [(false, false), (true, false), (false, true), (true, true)] {
            data.extend([f64::from(u8::from(a)), f64::from(u8::from(b))]);
            data.push(f64::from(u8::from(self.eval(a, b))));
        }
        TrainingTable { data, x_cols: 2, y_cols: 1 }
    }
}

impl fmt::Display for LogicGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicGate::And => "AND",
            LogicGate::Or => "OR",
            LogicGate::Nand => "NAND",
            LogicGate::Xor => "XOR",
        };
        f.write_str(name)
    }
}
