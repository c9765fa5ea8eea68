use crate::math::matrix::Shape;

/// Every way a numeric operation in this crate can refuse to run.
///
/// All variants are precondition violations: they are reported before any
/// state is mutated and are never worth retrying.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NnError {
    #[error("shape mismatch in {op}: {left} vs {right}")]
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },

    #[error("could not allocate a {rows}x{cols} matrix")]
    Allocation { rows: usize, cols: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("row {row} out of range for a matrix with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("invalid view: {rows}x{cols} with stride {stride} over {len} elements")]
    InvalidView {
        rows: usize,
        cols: usize,
        stride: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, NnError>;

impl NnError {
    pub(crate) fn shape(op: &'static str, left: Shape, right: Shape) -> NnError {
        NnError::ShapeMismatch { op, left, right }
    }

    pub(crate) fn config(msg: impl Into<String>) -> NnError {
        NnError::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_names_both_shapes() {
        let err = NnError::shape("multiply", Shape::new(2, 3), Shape::new(2, 2));
        assert_eq!(err.to_string(), "shape mismatch in multiply: 2x3 vs 2x2");
    }

    #[test]
    fn config_error_carries_message() {
        let err = NnError::config("epochs must be at least 1");
        assert_eq!(err.to_string(), "invalid configuration: epochs must be at least 1");
    }
}
