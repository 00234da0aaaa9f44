//! FILENAME: engine/src/error.rs

use parser::{EvalError, ParseError};
use thiserror::Error;

/// Errors surfaced by spreadsheet operations.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Circular reference through cell {0}")]
    CircularReference(String),

    #[error("{0}")]
    Eval(#[from] EvalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpreadsheetError {
    /// Returns true if this error is a circular-reference rejection.
    pub fn is_circular_reference(&self) -> bool {
        matches!(self, SpreadsheetError::CircularReference(_))
    }
}
