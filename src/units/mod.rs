pub mod dimension;
pub mod quantity;
pub mod registry;

pub use dimension::{Dimension, Exponent};
pub use quantity::UnitValue;
pub use registry::Unit;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnitError {
    #[error("Cannot parse '{text}': {reason}")]
    Format { text: String, reason: String },

    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Expected a value of dimension {expected}, found {found}")]
    Dimension {
        expected: Dimension,
        found: Dimension,
    },

    #[error("Offset unit '{0}' cannot take part in unit arithmetic")]
    OffsetUnit(String),

    #[error("Dimension exponent out of range in {0}")]
    ExponentOverflow(String),
}
