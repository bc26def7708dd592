//! Error types for order book snapshots.

use std::fmt;

use fastnum::UD64;

use crate::types::BookSide;

/// Error type for order book snapshot construction.
#[derive(Debug, Clone, PartialEq)]
pub enum BookError {
    /// Price level with zero price.
    InvalidPrice { side: BookSide, price: UD64 },

    /// Price level with zero size.
    InvalidSize {
        side: BookSide,
        price: UD64,
        size: UD64,
    },

    /// Book side placed on the wrong side of the snapshot.
    SideMismatch { expected: BookSide, actual: BookSide },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::InvalidPrice { side, price } => {
                write!(f, "{} level has invalid price: {}", side, price)
            }
            BookError::InvalidSize { side, price, size } => {
                write!(f, "{} level at {} has invalid size: {}", side, price, size)
            }
            BookError::SideMismatch { expected, actual } => {
                write!(f, "book side mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for BookError {}

/// Result type for order book operations.
pub type BookResult<T> = Result<T, BookError>;
