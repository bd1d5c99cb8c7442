//! Error types for distlru

use std::fmt;

/// Result type alias for distlru operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity must be at least one entry
    InvalidCapacity(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(cap) => {
                write!(f, "Invalid capacity: {} (must be greater than 0)", cap)
            }
        }
    }
}

impl std::error::Error for Error {}
