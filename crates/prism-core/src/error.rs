//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arithmetic overflow in a size or offset computation
    #[error("too many {0}")]
    Arithmetic(&'static str),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// GPU error
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Platform error
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
