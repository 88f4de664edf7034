//! Common error types for the SMIL player workspace

use thiserror::Error;

/// Common result type for SMIL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the engine and the player binary
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be deserialized
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
