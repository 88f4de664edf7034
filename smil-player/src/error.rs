//! Error types for smil-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Engine operations never fail on malformed timing input (they log and fall
//! back); errors are reserved for I/O, XML syntax and misuse of the public API.

use thiserror::Error;

/// Main error type for smil-player
#[derive(Error, Debug)]
pub enum Error {
    /// XML tokenizer or serializer errors
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from smil-common
    #[error(transparent)]
    Common(#[from] smil_common::Error),

    /// Unknown element id or stale node handle
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result type using smil-player Error
pub type Result<T> = std::result::Result<T, Error>;
