//! Error types for the skald crates.
//!
//! A single error enum covers every failure domain, so a failure can cross
//! the engine boundary as one pass/fail plus diagnostic text.

use thiserror::Error;

/// Main error type for the sound backend.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors, carrying the platform diagnostic
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource kind not known to the resolver
    #[error("Unrecognized resource type: {0}")]
    UnknownResourceType(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Convenience Result type using the shared Error
pub type Result<T> = std::result::Result<T, Error>;
