//! # Skald Common Library
//!
//! Shared code for the skald sound backend:
//! - Error types
//! - Settings loading
//! - Playback channel and event types
//! - Volume curve math

pub mod config;
pub mod error;
pub mod events;
pub mod volume;

pub use config::Settings;
pub use error::{Error, Result};
pub use events::{Channel, PlaybackEvent};
