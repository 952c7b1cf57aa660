//! # Skald Sound Backend
//!
//! Playback of media resources embedded in a story bundle file. Resources
//! are packed back-to-back inside one bundle; a [`BundleStream`] exposes a
//! single resource to a decoder as a bounded, seekable stream, and the
//! [`AudioEngine`] manages the one-active-voice-per-channel lifecycle,
//! volume curve mapping and mute semantics.
//!
//! The engine runs on a dedicated owner thread ([`AudioThread`]); the
//! cloneable [`AudioHandle`] marshals operations onto it from the story
//! engine's worker thread and from the user-facing control surface.

pub mod bundle;
pub mod decode;
pub mod engine;
pub mod mixer;
pub mod output;
pub mod playback;
pub mod resource;
pub mod sink;

pub use bundle::{BundleSource, BundleStream};
pub use engine::{AudioEngine, AudioHandle, AudioThread};
pub use playback::{Outcome, PlaybackSlot, VolumeState};
pub use resource::{MediaFormat, ResourceKind};
pub use sink::{CpalSink, Sink, Voice};

pub use skald_common::{Channel, Error, PlaybackEvent, Result, Settings};
