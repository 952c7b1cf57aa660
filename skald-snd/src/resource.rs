//! Resource typing.
//!
//! The engine asserts every resource's type from its own metadata and the
//! resolver maps that tag to a decoder format. Nothing is ever sniffed from
//! content: embedded resources frequently carry nonstandard headers that
//! defeat format detection, so an unknown tag is an error rather than a
//! guess.

use skald_common::{Error, Result};

/// Resource kind tags asserted by the story engine's metadata.
///
/// The bundle carries more than audio; picture and video kinds reach the
/// resolver when a story misuses a resource, and they resolve to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Jpeg,
    Midi,
    Xm,
    S3m,
    Mod,
    Mp3,
    Wav,
    Avi,
}

/// Decoder format tags understood by the playback sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Midi,
    /// Tracker module (XM, S3M or MOD)
    Module,
    Mp3,
    Wav,
}

impl ResourceKind {
    /// Map the asserted kind to its decoder format.
    ///
    /// Total over the audio kinds; anything else fails with an unrecognized
    /// resource type error and no playback side effects.
    pub fn decoder_format(self) -> Result<MediaFormat> {
        match self {
            ResourceKind::Midi => Ok(MediaFormat::Midi),
            ResourceKind::Xm | ResourceKind::S3m | ResourceKind::Mod => Ok(MediaFormat::Module),
            ResourceKind::Mp3 => Ok(MediaFormat::Mp3),
            ResourceKind::Wav => Ok(MediaFormat::Wav),
            other => Err(Error::UnknownResourceType(other.name().to_string())),
        }
    }

    /// Canonical lower-case name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Jpeg => "jpeg",
            ResourceKind::Midi => "midi",
            ResourceKind::Xm => "xm",
            ResourceKind::S3m => "s3m",
            ResourceKind::Mod => "mod",
            ResourceKind::Mp3 => "mp3",
            ResourceKind::Wav => "wav",
            ResourceKind::Avi => "avi",
        }
    }

    /// Parse a kind from its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" => Some(ResourceKind::Jpeg),
            "midi" => Some(ResourceKind::Midi),
            "xm" => Some(ResourceKind::Xm),
            "s3m" => Some(ResourceKind::S3m),
            "mod" => Some(ResourceKind::Mod),
            "mp3" => Some(ResourceKind::Mp3),
            "wav" => Some(ResourceKind::Wav),
            "avi" => Some(ResourceKind::Avi),
            _ => None,
        }
    }
}
