//! Settings supplied by the external settings collaborator.
//!
//! The sound backend persists nothing itself; it consumes the values the
//! frontend stores. Resolution follows the usual priority order: explicit
//! path, environment variable, user config directory, compiled defaults.

use crate::events::Channel;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "SKALD_CONFIG";

/// Frontend settings consumed by the audio engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Music channel enabled
    pub enable_music: bool,
    /// Sound effect channel enabled
    pub enable_sound_effects: bool,
    /// Global volume attenuation, 0 to 100
    pub volume: u8,
    /// Output device name (None = system default)
    pub device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_music: true,
            enable_sound_effects: true,
            volume: 100,
            device: None,
        }
    }
}

impl Settings {
    /// Load settings from the resolved config file, or defaults when no
    /// file exists.
    ///
    /// Resolution order: `explicit` path, then `SKALD_CONFIG`, then
    /// `<config dir>/skald/config.toml`. An explicitly named file that
    /// cannot be read or parsed is an error; an absent default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// True when the given playback channel is enabled.
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Music => self.enable_music,
            Channel::Sample => self.enable_sound_effects,
        }
    }

    fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("skald").join("config.toml"))
            .filter(|path| path.exists())
    }
}
