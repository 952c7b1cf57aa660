//! Playback slots and volume state.
//!
//! A slot is the single holder of "the currently active resource" for one
//! channel. Slots are plain owned objects injected into the engine; the
//! at-most-one-voice invariant is enforced by the replace protocol, not by
//! process-wide statics.

use skald_common::{volume, Channel, Result};
use tracing::debug;

use crate::bundle::{BundleSource, BundleStream};
use crate::resource::ResourceKind;
use crate::sink::{Sink, Voice};

/// Outcome of a play request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The resource is playing.
    Started,
    /// The channel is disabled by settings; the request was declined
    /// without touching slot state and without a diagnostic.
    Declined,
}

/// Holder of the at-most-one active voice for one channel.
pub struct PlaybackSlot {
    channel: Channel,
    voice: Option<Box<dyn Voice>>,
}

impl PlaybackSlot {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            voice: None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// True while the slot holds a voice, playing or already finished.
    pub fn is_active(&self) -> bool {
        self.voice.is_some()
    }

    /// True while the slot's voice is audible or looping.
    pub fn is_playing(&self) -> bool {
        self.voice.as_ref().map_or(false, |voice| voice.is_playing())
    }

    /// Replace the active voice with a freshly opened resource.
    ///
    /// Strictly ordered: halt the channel (idempotent), release the
    /// previous voice, open a window over the resource, resolve its type,
    /// apply the device volume and hand the window to the sink. On any
    /// failure the slot ends up idle with nothing retained.
    pub fn replace(
        &mut self,
        sink: &mut impl Sink,
        source: impl BundleSource + 'static,
        length: u64,
        kind: ResourceKind,
        looped: bool,
        device_volume: u8,
    ) -> Result<()> {
        sink.halt(self.channel);
        // The previous voice must be gone before anything new is built; a
        // slot never holds two live voices, even transiently.
        self.voice = None;

        let stream = BundleStream::over(source, length)?;
        let format = kind.decoder_format()?;

        sink.set_device_volume(self.channel, device_volume);
        let voice = sink.load(self.channel, stream, format, looped)?;
        self.voice = Some(voice);
        debug!(channel = ?self.channel, ?kind, looped, "voice installed");
        Ok(())
    }

    /// Halt the channel and release whatever the slot holds. Safe when
    /// idle.
    pub fn stop(&mut self, sink: &mut impl Sink) -> bool {
        sink.halt(self.channel);
        self.release()
    }

    /// Release the voice without touching the sink. Returns true when a
    /// voice was held.
    pub fn release(&mut self) -> bool {
        self.voice.take().is_some()
    }
}

/// Per-channel logical volumes, the global attenuation and the mute flag.
///
/// Muting only changes what the device hears; the logical values survive
/// and are reapplied verbatim on unmute.
#[derive(Debug, Clone)]
pub struct VolumeState {
    music: u8,
    sample: u8,
    attenuation: u8,
    muted: bool,
}

impl VolumeState {
    pub fn new(attenuation: u8) -> Self {
        Self {
            music: volume::LOGICAL_VOLUME_MAX,
            sample: volume::LOGICAL_VOLUME_MAX,
            attenuation: attenuation.min(volume::LOGICAL_VOLUME_MAX),
            muted: false,
        }
    }

    pub fn logical(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Music => self.music,
            Channel::Sample => self.sample,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Device volume the current state yields for a channel.
    pub fn device_volume(&self, channel: Channel) -> u8 {
        if self.muted {
            0
        } else {
            volume::device_volume(self.logical(channel), self.attenuation)
        }
    }

    /// Clamp and store a logical volume, then push the device volume.
    pub fn set_logical(&mut self, sink: &mut impl Sink, channel: Channel, volume: i32) {
        let clamped = volume::clamp_logical(volume);
        match channel {
            Channel::Music => self.music = clamped,
            Channel::Sample => self.sample = clamped,
        }
        self.apply_channel(sink, channel);
    }

    /// Change the global attenuation and reapply for unmuted channels.
    pub fn set_attenuation(&mut self, sink: &mut impl Sink, attenuation: i32) {
        self.attenuation = volume::clamp_logical(attenuation);
        self.apply(sink);
    }

    /// Mute or unmute. Unmuting reapplies the device volumes that follow
    /// from the stored logical state.
    pub fn set_muted(&mut self, sink: &mut impl Sink, muted: bool) {
        if muted == self.muted {
            return;
        }
        self.muted = muted;
        if muted {
            sink.set_device_volume(Channel::Music, 0);
            sink.set_device_volume(Channel::Sample, 0);
        } else {
            self.apply(sink);
        }
    }

    /// Push the device volume for one channel, unless muted.
    pub fn apply_channel(&self, sink: &mut impl Sink, channel: Channel) {
        if !self.muted {
            sink.set_device_volume(
                channel,
                volume::device_volume(self.logical(channel), self.attenuation),
            );
        }
    }

    /// Push the device volumes for both channels, unless muted.
    pub fn apply(&self, sink: &mut impl Sink) {
        self.apply_channel(sink, Channel::Music);
        self.apply_channel(sink, Channel::Sample);
    }
}
