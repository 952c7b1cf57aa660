//! The sink seam between the playback slots and the audio device.
//!
//! [`Sink::load`] is the ownership hand-off point: the bundle window moves
//! into the sink, and from there into decoder construction, and is never
//! touched by the slot again. The production [`CpalSink`] decodes through
//! symphonia and mixes into a cpal stream; tests substitute counting
//! doubles for the whole seam.

use skald_common::{volume, Channel, Result};
use tracing::debug;

use crate::bundle::BundleStream;
use crate::decode;
use crate::mixer::Mixer;
use crate::output::AudioOutput;
use crate::resource::MediaFormat;

/// Handle to one playing (or finished) voice.
///
/// Dropping the handle releases the voice and everything the decoder
/// allocated for it.
pub trait Voice {
    /// True while the voice is audible or looping.
    fn is_playing(&self) -> bool;
}

/// Audio device seam used by the playback slots.
pub trait Sink {
    /// Silence the channel. Idempotent; halting a channel with no voice is
    /// a no-op.
    fn halt(&mut self, channel: Channel);

    /// Decode `stream` as `format` and start it on `channel`.
    ///
    /// Takes ownership of the stream. On success the returned voice is
    /// already playing, looping indefinitely when `looped`; on failure
    /// nothing is retained.
    fn load(
        &mut self,
        channel: Channel,
        stream: BundleStream,
        format: MediaFormat,
        looped: bool,
    ) -> Result<Box<dyn Voice>>;

    /// Apply a device-range volume (0 to 128) to the channel.
    fn set_device_volume(&mut self, channel: Channel, device_volume: u8);
}

/// Production sink: symphonia decode, software mixer, cpal output.
pub struct CpalSink {
    mixer: Mixer,
    _output: AudioOutput,
}

impl CpalSink {
    /// Open the output device (system default when `None`) and start the
    /// stream. Must be called on the thread that will own the sink.
    pub fn open(device: Option<&str>) -> Result<Self> {
        let mut output = AudioOutput::open(device)?;
        let mixer = Mixer::new(output.sample_rate());
        let shared = mixer.clone();
        output.start(move |buf| shared.fill(buf))?;
        Ok(Self {
            mixer,
            _output: output,
        })
    }
}

impl Sink for CpalSink {
    fn halt(&mut self, channel: Channel) {
        self.mixer.halt(channel);
    }

    fn load(
        &mut self,
        channel: Channel,
        stream: BundleStream,
        format: MediaFormat,
        looped: bool,
    ) -> Result<Box<dyn Voice>> {
        let audio = decode::decode_resource(stream, format)?;
        debug!(?channel, ?format, frames = audio.frames(), looped, "starting voice");
        Ok(Box::new(self.mixer.start(channel, audio, looped)))
    }

    fn set_device_volume(&mut self, channel: Channel, device_volume: u8) {
        self.mixer.set_gain(channel, volume::device_gain(device_volume));
    }
}
