//! Two-voice software mixer.
//!
//! One strip per playback channel. The output callback pulls interleaved
//! stereo frames; each strip advances through its decoded samples with
//! linear-interpolation rate conversion and applies the channel gain.

use std::sync::{Arc, Mutex};

use skald_common::Channel;

use crate::decode::DecodedAudio;
use crate::sink::Voice;

/// Strip state for one channel.
struct Strip {
    audio: Option<Arc<DecodedAudio>>,
    /// Fractional frame cursor into the decoded samples.
    cursor: f64,
    looped: bool,
    playing: bool,
    gain: f32,
    /// Monotonic id of the installed voice; stale handles compare against
    /// it so they never touch a successor's strip.
    generation: u64,
}

impl Strip {
    fn new() -> Self {
        Self {
            audio: None,
            cursor: 0.0,
            looped: false,
            playing: false,
            gain: 1.0,
            generation: 0,
        }
    }

    /// Mix up to `out.len() / 2` frames into `out`, advancing by `step`
    /// source frames per output frame.
    fn mix(&mut self, out: &mut [f32], step: f64) {
        let audio = match (&self.audio, self.playing) {
            (Some(audio), true) => Arc::clone(audio),
            _ => return,
        };
        let frames = audio.frames();
        if frames == 0 {
            self.playing = false;
            return;
        }

        for frame in out.chunks_exact_mut(2) {
            if self.cursor >= frames as f64 {
                if self.looped {
                    self.cursor %= frames as f64;
                } else {
                    self.playing = false;
                    break;
                }
            }
            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            let next = if index + 1 < frames {
                index + 1
            } else if self.looped {
                0
            } else {
                index
            };
            let left = lerp(audio.samples[index * 2], audio.samples[next * 2], frac);
            let right = lerp(
                audio.samples[index * 2 + 1],
                audio.samples[next * 2 + 1],
                frac,
            );
            frame[0] += left * self.gain;
            frame[1] += right * self.gain;
            self.cursor += step;
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

struct MixerState {
    music: Strip,
    sample: Strip,
    next_generation: u64,
}

impl MixerState {
    fn strip(&self, channel: Channel) -> &Strip {
        match channel {
            Channel::Music => &self.music,
            Channel::Sample => &self.sample,
        }
    }

    fn strip_mut(&mut self, channel: Channel) -> &mut Strip {
        match channel {
            Channel::Music => &mut self.music,
            Channel::Sample => &mut self.sample,
        }
    }
}

/// Shared mixer front. Cloning shares the same strips; one clone lives in
/// the output callback, one in the sink.
#[derive(Clone)]
pub struct Mixer {
    state: Arc<Mutex<MixerState>>,
    output_rate: u32,
}

impl Mixer {
    pub fn new(output_rate: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MixerState {
                music: Strip::new(),
                sample: Strip::new(),
                next_generation: 1,
            })),
            output_rate,
        }
    }

    /// Silence the channel. The strip's data stays until its voice handle
    /// is dropped.
    pub fn halt(&self, channel: Channel) {
        self.state.lock().unwrap().strip_mut(channel).playing = false;
    }

    /// Install decoded audio on the channel and start it playing.
    pub fn start(&self, channel: Channel, audio: DecodedAudio, looped: bool) -> MixerVoice {
        let mut state = self.state.lock().unwrap();
        let generation = state.next_generation;
        state.next_generation += 1;

        let strip = state.strip_mut(channel);
        strip.audio = Some(Arc::new(audio));
        strip.cursor = 0.0;
        strip.looped = looped;
        strip.playing = true;
        strip.generation = generation;

        MixerVoice {
            state: Arc::clone(&self.state),
            channel,
            generation,
        }
    }

    /// Set the channel gain (0.0 to 1.0). Persists across voices.
    pub fn set_gain(&self, channel: Channel, gain: f32) {
        self.state.lock().unwrap().strip_mut(channel).gain = gain.clamp(0.0, 1.0);
    }

    /// Fill an interleaved stereo buffer at the output rate.
    ///
    /// Called from the audio callback; locks briefly and writes silence for
    /// empty strips.
    pub fn fill(&self, out: &mut [f32]) {
        out.fill(0.0);
        let mut state = self.state.lock().unwrap();
        for channel in [Channel::Music, Channel::Sample] {
            let output_rate = self.output_rate as f64;
            let strip = state.strip_mut(channel);
            let step = match &strip.audio {
                Some(audio) => audio.sample_rate as f64 / output_rate,
                None => continue,
            };
            strip.mix(out, step);
        }
    }
}

/// Voice handle for one installed strip.
pub struct MixerVoice {
    state: Arc<Mutex<MixerState>>,
    channel: Channel,
    generation: u64,
}

impl Voice for MixerVoice {
    fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        let strip = state.strip(self.channel);
        strip.generation == self.generation && strip.playing
    }
}

impl Drop for MixerVoice {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        let strip = state.strip_mut(self.channel);
        if strip.generation == self.generation {
            strip.audio = None;
            strip.playing = false;
        }
    }
}
