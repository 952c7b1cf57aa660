//! Resource decoding through symphonia.
//!
//! The format reader is instantiated from the resolved tag, never probed
//! from content. The whole resource is decoded up front into interleaved
//! stereo f32; embedded music and effects are short enough that streaming
//! decode buys nothing here.

use skald_common::{Error, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::sample::Sample;
use symphonia::default::formats::{MpaReader, WavReader};
use tracing::{debug, warn};

use crate::bundle::BundleStream;
use crate::resource::MediaFormat;

/// Decoded PCM audio, interleaved stereo at the source rate.
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Decode one embedded resource into PCM.
///
/// Takes ownership of the window; it is consumed (and the underlying bundle
/// handle closed) whether decoding succeeds or not.
pub fn decode_resource(stream: BundleStream, format: MediaFormat) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(stream), Default::default());
    let format_opts = FormatOptions::default();

    let mut reader: Box<dyn FormatReader> = match format {
        MediaFormat::Mp3 => Box::new(
            MpaReader::try_new(mss, &format_opts)
                .map_err(|e| Error::Decode(format!("failed to open MP3 resource: {}", e)))?,
        ),
        MediaFormat::Wav => Box::new(
            WavReader::try_new(mss, &format_opts)
                .map_err(|e| Error::Decode(format!("failed to open WAV resource: {}", e)))?,
        ),
        MediaFormat::Midi | MediaFormat::Module => {
            return Err(Error::Decode(format!(
                "no decoder available for {:?} resources",
                format
            )));
        }
    };

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio track in resource".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => push_interleaved(&decoded, &mut samples),
            Err(e) => {
                warn!("decode error: {}", e);
                continue;
            }
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode(
            "resource contained no decodable audio".to_string(),
        ));
    }

    debug!(
        frames = samples.len() / 2,
        sample_rate, "decoded embedded resource"
    );
    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Append a decoded buffer as interleaved stereo f32.
///
/// Mono is duplicated to both channels; sources with more than two
/// channels contribute their front pair.
fn push_interleaved(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => push_frames(buf, out, |s| s),
        AudioBufferRef::F64(buf) => push_frames(buf, out, |s| s as f32),
        AudioBufferRef::S32(buf) => push_frames(buf, out, |s| s as f32 / i32::MAX as f32),
        AudioBufferRef::S24(buf) => push_frames(buf, out, |s| s.inner() as f32 / 8_388_608.0),
        AudioBufferRef::S16(buf) => push_frames(buf, out, |s| s as f32 / i16::MAX as f32),
        AudioBufferRef::S8(buf) => push_frames(buf, out, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::U32(buf) => push_frames(buf, out, |s| (s as i32) as f32 / i32::MAX as f32),
        AudioBufferRef::U24(buf) => {
            push_frames(buf, out, |s| (s.inner() as i32 - 8_388_608) as f32 / 8_388_608.0)
        }
        AudioBufferRef::U16(buf) => {
            push_frames(buf, out, |s| (s as i32 - 32_768) as f32 / 32_768.0)
        }
        AudioBufferRef::U8(buf) => push_frames(buf, out, |s| (s as i32 - 128) as f32 / 128.0),
    }
}

fn push_frames<S: Sample + Copy>(
    buf: &AudioBuffer<S>,
    out: &mut Vec<f32>,
    to_f32: impl Fn(S) -> f32,
) {
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return;
    }
    for frame in 0..buf.frames() {
        let left = to_f32(buf.chan(0)[frame]);
        let right = if channels > 1 {
            to_f32(buf.chan(1)[frame])
        } else {
            left
        };
        out.push(left);
        out.push(right);
    }
}
