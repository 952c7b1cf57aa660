//! Audio output using cpal.
//!
//! Opens the output device, picks a stereo configuration and runs the
//! stream with a caller-supplied fill callback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use skald_common::{Error, Result};
use tracing::{debug, info, warn};

/// Preferred output rate; used when the device supports it.
const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Audio device output. Holds the running stream; dropping it stops
/// playback.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// List available output device names.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();
        debug!("found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open the requested device, falling back to the default device when
    /// the requested one is missing.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("failed to enumerate devices: {}", e))
                })?;
                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(device) => {
                        info!("using audio device: {}", name);
                        device
                    }
                    None => {
                        warn!("audio device '{}' not found, falling back to default", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("no default output device".to_string()))?,
        };

        let (config, sample_format) = Self::best_config(&device)?;
        debug!(
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "audio output configuration"
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
        })
    }

    /// Output sample rate of the selected configuration.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Start the output stream. `fill` runs on the audio thread and must
    /// produce interleaved stereo f32 frames; keep it fast and non-blocking.
    pub fn start<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, F>(fill)?,
            SampleFormat::I16 => self.build_stream::<i16, F>(fill)?,
            SampleFormat::U16 => self.build_stream::<u16, F>(fill)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("failed to start stream: {}", e)))?;
        self.stream = Some(stream);
        info!("audio stream started");
        Ok(())
    }

    fn build_stream<T, F>(&self, mut fill: F) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let mut scratch: Vec<f32> = Vec::new();
        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    fill(&mut scratch);
                    for (out, sample) in data.iter_mut().zip(&scratch) {
                        *out = T::from_sample(*sample);
                    }
                },
                |err| warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))
    }

    /// Pick a stereo configuration, preferring 44.1kHz f32.
    fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("failed to get device configs: {}", e)))?;

        let preferred = supported.find(|config| {
            config.channels() == 2
                && config.sample_format() == SampleFormat::F32
                && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        });
        if let Some(config) = preferred {
            let sample_format = config.sample_format();
            let config = config
                .with_sample_rate(SampleRate(PREFERRED_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("failed to get default config: {}", e)))?;
        if default.channels() != 2 {
            return Err(Error::AudioOutput(format!(
                "no stereo output configuration (default has {} channels)",
                default.channels()
            )));
        }
        let sample_format = default.sample_format();
        Ok((default.config(), sample_format))
    }
}
