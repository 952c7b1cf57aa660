//! The audio engine and its owning thread.
//!
//! The engine is a plain synchronous object: every operation runs to
//! completion against the slot and volume state it owns. [`AudioThread`]
//! gives it a dedicated owner thread, and [`AudioHandle`] is the single
//! marshaling boundary: operations from other threads arrive as commands
//! over a channel and execute strictly serialized, in arrival order.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use skald_common::config::Settings;
use skald_common::{Channel, Error, PlaybackEvent, Result};
use tracing::{debug, info, warn};

use crate::bundle::BundleSource;
use crate::playback::{Outcome, PlaybackSlot, VolumeState};
use crate::resource::ResourceKind;
use crate::sink::Sink;

/// Interval between idle ticks on the owner thread; finished voices are
/// reaped between commands at this cadence.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// The synchronous engine core: one slot per channel plus volume state.
pub struct AudioEngine<S: Sink> {
    sink: S,
    music: PlaybackSlot,
    sample: PlaybackSlot,
    volume: VolumeState,
    settings: Settings,
    events: Option<Sender<PlaybackEvent>>,
}

impl<S: Sink> AudioEngine<S> {
    pub fn new(sink: S, settings: Settings) -> Self {
        let mut engine = Self {
            sink,
            music: PlaybackSlot::new(Channel::Music),
            sample: PlaybackSlot::new(Channel::Sample),
            volume: VolumeState::new(settings.volume),
            settings,
            events: None,
        };
        engine.volume.apply(&mut engine.sink);
        engine
    }

    /// Register a subscriber for playback lifecycle events.
    pub fn set_event_sender(&mut self, events: Sender<PlaybackEvent>) {
        self.events = Some(events);
    }

    /// Open a window over the resource the source is positioned at and
    /// play it on the channel, replacing whatever was active there.
    ///
    /// A channel disabled by settings declines the request: the source is
    /// dropped without being opened and slot state is untouched.
    pub fn play(
        &mut self,
        channel: Channel,
        source: impl BundleSource + 'static,
        length: u64,
        kind: ResourceKind,
        looped: bool,
    ) -> Result<Outcome> {
        if !self.settings.channel_enabled(channel) {
            debug!(?channel, "channel disabled, declining play request");
            return Ok(Outcome::Declined);
        }

        let device_volume = self.volume.device_volume(channel);
        let result = match channel {
            Channel::Music => {
                self.music
                    .replace(&mut self.sink, source, length, kind, looped, device_volume)
            }
            Channel::Sample => {
                self.sample
                    .replace(&mut self.sink, source, length, kind, looped, device_volume)
            }
        };

        match result {
            Ok(()) => {
                self.emit(PlaybackEvent::Started { channel, looped });
                Ok(Outcome::Started)
            }
            Err(e) => {
                warn!(?channel, error = %e, "play request failed");
                Err(e)
            }
        }
    }

    /// Stop the channel and release its voice. Safe when idle.
    pub fn stop(&mut self, channel: Channel) {
        let released = match channel {
            Channel::Music => self.music.stop(&mut self.sink),
            Channel::Sample => self.sample.stop(&mut self.sink),
        };
        if released {
            self.emit(PlaybackEvent::Stopped { channel });
        }
    }

    pub fn is_playing(&self, channel: Channel) -> bool {
        self.slot(channel).is_playing()
    }

    pub fn set_volume(&mut self, channel: Channel, volume: i32) {
        self.volume.set_logical(&mut self.sink, channel, volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.volume.set_muted(&mut self.sink, muted);
    }

    pub fn set_attenuation(&mut self, attenuation: i32) {
        self.volume.set_attenuation(&mut self.sink, attenuation);
    }

    pub fn volume_state(&self) -> &VolumeState {
        &self.volume
    }

    /// Release voices that reached their natural end and notify. Looping
    /// voices never finish on their own.
    pub fn reap_finished(&mut self) {
        for channel in [Channel::Music, Channel::Sample] {
            let finished = {
                let slot = self.slot(channel);
                slot.is_active() && !slot.is_playing()
            };
            if finished {
                match channel {
                    Channel::Music => self.music.release(),
                    Channel::Sample => self.sample.release(),
                };
                debug!(?channel, "voice finished");
                self.emit(PlaybackEvent::Finished { channel });
            }
        }
    }

    /// Stop both channels.
    pub fn shutdown(&mut self) {
        self.stop(Channel::Music);
        self.stop(Channel::Sample);
    }

    fn slot(&self, channel: Channel) -> &PlaybackSlot {
        match channel {
            Channel::Music => &self.music,
            Channel::Sample => &self.sample,
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

enum Command {
    Play {
        channel: Channel,
        source: Box<dyn BundleSource>,
        length: u64,
        kind: ResourceKind,
        looped: bool,
        reply: Sender<Result<Outcome>>,
    },
    Stop {
        channel: Channel,
        reply: Sender<()>,
    },
    IsPlaying {
        channel: Channel,
        reply: Sender<bool>,
    },
    SetVolume {
        channel: Channel,
        volume: i32,
    },
    SetMuted {
        muted: bool,
    },
    SetAttenuation {
        attenuation: i32,
    },
    Shutdown {
        reply: Sender<()>,
    },
}

/// Cloneable front handle. Every operation is marshaled to the owner
/// thread and executed there; nothing mutates slot or volume state from
/// the calling thread.
#[derive(Clone)]
pub struct AudioHandle {
    tx: Sender<Command>,
}

impl AudioHandle {
    pub fn play(
        &self,
        channel: Channel,
        source: impl BundleSource + 'static,
        length: u64,
        kind: ResourceKind,
        looped: bool,
    ) -> Result<Outcome> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(Command::Play {
                channel,
                source: Box::new(source),
                length,
                kind,
                looped,
                reply,
            })
            .map_err(|_| Error::Playback("audio thread is not running".to_string()))?;
        rx.recv()
            .map_err(|_| Error::Playback("audio thread dropped the request".to_string()))?
    }

    pub fn stop(&self, channel: Channel) {
        let (reply, rx) = mpsc::channel();
        if self.tx.send(Command::Stop { channel, reply }).is_ok() {
            let _ = rx.recv();
        }
    }

    pub fn is_playing(&self, channel: Channel) -> bool {
        let (reply, rx) = mpsc::channel();
        if self.tx.send(Command::IsPlaying { channel, reply }).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }

    pub fn set_volume(&self, channel: Channel, volume: i32) {
        let _ = self.tx.send(Command::SetVolume { channel, volume });
    }

    pub fn set_muted(&self, muted: bool) {
        let _ = self.tx.send(Command::SetMuted { muted });
    }

    pub fn set_attenuation(&self, attenuation: i32) {
        let _ = self.tx.send(Command::SetAttenuation { attenuation });
    }
}

/// Owner thread for the audio engine.
pub struct AudioThread {
    tx: Sender<Command>,
    join: Option<JoinHandle<()>>,
}

impl AudioThread {
    /// Spawn the owner thread. The sink is constructed on that thread
    /// (audio streams are generally not movable across threads); a sink
    /// construction failure is returned from here.
    pub fn spawn<S, F>(
        make_sink: F,
        settings: Settings,
        events: Option<Sender<PlaybackEvent>>,
    ) -> Result<Self>
    where
        S: Sink + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let join = thread::Builder::new()
            .name("skald-audio".to_string())
            .spawn(move || {
                let sink = match make_sink() {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let mut engine = AudioEngine::new(sink, settings);
                if let Some(events) = events {
                    engine.set_event_sender(events);
                }
                info!("audio thread running");
                Self::run(&mut engine, rx);
                info!("audio thread stopped");
            })
            .map_err(|e| Error::Playback(format!("failed to spawn audio thread: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| Error::Playback("audio thread exited during startup".to_string()))??;

        Ok(Self {
            tx,
            join: Some(join),
        })
    }

    /// Handle for issuing operations from any thread.
    pub fn handle(&self) -> AudioHandle {
        AudioHandle {
            tx: self.tx.clone(),
        }
    }

    /// Stop both channels and join the thread.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        if let Some(join) = self.join.take() {
            let (reply, rx) = mpsc::channel();
            if self.tx.send(Command::Shutdown { reply }).is_ok() {
                let _ = rx.recv();
            }
            let _ = join.join();
        }
    }

    fn run<S: Sink>(engine: &mut AudioEngine<S>, rx: Receiver<Command>) {
        loop {
            match rx.recv_timeout(IDLE_TICK) {
                Ok(Command::Play {
                    channel,
                    source,
                    length,
                    kind,
                    looped,
                    reply,
                }) => {
                    let _ = reply.send(engine.play(channel, source, length, kind, looped));
                }
                Ok(Command::Stop { channel, reply }) => {
                    engine.stop(channel);
                    let _ = reply.send(());
                }
                Ok(Command::IsPlaying { channel, reply }) => {
                    let _ = reply.send(engine.is_playing(channel));
                }
                Ok(Command::SetVolume { channel, volume }) => engine.set_volume(channel, volume),
                Ok(Command::SetMuted { muted }) => engine.set_muted(muted),
                Ok(Command::SetAttenuation { attenuation }) => {
                    engine.set_attenuation(attenuation)
                }
                Ok(Command::Shutdown { reply }) => {
                    engine.shutdown();
                    let _ = reply.send(());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => engine.reap_finished(),
                Err(RecvTimeoutError::Disconnected) => {
                    engine.shutdown();
                    break;
                }
            }
        }
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
