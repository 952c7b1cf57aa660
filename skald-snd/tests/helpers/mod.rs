//! Counting test doubles for the sink seam and for bundle sources.
#![allow(dead_code)]

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use skald_snd::bundle::BundleStream;
use skald_snd::resource::MediaFormat;
use skald_snd::sink::{Sink, Voice};
use skald_snd::{Channel, Error, Result};

/// One recorded sink interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Halt(Channel),
    Release(Channel),
    Load(Channel, MediaFormat, bool),
    SetVolume(Channel, u8),
}

/// Shared record of everything a [`CountingSink`] saw.
#[derive(Default)]
pub struct SinkLog {
    ops: Mutex<Vec<Op>>,
    live_voices: AtomicUsize,
    max_live_voices: AtomicUsize,
    fail_load: AtomicBool,
    last_playing: Mutex<Option<Arc<AtomicBool>>>,
}

impl SinkLog {
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn live_voices(&self) -> usize {
        self.live_voices.load(Ordering::SeqCst)
    }

    pub fn max_live_voices(&self) -> usize {
        self.max_live_voices.load(Ordering::SeqCst)
    }

    /// Make subsequent loads fail with a decode error.
    pub fn fail_next_loads(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Playing flag of the most recently loaded voice; clearing it
    /// simulates a natural end of playback.
    pub fn last_playing_flag(&self) -> Arc<AtomicBool> {
        self.last_playing
            .lock()
            .unwrap()
            .clone()
            .expect("no voice has been loaded")
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

/// Sink double that records interactions and counts live voices.
pub struct CountingSink {
    log: Arc<SinkLog>,
}

impl CountingSink {
    pub fn new() -> (Self, Arc<SinkLog>) {
        let log = Arc::new(SinkLog::default());
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl Sink for CountingSink {
    fn halt(&mut self, channel: Channel) {
        self.log.record(Op::Halt(channel));
    }

    fn load(
        &mut self,
        channel: Channel,
        stream: BundleStream,
        format: MediaFormat,
        looped: bool,
    ) -> Result<Box<dyn Voice>> {
        // The stream was moved in; dropping it here closes the source the
        // way a real decoder teardown would.
        drop(stream);
        if self.log.fail_load.load(Ordering::SeqCst) {
            return Err(Error::Decode("injected decode failure".to_string()));
        }
        self.log.record(Op::Load(channel, format, looped));

        let live = self.log.live_voices.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live_voices.fetch_max(live, Ordering::SeqCst);

        let playing = Arc::new(AtomicBool::new(true));
        *self.log.last_playing.lock().unwrap() = Some(Arc::clone(&playing));

        Ok(Box::new(CountingVoice {
            channel,
            playing,
            log: Arc::clone(&self.log),
        }))
    }

    fn set_device_volume(&mut self, channel: Channel, device_volume: u8) {
        self.log.record(Op::SetVolume(channel, device_volume));
    }
}

struct CountingVoice {
    channel: Channel,
    playing: Arc<AtomicBool>,
    log: Arc<SinkLog>,
}

impl Voice for CountingVoice {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Drop for CountingVoice {
    fn drop(&mut self) {
        self.log.live_voices.fetch_sub(1, Ordering::SeqCst);
        self.log.record(Op::Release(self.channel));
    }
}

/// In-memory bundle source that counts closes (drops) and seeks.
pub struct TrackedSource {
    inner: Cursor<Vec<u8>>,
    closes: Arc<AtomicUsize>,
    seeks: Arc<AtomicUsize>,
}

impl TrackedSource {
    pub fn new(data: Vec<u8>, closes: Arc<AtomicUsize>, seeks: Arc<AtomicUsize>) -> Self {
        Self {
            inner: Cursor::new(data),
            closes,
            seeks,
        }
    }
}

impl Read for TrackedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for TrackedSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        self.inner.seek(pos)
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plain in-memory bundle source.
pub fn memory_source(len: usize) -> Cursor<Vec<u8>> {
    Cursor::new(vec![0u8; len])
}
