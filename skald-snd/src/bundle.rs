//! Bounded stream access to resources embedded in a media bundle.
//!
//! Media resources are packed back-to-back inside one bundle file. Rather
//! than copy each resource out, a [`BundleStream`] gives a decoder a bounded
//! view of the bundle: seeks are relative to the resource and reads can
//! never cross its end, so a decoder bug or a malformed resource length
//! cannot reach a neighboring resource or run past end of file.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use symphonia::core::io::MediaSource;
use tracing::debug;

/// Byte source a bundle window can be constructed over.
///
/// Blanket-implemented for anything readable and seekable that can move to
/// the audio thread. Production code hands in `std::fs::File`.
pub trait BundleSource: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> BundleSource for T {}

/// Bounded view over one media resource embedded in a bundle.
///
/// Construction captures the source's current position as the resource
/// start. The window owns the source from then on; dropping the window (or
/// the decoder that took it over) closes the source.
pub struct BundleStream {
    source: Box<dyn BundleSource>,
    start: u64,
    end: u64,
}

impl BundleStream {
    /// Create a window over the next `length` bytes of `source`.
    ///
    /// The source must already be positioned at the first byte of the
    /// resource. Fails with the platform error if the current position
    /// cannot be determined.
    pub fn over<S: BundleSource + 'static>(mut source: S, length: u64) -> io::Result<Self> {
        let start = source.stream_position().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("could not obtain bundle stream position: {}", e),
            )
        })?;
        let end = start.checked_add(length).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "resource length overflows")
        })?;
        debug!(start, length, "opened bundle window");
        Ok(Self {
            source: Box::new(source),
            start,
            end,
        })
    }

    /// Resource length in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True for a zero-length resource.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Read up to `count` whole elements of `element_size` bytes into `buf`.
    ///
    /// The element count is clamped so the read never crosses the end of
    /// the resource; a request clamped to zero reads nothing and returns
    /// zero. Returns the number of whole elements read.
    pub fn read_elements(
        &mut self,
        buf: &mut [u8],
        element_size: usize,
        count: usize,
    ) -> io::Result<usize> {
        if element_size == 0 || count == 0 {
            return Ok(0);
        }
        let position = self.source.stream_position()?;
        self.check_window_start(position)?;
        let remaining = self.end.saturating_sub(position);

        let mut count = count.min(buf.len() / element_size);
        let fit = (remaining / element_size as u64).min(usize::MAX as u64) as usize;
        count = count.min(fit);
        if count == 0 {
            return Ok(0);
        }

        let want = count * element_size;
        let filled = self.fill(buf, want)?;
        Ok(filled / element_size)
    }

    /// Read as much of `buf[..want]` as the source yields.
    fn fill(&mut self, buf: &mut [u8], want: usize) -> io::Result<usize> {
        let mut filled = 0;
        while filled < want {
            match self.source.read(&mut buf[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            // The request did not cross the window end, so the transport
            // itself failed to produce anything.
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "could not read from bundle stream",
            ));
        }
        Ok(filled)
    }

    fn check_window_start(&self, position: u64) -> io::Result<()> {
        if position < self.start {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "stream position is before the start of the resource",
            ));
        }
        Ok(())
    }
}

impl Read for BundleStream {
    /// Reads never cross the end of the resource: the requested byte count
    /// is clamped to what remains in the window, and an exhausted window
    /// reads as end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.source.stream_position()?;
        self.check_window_start(position)?;
        let remaining = self.end.saturating_sub(position);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        self.fill(buf, want)
    }
}

impl Seek for BundleStream {
    /// Seeks are relative to the resource: `Start` resolves against the
    /// resource's first byte, `End` against its last. `Current` applies the
    /// offset to the raw position without re-clamping; the subsequent read
    /// clamps. Returns the new position relative to the resource start.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let raw = match pos {
            SeekFrom::Start(offset) => {
                let target = self.start.checked_add(offset).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflows")
                })?;
                self.source.seek(SeekFrom::Start(target))?
            }
            SeekFrom::End(offset) => {
                let target = self.end as i128 + offset as i128;
                if target < self.start as i128 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "seek resolved before the start of the resource",
                    ));
                }
                self.source.seek(SeekFrom::Start(target as u64))?
            }
            SeekFrom::Current(offset) => self.source.seek(SeekFrom::Current(offset))?,
        };
        raw.checked_sub(self.start).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek resolved before the start of the resource",
            )
        })
    }
}

impl Write for BundleStream {
    /// Always fails: bundle-backed resources are read-only.
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "bundle-backed resources cannot be written",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MediaSource for BundleStream {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.len())
    }
}

impl fmt::Debug for BundleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleStream")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}
