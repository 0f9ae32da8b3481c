//! Write adapter that drops a fixed number of leading bytes.

use std::io::{self, Write};

/// Forwards writes to an inner sink after silently consuming the first
/// `skip` bytes of the logical stream.
///
/// Swallowed bytes are still reported as written, so callers using
/// `write_all` or an encoder's internal loop see every byte accepted.
/// Behavior is independent of how the stream is chunked.
#[derive(Debug)]
pub struct SkipWriter<W> {
    inner: W,
    remaining: usize,
}

impl<W: Write> SkipWriter<W> {
    pub fn new(inner: W, skip: usize) -> Self {
        Self {
            inner,
            remaining: skip,
        }
    }

    /// Unwrap the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for SkipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return self.inner.write(buf);
        }

        if buf.len() < self.remaining {
            self.remaining -= buf.len();
            return Ok(buf.len());
        }

        // The skip counter is only committed once the inner write succeeds,
        // so a failed write leaves the adapter in a retryable state.
        let forwarded = self.inner.write(&buf[self.remaining..])?;
        let skipped = self.remaining;
        self.remaining = 0;
        Ok(skipped + forwarded)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
