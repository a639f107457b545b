//! A stream restricted to one byte range of an underlying stream

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Read/seek/write view over `[start, start + len)` of an inner stream.
///
/// Positions are relative to `start`. Seeks past the end clamp to the end,
/// reads and writes are truncated at the range boundary.
#[derive(Debug)]
pub struct BoundedStream<R> {
    inner: R,
    start: u64,
    len: u64,
    position: u64,
}

impl<R> BoundedStream<R> {
    /// Create a bounded view starting at `start` spanning `len` bytes
    pub fn new(inner: R, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            position: 0,
        }
    }

    /// Length of the range
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the range is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute offset of the range inside the inner stream
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Release the view and return the inner stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn remaining(&self) -> u64 {
        self.len - self.position
    }
}

impl<R: Read + Seek> Read for BoundedStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let wanted = (buf.len() as u64).min(self.remaining()) as usize;
        if wanted == 0 {
            return Ok(0);
        }

        self.inner.seek(SeekFrom::Start(self.start + self.position))?;
        let read = self.inner.read(&mut buf[..wanted])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl<R: Seek> Seek for BoundedStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.len) + i128::from(delta),
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of bounded stream",
            ));
        }

        self.position = (target as u64).min(self.len);
        Ok(self.position)
    }
}

impl<W: Write + Seek> Write for BoundedStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let wanted = (buf.len() as u64).min(self.remaining()) as usize;
        if wanted == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write past end of bounded stream",
            ));
        }

        self.inner.seek(SeekFrom::Start(self.start + self.position))?;
        let written = self.inner.write(&buf[..wanted])?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
