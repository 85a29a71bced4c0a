//! Buffered byte source and sink adapters.
//!
//! Codecs never touch `io::Read`/`io::Write` directly; they go through
//! [`ByteReader`] and [`ByteWriter`], which provide the peek/discard and
//! buffered-append operations the wire formats are built on. Both keep
//! their allocation across `reset` so a reader or writer can be reused for
//! many payloads.

use std::io;
use std::io::{Read as _, Write as _};

use bytes::BytesMut;

use crate::error::{Error, Result};

/// Default buffer capacity for readers and writers.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

fn unexpected_eof() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "unexpected end of stream",
    ))
}

/// A buffered reader over a boxed byte stream.
///
/// The window exposed by [`peek`](ByteReader::peek) and consumed by
/// [`next`](ByteReader::next) is bounded by [`capacity`](ByteReader::capacity);
/// larger values are read in chunks by the free helpers below.
pub struct ByteReader {
    src: Box<dyn io::Read>,
    buf: Box<[u8]>,
    pos: usize,
    end: usize,
}

impl ByteReader {
    pub fn new(src: Box<dyn io::Read>) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, src)
    }

    pub fn with_capacity(capacity: usize, src: Box<dyn io::Read>) -> Self {
        Self {
            src,
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            end: 0,
        }
    }

    /// The size of the internal buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes currently buffered.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.end - self.pos
    }

    /// Returns up to `n` bytes without consuming them, filling the buffer
    /// from the source as needed. The window is capped at the buffer
    /// capacity; a shorter slice means the source is exhausted.
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        let n = n.min(self.buf.len());
        while self.end - self.pos < n {
            if self.end == self.buf.len() {
                self.buf.copy_within(self.pos..self.end, 0);
                self.end -= self.pos;
                self.pos = 0;
            }
            match self.src.read(&mut self.buf[self.end..]) {
                Ok(0) => break,
                Ok(read) => self.end += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let avail = (self.end - self.pos).min(n);
        Ok(&self.buf[self.pos..self.pos + avail])
    }

    /// Consumes `n` bytes, reading past the buffer if necessary.
    pub fn discard(&mut self, mut n: usize) -> Result<()> {
        loop {
            let avail = self.end - self.pos;
            if avail >= n {
                self.pos += n;
                return Ok(());
            }
            n -= avail;
            self.pos = 0;
            self.end = 0;
            match self.src.read(&mut self.buf) {
                Ok(0) => return Err(unexpected_eof()),
                Ok(read) => self.end = read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Like [`peek`](ByteReader::peek), but advances the reader. A short
    /// read surfaces as `ErrorKind::UnexpectedEof` after consuming whatever
    /// was delivered.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `n` does not exceed the buffer capacity.
    pub fn next(&mut self, n: usize) -> Result<&[u8]> {
        debug_assert!(n <= self.buf.len());
        let avail = self.peek(n)?.len();
        if avail < n {
            self.pos += avail;
            return Err(unexpected_eof());
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    /// [`next`](ByteReader::next) into a fixed-size array.
    #[inline]
    pub fn next_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.next(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos < self.end {
            let b = self.buf[self.pos];
            self.pos += 1;
            return Ok(b);
        }
        Ok(self.next_array::<1>()?[0])
    }

    /// Fills `out` exactly, bypassing the buffer for the unbuffered tail.
    pub fn read_full(&mut self, out: &mut [u8]) -> Result<()> {
        let buffered = (self.end - self.pos).min(out.len());
        out[..buffered].copy_from_slice(&self.buf[self.pos..self.pos + buffered]);
        self.pos += buffered;
        if buffered < out.len() {
            self.src
                .read_exact(&mut out[buffered..])
                .map_err(Error::from)?;
        }
        Ok(())
    }

    /// Reuses the reader against a fresh source, keeping the allocation.
    pub fn reset(&mut self, src: Box<dyn io::Read>) {
        self.src = src;
        self.pos = 0;
        self.end = 0;
    }
}

/// Reads the next `n` bytes and returns them as a string.
///
/// Fast path: a single peek-and-discard when the buffer capacity covers
/// `n`. Otherwise the bytes are accumulated in capacity-sized chunks.
///
/// # Errors
///
/// `ErrorKind::UnexpectedEof` on a short read; `ErrorKind::InvalidData`
/// when the bytes are not valid UTF-8.
pub fn read_string(b: &mut ByteReader, n: usize) -> Result<String> {
    let mut buf = Vec::new();
    read_bytes(b, n, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Reads the next `n` bytes and appends them to `buf`.
pub fn read_bytes(b: &mut ByteReader, n: usize, buf: &mut Vec<u8>) -> Result<()> {
    if b.capacity() >= n {
        buf.extend_from_slice(b.next(n)?);
        return Ok(());
    }
    buf.reserve(n);
    let mut left = n;
    while left > 0 {
        let take = left.min(b.capacity());
        buf.extend_from_slice(b.next(take)?);
        left -= take;
    }
    Ok(())
}

/// A buffered writer over a boxed byte sink.
///
/// Bytes accumulate in an internal buffer up to a soft capacity; oversized
/// writes bypass the buffer after draining it, so a single `write_all`
/// never splits its payload.
pub struct ByteWriter {
    sink: Box<dyn io::Write>,
    buf: BytesMut,
    cap: usize,
}

impl ByteWriter {
    pub fn new(sink: Box<dyn io::Write>) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, sink)
    }

    pub fn with_capacity(cap: usize, sink: Box<dyn io::Write>) -> Self {
        Self {
            sink,
            buf: BytesMut::with_capacity(cap),
            cap: cap.max(1),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        if self.buf.len() >= self.cap {
            self.flush_buf()?;
        }
        self.buf.extend_from_slice(&[v]);
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.buf.len() + data.len() > self.cap {
            self.flush_buf()?;
            if data.len() >= self.cap {
                return self.sink.write_all(data).map_err(Error::from);
            }
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Ensures `max` spare bytes then lets `f` append directly into the
    /// buffer. This is the zero-copy path used for small variable-length
    /// encodings such as Compact headers.
    pub fn append_with(&mut self, max: usize, f: impl FnOnce(&mut BytesMut)) -> Result<()> {
        if self.buf.len() + max > self.cap {
            self.flush_buf()?;
        }
        f(&mut self.buf);
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.sink.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Drains the buffer to the sink and flushes the sink itself.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buf()?;
        self.sink.flush().map_err(Error::from)
    }

    /// Reuses the writer against a fresh sink, keeping the allocation.
    pub fn reset(&mut self, sink: Box<dyn io::Write>) {
        self.sink = sink;
        self.buf.clear();
    }
}
