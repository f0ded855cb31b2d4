use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::parser::{FrameParser, Outcome};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads frames from any `Read` stream.
///
/// I/O happens in chunks, but the parser still sees one byte at a time, so a
/// frame split across reads is reassembled and garbage between frames is
/// skipped.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    parser: FrameParser,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            parser: FrameParser::new(),
        }
    }

    /// Read until the parser completes or rejects a frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn next_outcome(&mut self) -> Result<Outcome> {
        loop {
            while self.buf.has_remaining() {
                let outcome = self.parser.accept(self.buf.get_u8());
                if outcome.is_final() {
                    return Ok(outcome);
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next valid payload, skipping rejected frames (blocking).
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            match self.next_outcome()? {
                Outcome::Complete(payload) => return Ok(payload),
                Outcome::Rejected(reason) => {
                    debug!(%reason, "skipping rejected frame");
                }
                Outcome::Waiting => {}
            }
        }
    }

    /// Borrow the parser (state and counters).
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
