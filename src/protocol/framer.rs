//! Line framing over a raw byte stream.
//!
//! Bytes arrive in arbitrary chunks. The framer accumulates them and hands
//! out one frame per line terminator. Both `\r\n` and a bare `\n` end a
//! line; the terminator is stripped from the frame. A lone `\r` is data.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Default upper bound on a single line, terminator excluded.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8192;

/// A single line extracted from the stream, terminator removed.
pub type Frame = Bytes;

/// Framing failure. Fatal for the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// No terminator within `max` bytes.
    #[error("frame exceeds maximum length of {max} bytes (got {len})")]
    Oversized { len: usize, max: usize },
}

/// Per-connection line framer.
///
/// Owns the pending input of exactly one connection. Between calls to
/// [`LineFramer::push`] the unterminated remainder never exceeds
/// `max_frame_size` bytes (plus a trailing `\r` waiting for its `\n`).
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    max_frame_size: usize,
    /// Bytes at the front of `buffer` already known to hold no `\n`.
    scanned: usize,
}

impl LineFramer {
    /// Create a framer with the given line length bound.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_frame_size.min(16 * 1024)),
            max_frame_size,
            scanned: 0,
        }
    }

    /// Append a chunk and extract every complete frame it finishes.
    ///
    /// Frames completed before an oversized line are still returned ahead of
    /// the error so the caller can answer them before closing.
    pub fn push(&mut self, chunk: &[u8]) -> (Vec<Frame>, Option<FrameError>) {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return (frames, None),
                Err(e) => return (frames, Some(e)),
            }
        }
    }

    /// Pop the next complete frame from the buffered input.
    ///
    /// `Ok(None)` means more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let newline = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|pos| self.scanned + pos);

        match newline {
            Some(pos) => {
                let content_len = if pos > 0 && self.buffer[pos - 1] == b'\r' {
                    pos - 1
                } else {
                    pos
                };

                if content_len > self.max_frame_size {
                    self.discard();
                    return Err(FrameError::Oversized {
                        len: content_len,
                        max: self.max_frame_size,
                    });
                }

                let frame = self.buffer.split_to(content_len).freeze();
                self.buffer.advance(pos + 1 - content_len);
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                self.scanned = self.buffer.len();
                let pending = if self.buffer.last() == Some(&b'\r') {
                    self.buffer.len() - 1
                } else {
                    self.buffer.len()
                };

                if pending > self.max_frame_size {
                    self.discard();
                    return Err(FrameError::Oversized {
                        len: pending,
                        max: self.max_frame_size,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn discard(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}
