//! Errors that end a single session.
//!
//! None of these ever reach the acceptor: the session maps each one to a
//! [`CloseReason`] and closes its own connection.

use crate::protocol::{DecodeError, EncodeError, FrameError};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Line longer than the configured maximum.
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// Line bytes are not valid text in the wire charset.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Response could not be composed for the wire.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] EncodeError),

    /// Reset, broken pipe or any other socket failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl SessionError {
    pub fn close_reason(&self) -> CloseReason {
        match self {
            SessionError::Frame(_) => CloseReason::Oversized,
            SessionError::Decode(_) => CloseReason::Decode,
            SessionError::Dispatch(_) => CloseReason::Dispatch,
            SessionError::Transport(_) => CloseReason::Transport,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent the exit keyword.
    Exit,
    /// Client closed its side of the stream.
    PeerClosed,
    Oversized,
    Decode,
    Dispatch,
    Transport,
    /// Server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Whether the transport can still take the pending output and a clean close.
    pub fn can_flush(&self) -> bool {
        !matches!(self, CloseReason::Transport)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Exit => "exit",
            CloseReason::PeerClosed => "peer closed",
            CloseReason::Oversized => "oversized frame",
            CloseReason::Decode => "decode error",
            CloseReason::Dispatch => "dispatch error",
            CloseReason::Transport => "transport error",
            CloseReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Charset;

    #[test]
    fn test_close_reason_mapping() {
        let e: SessionError = FrameError::Oversized { len: 9, max: 8 }.into();
        assert_eq!(e.close_reason(), CloseReason::Oversized);

        let e: SessionError = DecodeError {
            charset: Charset::Utf8,
            valid_up_to: 0,
        }
        .into();
        assert_eq!(e.close_reason(), CloseReason::Decode);

        let e: SessionError = std::io::Error::from(std::io::ErrorKind::ConnectionReset).into();
        assert_eq!(e.close_reason(), CloseReason::Transport);
        assert!(!e.close_reason().can_flush());
    }

    #[test]
    fn test_error_messages() {
        let e: SessionError = EncodeError {
            charset: Charset::Ascii,
            ch: '\u{e9}',
        }
        .into();
        assert_eq!(
            e.to_string(),
            "dispatch error: character '\u{e9}' cannot be encoded as US-ASCII"
        );
        assert_eq!(CloseReason::PeerClosed.to_string(), "peer closed");
    }
}
