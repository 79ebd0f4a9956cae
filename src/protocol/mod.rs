//! Line protocol rules.
//!
//! The pipeline for every incoming chunk runs in a fixed order:
//!
//! ```text
//! bytes -> LineFramer -> Charset::decode -> Command -> dispatch -> Response -> Charset::encode -> bytes
//! ```
//!
//! Framing state lives in each session's [`LineFramer`]. Everything else here
//! is stateless and shared between connections through a single [`Protocol`].

pub mod codec;
pub mod command;
pub mod framer;

pub use codec::{Charset, DecodeError, EncodeError};
pub use command::{Command, Response};
pub use framer::{Frame, FrameError, LineFramer, DEFAULT_MAX_FRAME_SIZE};

use bytes::Bytes;
use chrono::{DateTime, Local};

/// Immutable protocol settings shared by all sessions.
#[derive(Debug, Clone)]
pub struct Protocol {
    charset: Charset,
    max_frame_size: usize,
    host: String,
}

impl Protocol {
    pub fn new(charset: Charset, max_frame_size: usize, host: impl Into<String>) -> Self {
        Self {
            charset,
            max_frame_size,
            host: host.into(),
        }
    }

    /// A framer for a newly accepted connection.
    pub fn framer(&self) -> LineFramer {
        LineFramer::new(self.max_frame_size)
    }

    /// Greeting: host identity line followed by the current time line.
    ///
    /// The time reads like `Mon Oct 05 09:05:07 +00:00 2026`; the zone is
    /// printed as a UTC offset since `Local` carries no abbreviation.
    pub fn greeting(&self, now: DateTime<Local>) -> Response {
        let now = now.format("%a %b %d %H:%M:%S %Z %Y").to_string();
        Response::greeting(&self.host, &now)
    }

    /// Decode a frame and classify it.
    pub fn decode(&self, frame: &[u8]) -> Result<Command, DecodeError> {
        self.charset.decode(frame).map(Command::parse)
    }

    pub fn dispatch(&self, command: &Command) -> Response {
        match command {
            Command::Empty => Response::prompt(),
            Command::Exit => Response::farewell(),
            Command::Text(text) => Response::echo(text),
        }
    }

    pub fn encode(&self, response: &Response) -> Result<Bytes, EncodeError> {
        self.charset.encode(&response.text)
    }
}
