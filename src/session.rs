//! Per-connection session state machine.
//!
//! ```text
//! CONNECTING --greeting--> ACTIVE --bye / error / eof / shutdown--> CLOSING --shutdown()--> CLOSED
//!                           |  ^
//!                           +--+ one response per command
//! ```
//!
//! A session owns its transport, its framer and its output buffer. The only
//! thing it shares with other sessions is the immutable [`Protocol`].
//!
//! Decode, framing, dispatch and transport errors are turned into a close in
//! [`Session::run`]. A panic is not caught here: the acceptor runs each
//! session as its own `JoinSet` task and logs the resulting `JoinError`.

use crate::error::{CloseReason, SessionError};
use crate::protocol::{Frame, LineFramer, Protocol};
use bytes::BytesMut;
use chrono::Local;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Size of a single read from the transport.
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, greeting not yet sent.
    Connecting,
    /// Serving commands.
    Active,
    /// No more commands accepted; pending output is being flushed.
    Closing,
    Closed,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub peer: String,
    pub commands: u64,
    pub reason: CloseReason,
}

/// One client connection.
pub struct Session<S> {
    stream: S,
    protocol: Arc<Protocol>,
    framer: LineFramer,
    state: SessionState,
    peer: String,
    /// Encoded responses not yet handed to the transport.
    output: BytesMut,
    commands: u64,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, protocol: Arc<Protocol>, peer: impl Into<String>) -> Self {
        let framer = protocol.framer();
        Self {
            stream,
            protocol,
            framer,
            state: SessionState::Connecting,
            peer: peer.into(),
            output: BytesMut::new(),
            commands: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the connection from greeting to close.
    ///
    /// Never returns an error: every failure is logged here and turned into
    /// a close of this connection only.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SessionSummary {
        let reason = match self.serve(&mut shutdown).await {
            Ok(reason) => reason,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "Closing connection after error");
                e.close_reason()
            }
        };

        self.state = SessionState::Closing;
        if reason.can_flush() {
            if let Err(e) = self.close().await {
                debug!(peer = %self.peer, error = %e, "Failed to close connection cleanly");
            }
        }
        self.state = SessionState::Closed;

        debug!(
            peer = %self.peer,
            state = ?self.state(),
            commands = self.commands,
            reason = %reason,
            "Connection closed"
        );

        SessionSummary {
            peer: self.peer,
            commands: self.commands,
            reason,
        }
    }

    async fn serve(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<CloseReason, SessionError> {
        self.greet().await?;

        let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
        loop {
            chunk.clear();
            let n = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => return Ok(CloseReason::Shutdown),
                read = self.stream.read_buf(&mut chunk) => read?,
            };

            if n == 0 {
                if self.framer.pending() > 0 {
                    trace!(peer = %self.peer, pending = self.framer.pending(), "Dropping unterminated line");
                }
                return Ok(CloseReason::PeerClosed);
            }

            let (frames, frame_error) = self.framer.push(&chunk);
            for frame in &frames {
                if self.handle_frame(frame)? {
                    return Ok(CloseReason::Exit);
                }
            }
            if let Some(e) = frame_error {
                return Err(e.into());
            }

            self.flush().await?;
        }
    }

    /// CONNECTING -> ACTIVE. Both greeting lines go out in one write.
    async fn greet(&mut self) -> Result<(), SessionError> {
        let greeting = self.protocol.greeting(Local::now());
        let bytes = self.protocol.encode(&greeting)?;
        self.output.extend_from_slice(&bytes);
        self.flush().await?;

        self.state = SessionState::Active;
        Ok(())
    }

    /// Decode, dispatch and encode one frame into the output buffer.
    ///
    /// Returns `true` when the response asks for the connection to close.
    fn handle_frame(&mut self, frame: &Frame) -> Result<bool, SessionError> {
        let command = self.protocol.decode(frame)?;
        trace!(peer = %self.peer, ?command, "Processing command");
        self.commands += 1;

        let response = self.protocol.dispatch(&command);
        let bytes = self.protocol.encode(&response)?;
        self.output.extend_from_slice(&bytes);

        Ok(response.close)
    }

    /// Hand all pending output to the transport and wait for it to be written.
    async fn flush(&mut self) -> std::io::Result<()> {
        if !self.output.is_empty() {
            self.stream.write_all(&self.output).await?;
            self.output.clear();
        }
        self.stream.flush().await
    }

    /// CLOSING: the transport is shut down only after pending output is written.
    async fn close(&mut self) -> std::io::Result<()> {
        self.flush().await?;
        self.stream.shutdown().await
    }
}

/// Resolves once shutdown is signalled or the signalling side is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|&stop| stop).await;
}
