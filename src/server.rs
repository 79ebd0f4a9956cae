//! TCP acceptor for telnet sessions.
//!
//! Owns the listening socket, admits connections up to the configured limit
//! and runs one [`Session`] task per connection. Sessions share nothing but
//! the immutable [`Protocol`].

use crate::config::Config;
use crate::host::local_hostname;
use crate::protocol::Protocol;
use crate::session::{Session, SessionSummary};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Listen backlog passed to `listen(2)`.
const LISTEN_BACKLOG: i32 = 1024;

/// What happened to the sessions that were open when the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Sessions that closed on their own within the grace period.
    pub drained: usize,
    /// Sessions aborted when the grace period ran out.
    pub aborted: usize,
}

/// Server instance
pub struct Server {
    config: Config,
    protocol: Arc<Protocol>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let protocol = Protocol::new(config.charset, config.max_frame_size, local_hostname());
        Self::with_protocol(config, protocol)
    }

    pub fn with_protocol(config: Config, protocol: Protocol) -> Self {
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));
        Server {
            config,
            protocol: Arc::new(protocol),
            connection_limit,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<ShutdownReport, Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        let addr: SocketAddr = self.config.listen.parse()?;
        let listener = bind_listener(addr)?;
        info!(address = %addr, "Server listening");

        Ok(self.serve(listener, shutdown).await)
    }

    /// Accept connections from `listener` until `shutdown` resolves, then
    /// give open sessions up to the configured timeout to close.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions: JoinSet<SessionSummary> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(finished) = sessions.join_next() => log_session_exit(finished),
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let permit = match Arc::clone(&self.connection_limit).try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(peer = %peer, "Connection limit reached, rejecting");
                            continue;
                        }
                    };

                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
                    }
                    debug!(peer = %peer, available = self.available_slots(), "New connection");

                    let session = Session::new(stream, Arc::clone(&self.protocol), peer.to_string());
                    let stop = stop_rx.clone();
                    sessions.spawn(async move {
                        let summary = session.run(stop).await;
                        drop(permit);
                        summary
                    });
                }
            }
        }

        drop(listener);
        self.drain(sessions, stop_tx).await
    }

    async fn drain(
        &self,
        mut sessions: JoinSet<SessionSummary>,
        stop_tx: watch::Sender<bool>,
    ) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        if sessions.is_empty() {
            return report;
        }

        info!(open = sessions.len(), "Waiting for sessions to close");
        let _ = stop_tx.send(true);

        let wait_all = async {
            while let Some(finished) = sessions.join_next().await {
                log_session_exit(finished);
                report.drained += 1;
            }
        };

        if tokio::time::timeout(self.config.shutdown_timeout, wait_all)
            .await
            .is_err()
        {
            report.aborted = sessions.len();
            warn!(
                remaining = report.aborted,
                "Shutdown timeout elapsed, aborting sessions"
            );
            sessions.shutdown().await;
        }

        report
    }

    /// Number of connections that can still be admitted.
    pub fn available_slots(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

fn log_session_exit(finished: Result<SessionSummary, JoinError>) {
    match finished {
        Ok(summary) => debug!(
            peer = %summary.peer,
            commands = summary.commands,
            reason = %summary.reason,
            "Session finished"
        ),
        Err(e) if e.is_panic() => error!(error = %e, "Session panicked"),
        Err(e) => debug!(error = %e, "Session cancelled"),
    }
}

/// Create a non-blocking TCP listener with SO_REUSEADDR.
fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    TcpListener::from_std(socket.into())
}
