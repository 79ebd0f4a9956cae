//! telnet-greeter: a line-oriented telnet server
//!
//! Every client is greeted with the host name and the current time, gets
//! each command line quoted back, and is sent off with a farewell when it
//! types `bye`.
//!
//! Features:
//! - CR-LF or LF terminated input, CR-LF terminated output
//! - Bounded line length; oversized or undecodable input closes only that connection
//! - Configurable wire charset (UTF-8, US-ASCII, ISO-8859-1)
//! - Graceful shutdown on Ctrl-C / SIGTERM with a bounded grace period
//! - Configuration via CLI arguments or TOML file

mod config;
mod error;
mod host;
mod protocol;
mod server;
mod session;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let workers = config.worker_threads();
    info!(
        listen = %config.listen,
        workers,
        max_connections = config.max_connections,
        max_frame_size = config.max_frame_size,
        charset = %config.charset,
        "Starting telnet-greeter server"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .thread_name("telnet-worker")
        .enable_all()
        .build()?;

    let report = runtime.block_on(async {
        let server = Server::new(config);
        server.run(shutdown_signal()).await
    })?;

    info!(
        drained = report.drained,
        aborted = report.aborted,
        "Server stopped"
    );
    Ok(())
}

/// Wait for Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
