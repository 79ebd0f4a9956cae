//! Configuration module for the telnet-greeter server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::protocol::{Charset, DEFAULT_MAX_FRAME_SIZE};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments for the telnet server
#[derive(Parser, Debug, Default)]
#[command(name = "telnet-greeter")]
#[command(author = "telnet-greeter authors")]
#[command(version = "0.1.0")]
#[command(about = "A line-oriented telnet greeting server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:8023)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum number of concurrently served connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Maximum length of a single command line in bytes
    #[arg(short = 'f', long)]
    pub max_frame_size: Option<usize>,

    /// Character encoding used on the wire (utf-8, us-ascii, iso-8859-1)
    #[arg(long)]
    pub charset: Option<String>,

    /// Seconds to wait for open sessions to close on shutdown
    #[arg(long)]
    pub shutdown_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of worker threads
    pub workers: Option<usize>,
    /// Maximum number of concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Grace period for open sessions on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: None,
            max_connections: default_max_connections(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Line protocol configuration
#[derive(Debug, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum command line length in bytes, terminator excluded
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Wire character encoding
    #[serde(default = "default_charset")]
    pub charset: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_frame_size: default_max_frame_size(),
            charset: default_charset(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8023".to_string()
}

fn default_max_connections() -> usize {
    10_000
}

fn default_shutdown_timeout() -> u64 {
    5
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub workers: Option<usize>,
    pub max_connections: usize,
    pub max_frame_size: usize,
    pub charset: Charset,
    pub shutdown_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve configuration from already parsed CLI arguments.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence) and validate.
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let charset_name = cli.charset.unwrap_or(toml_config.protocol.charset);
        let charset = charset_name
            .parse::<Charset>()
            .map_err(|_| ConfigError::Invalid {
                field: "charset",
                reason: format!("unsupported encoding '{charset_name}'"),
            })?;

        let max_frame_size = cli
            .max_frame_size
            .unwrap_or(toml_config.protocol.max_frame_size);
        if max_frame_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frame_size",
                reason: "must be greater than zero".to_string(),
            });
        }

        let workers = cli.workers.or(toml_config.server.workers);
        if workers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_connections = cli
            .max_connections
            .unwrap_or(toml_config.server.max_connections);
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            workers,
            max_connections,
            max_frame_size,
            charset,
            shutdown_timeout: Duration::from_secs(
                cli.shutdown_timeout
                    .unwrap_or(toml_config.server.shutdown_timeout),
            ),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }

    /// Number of runtime worker threads, defaulting to the available parallelism.
    pub fn worker_threads(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:8023");
        assert_eq!(config.server.max_connections, 10_000);
        assert_eq!(config.protocol.max_frame_size, 8192);
        assert_eq!(config.protocol.charset, "utf-8");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:2323"
            workers = 4
            shutdown_timeout = 10

            [protocol]
            max_frame_size = 1024
            charset = "latin1"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:2323");
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.server.shutdown_timeout, 10);
        assert_eq!(config.protocol.max_frame_size, 1024);
        assert_eq!(config.protocol.charset, "latin1");
        assert_eq!(config.logging.level, "debug");

        let resolved = Config::merge(CliArgs::default(), config).unwrap();
        assert_eq!(resolved.charset, Charset::Latin1);
        assert_eq!(resolved.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(resolved.worker_threads(), 4);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:2323"

            [protocol]
            max_frame_size = 1024
        "#,
        )
        .unwrap();

        let cli = CliArgs {
            listen: Some("127.0.0.1:9999".to_string()),
            max_frame_size: Some(64),
            log_level: Some("trace".to_string()),
            ..CliArgs::default()
        };

        let config = Config::merge(cli, toml_config).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9999");
        assert_eq!(config.max_frame_size, 64);
        assert_eq!(config.charset, Charset::Utf8);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cli = CliArgs {
            charset: Some("ebcdic".to_string()),
            ..CliArgs::default()
        };
        let err = Config::merge(cli, TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "charset", .. }));

        let cli = CliArgs {
            max_frame_size: Some(0),
            ..CliArgs::default()
        };
        let err = Config::merge(cli, TomlConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_frame_size",
                ..
            }
        ));

        let cli = CliArgs {
            workers: Some(0),
            ..CliArgs::default()
        };
        assert!(Config::merge(cli, TomlConfig::default()).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config: Some(PathBuf::from("/nonexistent/telnet-greeter.toml")),
            ..CliArgs::default()
        };
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
        assert!(err.to_string().contains("/nonexistent/telnet-greeter.toml"));
    }
}
