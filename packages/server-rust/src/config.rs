//! Command-line and environment configuration for the server binary.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::correlation::ForwardedPolicy;
use crate::network::NetworkConfig;
use crate::telemetry::{LogConfig, LogFormat};

/// Errors from turning parsed arguments into runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--forwarded trusted-proxies requires at least one --trusted-proxies address")]
    NoTrustedProxies,
    #[error("--request-timeout-secs must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Parser)]
#[command(name = "suivi-server", version, about = "Suivi back office HTTP server")]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve HTTP (the default when no command is given).
    Serve,
    /// Print an Argon2id hash of a secret, for seeding account files.
    ///
    /// Reads the secret from stdin when not given as an argument.
    HashSecret {
        secret: Option<String>,
    },
}

/// How `X-Forwarded-For` is treated, as selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ForwardedMode {
    #[default]
    TrustAll,
    TrustedProxies,
    Ignore,
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Bind address.
    #[arg(long, env = "SUIVI_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port (0 for OS-assigned).
    #[arg(long, env = "SUIVI_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log filter directive, overridden by `RUST_LOG`.
    #[arg(long, env = "SUIVI_LOG", default_value = "info")]
    pub log: String,

    #[arg(long, env = "SUIVI_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// JSON file with the accounts to serve.
    #[arg(long, env = "SUIVI_ACCOUNTS")]
    pub accounts: Option<PathBuf>,

    #[arg(long, env = "SUIVI_FORWARDED", value_enum, default_value_t = ForwardedMode::TrustAll)]
    pub forwarded: ForwardedMode,

    /// Proxy addresses allowed to set `X-Forwarded-For` (comma-separated).
    #[arg(long, env = "SUIVI_TRUSTED_PROXIES", value_delimiter = ',')]
    pub trusted_proxies: Vec<IpAddr>,

    #[arg(long, env = "SUIVI_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins (comma-separated, `*` for any).
    #[arg(long, env = "SUIVI_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,
}

impl ServerArgs {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for inconsistent forwarded/timeout settings.
    pub fn network_config(&self) -> Result<NetworkConfig, ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let forwarded = match self.forwarded {
            ForwardedMode::TrustAll => ForwardedPolicy::TrustAll,
            ForwardedMode::Ignore => ForwardedPolicy::Ignore,
            ForwardedMode::TrustedProxies if self.trusted_proxies.is_empty() => {
                return Err(ConfigError::NoTrustedProxies);
            }
            ForwardedMode::TrustedProxies => {
                ForwardedPolicy::TrustedProxies(self.trusted_proxies.clone())
            }
        };

        Ok(NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            forwarded,
        })
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log.clone(),
            format: self.log_format,
        }
    }
}
