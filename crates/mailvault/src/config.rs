//! Command line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use mailvault_core::{BatchSettings, SessionSettings};
use mailvault_gateway::GatewayConfig;

/// Log filter used when neither `RUST_LOG` nor `--log-level` is set.
pub const DEFAULT_LOG_FILTER: &str = "mailvault=info,mailvault_core=info,mailvault_gateway=info";

/// Longest accepted session lifetime, one year.
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

/// Server configuration. Every flag can also be set through its environment variable.
#[derive(Clone, Parser)]
#[command(name = "mailvault", version, about = "Outlook mailbox credential vault")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "MAILVAULT_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path of the `SQLite` database file.
    #[arg(long, env = "MAILVAULT_DATABASE", default_value = "./data/mailvault.db")]
    pub database: String,

    /// Shared access token operators sign in with.
    #[arg(long, env = "MAILVAULT_AUTH_TOKEN", hide_env_values = true, value_parser = non_empty)]
    pub auth_token: String,

    /// Base URL of the mail retrieval gateway.
    #[arg(long, env = "MAILVAULT_GATEWAY_URL", value_parser = non_empty)]
    pub gateway_url: String,

    /// Secret used to sign session tokens.
    #[arg(long, env = "MAILVAULT_JWT_SECRET", hide_env_values = true, value_parser = non_empty)]
    pub jwt_secret: String,

    /// Session lifetime in hours.
    #[arg(
        long,
        env = "MAILVAULT_SESSION_HOURS",
        default_value_t = 6,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_HOURS)
    )]
    pub session_hours: i64,

    /// Timeout of each gateway call, in seconds.
    #[arg(
        long,
        env = "MAILVAULT_GATEWAY_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub gateway_timeout_secs: u64,

    /// Concurrent gateway checks per batch. Zero selects the default of five.
    #[arg(long, env = "MAILVAULT_VALIDATION_WORKERS", default_value_t = 5)]
    pub validation_workers: usize,

    /// Store credentials without checking them against the gateway.
    #[arg(long, env = "MAILVAULT_SKIP_VALIDATION")]
    pub skip_validation: bool,

    /// Comma-separated allowed CORS origins. Any origin is allowed when empty.
    #[arg(long, env = "MAILVAULT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log filter, used when `RUST_LOG` is not set.
    #[arg(long, env = "MAILVAULT_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_level: String,
}

impl Config {
    /// Batch validator settings.
    #[must_use]
    pub const fn batch_settings(&self) -> BatchSettings {
        BatchSettings::new(self.validation_workers, self.skip_validation)
    }

    /// Session settings.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(&self.auth_token, &self.jwt_secret, self.session_hours)
    }

    /// Gateway client settings.
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(&self.gateway_url)
            .with_timeout(Duration::from_secs(self.gateway_timeout_secs))
    }

    /// Allowed CORS origins, blanks removed.
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "mailvault",
        "--auth-token",
        "open-sesame",
        "--gateway-url",
        "https://gateway.example.com",
        "--jwt-secret",
        "signing-secret",
    ];

    fn parse(extra: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(REQUIRED.iter().chain(extra).copied())
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.database, "./data/mailvault.db");
        assert_eq!(config.session_hours, 6);
        assert_eq!(config.gateway_timeout_secs, 30);
        assert!(!config.skip_validation);
        assert!(config.allowed_origins().is_empty());
        assert_eq!(config.log_level, DEFAULT_LOG_FILTER);

        let batch = config.batch_settings();
        assert_eq!(batch.workers, 5);
        assert_eq!(config.gateway_config().timeout, Duration::from_secs(30));
        assert_eq!(config.session_settings().lifetime, chrono::Duration::hours(6));
    }

    #[test]
    fn test_zero_workers_fall_back() {
        let config = parse(&["--validation-workers", "0", "--skip-validation"]).unwrap();
        let batch = config.batch_settings();
        assert_eq!(batch.workers, 5);
        assert!(batch.skip_validation);
    }

    #[test]
    fn test_cors_origins_are_split() {
        let config = parse(&["--cors-origins", "https://a.example, ,https://b.example"]).unwrap();
        assert_eq!(
            config.allowed_origins(),
            ["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_required_settings() {
        assert!(Config::try_parse_from(["mailvault"]).is_err());
        assert!(parse(&["--session-hours", "0"]).is_err());
        assert!(parse(&["--session-hours", "8761"]).is_err());
        assert!(parse(&["--session-hours", "9223372036854775807"]).is_err());
        let config = parse(&["--session-hours", "8760"]).unwrap();
        assert_eq!(config.session_settings().lifetime, chrono::Duration::hours(8760));

        let mut args = REQUIRED.to_vec();
        args[2] = "  ";
        assert!(Config::try_parse_from(args).is_err());
    }
}
