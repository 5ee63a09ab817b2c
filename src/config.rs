use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

/// Which system sits on the other end of the outbound client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeerKind {
    /// This process is e-filing; the peer archives videos
    VideoArchiving,
    /// This process is video archiving; the peer is e-filing
    Efiling,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "crosslink-gateway")]
#[command(about = "Access-controlled, rate-limited bridge between e-filing and video archiving")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Base URL of the peer's external API, e.g. "http://localhost:3000/api/external"
    #[arg(long, env = "PEER_API_URL")]
    pub peer_url: Option<String>,

    #[arg(long, value_enum, env = "PEER_KIND", default_value = "video-archiving")]
    pub peer_kind: PeerKind,

    // Key sent to the peer in X-API-Key
    #[arg(long, env = "PEER_API_KEY", hide_env_values = true)]
    pub peer_api_key: Option<String>,

    // Outbound timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub peer_timeout_ms: u64,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // Peer health check interval in seconds
    #[arg(long, default_value_t = 30)]
    pub health_interval: u64,

    // JSON fixture with work requests, attachments, divisions and zones
    #[arg(long, env = "RECORDS_FILE")]
    pub records: Option<PathBuf>,

    // Env vars holding the expected inbound key, first non-empty wins
    #[arg(long, value_delimiter = ',', default_value = "VIDEO_ARCHIVING_API_KEY,EXTERNAL_API_KEY")]
    pub api_key_vars: Vec<String>,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

/// Settings the gateway reads on every request, so a rotated key applies
/// without a restart.
pub trait CredentialSource: Send + Sync {
    fn expected_credential(&self) -> Option<String>;
    fn is_development(&self) -> bool;
}

/// Reads the process environment at call time.
pub struct EnvCredentialSource {
    key_vars: Vec<String>,
}

impl EnvCredentialSource {
    pub fn new(key_vars: Vec<String>) -> Self {
        Self { key_vars }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn expected_credential(&self) -> Option<String> {
        self.key_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
    }

    fn is_development(&self) -> bool {
        ["APP_ENV", "NODE_ENV"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .any(|mode| mode.eq_ignore_ascii_case("development"))
    }
}

/// In-process settings that can be swapped at runtime.
pub struct StaticCredentials {
    expected: RwLock<Option<String>>,
    development: bool,
}

impl StaticCredentials {
    pub fn new(expected: Option<&str>, development: bool) -> Self {
        Self {
            expected: RwLock::new(expected.map(str::to_string)),
            development,
        }
    }

    pub fn rotate(&self, expected: Option<&str>) {
        *self.expected.write().unwrap_or_else(|e| e.into_inner()) = expected.map(str::to_string);
    }
}

impl CredentialSource for StaticCredentials {
    fn expected_credential(&self) -> Option<String> {
        self.expected.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn is_development(&self) -> bool {
        self.development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["crosslink-gateway"]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.peer_kind, PeerKind::VideoArchiving);
        assert_eq!(args.rate_limit_config().max_requests, 100);
        assert_eq!(args.rate_limit_config().window, Duration::from_secs(60));
        assert_eq!(args.api_key_vars, vec!["VIDEO_ARCHIVING_API_KEY", "EXTERNAL_API_KEY"]);
    }

    #[test]
    fn test_peer_kind_and_key_vars() {
        let args = Args::parse_from([
            "crosslink-gateway",
            "--peer-kind",
            "efiling",
            "--api-key-vars",
            "EFILING_INBOUND_KEY",
            "--peer-timeout-ms",
            "250",
        ]);
        assert_eq!(args.peer_kind, PeerKind::Efiling);
        assert_eq!(args.api_key_vars, vec!["EFILING_INBOUND_KEY"]);
        assert_eq!(args.peer_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(Args::try_parse_from(["crosslink-gateway", "--rate-limit", "0"]).is_err());
        assert!(Args::try_parse_from(["crosslink-gateway", "--rate-window", "0"]).is_err());
        let args = Args::try_parse_from(["crosslink-gateway", "--rate-limit", "1"]).unwrap();
        assert_eq!(args.rate_limit, 1);
    }

    #[test]
    fn test_static_credentials_rotate() {
        let creds = StaticCredentials::new(Some("old"), false);
        assert_eq!(creds.expected_credential().as_deref(), Some("old"));
        creds.rotate(Some("new"));
        assert_eq!(creds.expected_credential().as_deref(), Some("new"));
        creds.rotate(None);
        assert_eq!(creds.expected_credential(), None);
    }

    #[test]
    fn test_env_source_skips_unset_vars() {
        let source = EnvCredentialSource::new(vec![
            "CROSSLINK_TEST_DEFINITELY_UNSET_1".to_string(),
            "CROSSLINK_TEST_DEFINITELY_UNSET_2".to_string(),
        ]);
        assert_eq!(source.expected_credential(), None);
    }
}
