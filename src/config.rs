//! Environment configuration for the server and the terminal client

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CHECKPOINT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_BLOCKED_TERMS: [&str; 3] = ["kickback", "gift card", "cash payment"];
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Where drafted documents are written
    pub output_dir: PathBuf,
    /// Terms that fail a draft's policy check
    pub blocked_terms: Vec<String>,
    /// Suspended executions older than this are dropped
    pub checkpoint_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("RESUME_GATEWAY_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let output_dir = lookup("RESUME_GATEWAY_OUTPUT_DIR").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".resume-gateway").join("documents")
            },
            PathBuf::from,
        );

        let blocked_terms = match lookup("RESUME_GATEWAY_BLOCKED_TERMS") {
            Some(terms) => terms
                .split(',')
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_BLOCKED_TERMS.iter().map(|t| (*t).to_string()).collect(),
        };

        let checkpoint_ttl = lookup("RESUME_GATEWAY_CHECKPOINT_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map_or(DEFAULT_CHECKPOINT_TTL, Duration::from_secs);

        Self {
            port,
            output_dir,
            blocked_terms,
            checkpoint_ttl,
        }
    }
}

/// Terminal client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    /// How long one request may wait for the gateway before it counts as
    /// a transport failure
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let server_url = lookup("RESUME_GATEWAY_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let request_timeout = lookup("RESUME_GATEWAY_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        Self {
            server_url,
            request_timeout,
        }
    }
}
