//! Ringline runtime configuration schema.
//!
//! Loaded from environment variables with sensible defaults; the forwarding
//! numbers are optional because their absence is a per-call failure
//! (`error_before_action`), not a startup failure.

use serde::Deserialize;

/// Ringline runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Log level (when RUST_LOG is unset)
    pub log_level: String,
    /// Directory for rolling NDJSON log files
    pub log_dir: String,
    /// Destination number for menu option 1 (forward to a human)
    pub forward_to_number: Option<String>,
    /// Caller ID presented on the forwarded leg
    pub caller_id_number: Option<String>,
    /// Required prefix for a recording URL to be considered valid
    pub recording_url_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            db_path: "ringline.db".to_string(),
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            forward_to_number: None,
            caller_id_number: None,
            recording_url_prefix: "https://api.twilio.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("RINGLINE_BIND")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("RINGLINE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            db_path: std::env::var("RINGLINE_DB")
                .unwrap_or_else(|_| "ringline.db".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
            log_dir: std::env::var("RINGLINE_LOG_DIR")
                .unwrap_or_else(|_| "logs".to_string()),
            forward_to_number: std::env::var("FORWARD_TO_NUMBER").ok(),
            caller_id_number: std::env::var("CALLER_ID_NUMBER").ok(),
            recording_url_prefix: std::env::var("RECORDING_URL_PREFIX")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
        }
    }
}
