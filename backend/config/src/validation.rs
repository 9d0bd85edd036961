//! Config validation: startup checks with user-friendly error messages.

use thiserror::Error;

use crate::schema::Config;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
///
/// Errors are fatal at startup. Missing forwarding numbers are warnings only:
/// the gather handler degrades to `error_before_action` per call instead.
pub fn validate(config: &Config) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.bind_address.trim().is_empty() {
        report.error("bind_address", "Bind address cannot be empty");
    }
    if config.port == 0 {
        report.error("port", "Port cannot be 0");
    }
    if config.db_path.trim().is_empty() {
        report.error("db_path", "Database path cannot be empty");
    }
    if config.recording_url_prefix.trim().is_empty() {
        report.error(
            "recording_url_prefix",
            "Recording URL prefix cannot be empty; every recording would be rejected",
        );
    }

    match &config.forward_to_number {
        Some(n) if n.trim().is_empty() => {
            report.error("forward_to_number", "Forwarding number is set but empty")
        }
        None => report.warn(
            "forward_to_number",
            "No forwarding number configured; menu option 1 will fail per call",
        ),
        _ => {}
    }
    match &config.caller_id_number {
        Some(n) if n.trim().is_empty() => {
            report.error("caller_id_number", "Caller ID number is set but empty")
        }
        None => report.warn(
            "caller_id_number",
            "No caller ID configured; menu option 1 will fail per call",
        ),
        _ => {}
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarding_config() -> Config {
        Config {
            forward_to_number: Some("+15550001111".to_string()),
            caller_id_number: Some("+15550002222".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_is_valid_with_warnings() {
        let report = validate(&Config::default());
        assert!(report.is_valid());
        // Both forwarding numbers are unset.
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_fully_configured_passes_clean() {
        let report = validate(&forwarding_config());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = Config { port: 0, ..Config::default() };
        let report = validate(&config);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.path == "port"));
    }

    #[test]
    fn test_empty_forwarding_number_rejected() {
        let config = Config {
            forward_to_number: Some("  ".to_string()),
            ..forwarding_config()
        };
        let report = validate(&config);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.path == "forward_to_number"));
    }

    #[test]
    fn test_empty_bind_address_rejected() {
        let config = Config { bind_address: String::new(), ..Config::default() };
        assert!(!validate(&config).is_valid());
    }
}
