//! `ringline-config` — Ringline runtime configuration.
//!
//! Environment-driven config with defaults, plus startup validation that
//! fails fast on fatal misconfiguration and warns on degraded setups
//! (e.g. no forwarding number, so menu option 1 cannot complete).

pub mod schema;
pub mod validation;

pub use schema::Config;
pub use validation::{validate, ConfigValidationError, ValidationReport};
