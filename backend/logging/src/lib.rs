//! Structured logging for Ringline.
//!
//! JSON file output with daily rotation plus a human-readable console layer.

pub mod logger;

pub use logger::init_logger;
