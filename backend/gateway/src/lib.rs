//! HTTP gateway for Ringline.
//!
//! Thin transport layer: extracts form-encoded webhook payloads, hands them
//! to the IVR engine, and renders the engine's reply as a `text/xml`
//! response. Also exposes the read-only call activity feed and a health
//! route. All failure handling lives in the engine; the gateway only maps
//! `is_error` to an HTTP status.

pub mod routes;
pub mod server;

pub use routes::{build_router, AppState};
pub use server::start_server;
