//! Voice-markup response builder.
//!
//! Renders the fixed set of carrier voice instructions (say, gather, dial,
//! record, redirect, hangup) into a well-formed XML document. Pure rendering:
//! deterministic, no side effects, and it cannot fail — an empty response is
//! itself a valid acknowledgement document.

pub mod response;

pub use response::{Verb, VoiceResponse};
