//! Call lifecycle state machine.
//!
//! Four webhook events drive a call through the IVR menu: Initiate (call
//! start), Gather (menu digit), DialLegStatus (forwarded-leg outcome), and
//! RecordingStatus (voicemail outcome). Each handler reconstructs its context
//! from the durable call record, applies one transition, and always answers
//! with a valid voice document — the carrier retries anything unanswered.

pub mod engine;

pub use engine::{IvrEngine, IvrReply, IvrSettings};
