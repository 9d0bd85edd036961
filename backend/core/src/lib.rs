pub mod call;
pub mod error;
pub mod webhook;

pub use call::{ActionTaken, CallDirection, CallRecord, CallStatus, DialOutcome};
pub use error::RingError;
pub use webhook::{DialStatusEvent, GatherEvent, InitiateEvent, RecordingStatusEvent};
