use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Carrier-reported lifecycle status of a call.
///
/// Carrier payloads are free-form strings; anything outside the documented set
/// lands in `Other` rather than being trusted as a known state. Input is
/// lower-cased before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
    Other(String),
}

impl CallStatus {
    /// Parse a carrier status string, normalizing case at the boundary.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "initiated" => CallStatus::Initiated,
            "ringing" => CallStatus::Ringing,
            "in-progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "failed" => CallStatus::Failed,
            "no-answer" => CallStatus::NoAnswer,
            "canceled" => CallStatus::Canceled,
            other => CallStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Canceled => "canceled",
            CallStatus::Other(s) => s,
        }
    }

    /// True when the caller is gone: the statuses that trigger the
    /// hung-up-before-action fallback.
    pub fn is_hangup(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Canceled)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CallStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CallStatus::parse(&raw))
    }
}

/// Direction of the call relative to this system. Only `inbound` is produced
/// by the webhook handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal disposition of a call, refined as later callbacks arrive
/// (e.g. `Forwarded` -> `ForwardedCompleted`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTaken {
    Forwarded,
    ForwardedCompleted,
    ForwardedBusy,
    ForwardedNoAnswer,
    ForwardedFailed,
    /// Non-final dial-leg status observed while the placeholder `Forwarded`
    /// was still in place (e.g. `forwarded_ringing`).
    ForwardedOther(String),
    VoicemailRecordingPending,
    VoicemailRecorded,
    HungUpBeforeAction,
    ErrorBeforeAction,
    InvalidInput,
}

impl ActionTaken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "forwarded" => ActionTaken::Forwarded,
            "forwarded_completed" => ActionTaken::ForwardedCompleted,
            "forwarded_busy" => ActionTaken::ForwardedBusy,
            "forwarded_no_answer" => ActionTaken::ForwardedNoAnswer,
            "forwarded_failed" => ActionTaken::ForwardedFailed,
            "voicemail_recording_pending" => ActionTaken::VoicemailRecordingPending,
            "voicemail_recorded" => ActionTaken::VoicemailRecorded,
            "hung_up_before_action" => ActionTaken::HungUpBeforeAction,
            "error_before_action" => ActionTaken::ErrorBeforeAction,
            "invalid_input" => ActionTaken::InvalidInput,
            other => match other.strip_prefix("forwarded_") {
                Some(leg) => ActionTaken::ForwardedOther(leg.to_string()),
                None => ActionTaken::ForwardedOther(other.to_string()),
            },
        }
    }

    pub fn wire_name(&self) -> String {
        match self {
            ActionTaken::Forwarded => "forwarded".to_string(),
            ActionTaken::ForwardedCompleted => "forwarded_completed".to_string(),
            ActionTaken::ForwardedBusy => "forwarded_busy".to_string(),
            ActionTaken::ForwardedNoAnswer => "forwarded_no_answer".to_string(),
            ActionTaken::ForwardedFailed => "forwarded_failed".to_string(),
            ActionTaken::ForwardedOther(leg) => format!("forwarded_{leg}"),
            ActionTaken::VoicemailRecordingPending => "voicemail_recording_pending".to_string(),
            ActionTaken::VoicemailRecorded => "voicemail_recorded".to_string(),
            ActionTaken::HungUpBeforeAction => "hung_up_before_action".to_string(),
            ActionTaken::ErrorBeforeAction => "error_before_action".to_string(),
            ActionTaken::InvalidInput => "invalid_input".to_string(),
        }
    }

    /// A specific, settled forwarding outcome. Once one of these is recorded,
    /// a later generic status callback must not widen it back to a
    /// placeholder value.
    pub fn is_forward_final(&self) -> bool {
        matches!(
            self,
            ActionTaken::ForwardedCompleted
                | ActionTaken::ForwardedBusy
                | ActionTaken::ForwardedNoAnswer
                | ActionTaken::ForwardedFailed
        )
    }
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name())
    }
}

impl Serialize for ActionTaken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_name())
    }
}

impl<'de> Deserialize<'de> for ActionTaken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ActionTaken::parse(&raw))
    }
}

/// Status of the dialed (forwarded) leg reported by the carrier on the
/// dial action callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialOutcome {
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
    Other(String),
}

impl DialOutcome {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "completed" => DialOutcome::Completed,
            "busy" => DialOutcome::Busy,
            "no-answer" => DialOutcome::NoAnswer,
            "failed" => DialOutcome::Failed,
            "canceled" => DialOutcome::Canceled,
            other => DialOutcome::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DialOutcome::Completed => "completed",
            DialOutcome::Busy => "busy",
            DialOutcome::NoAnswer => "no-answer",
            DialOutcome::Failed => "failed",
            DialOutcome::Canceled => "canceled",
            DialOutcome::Other(s) => s,
        }
    }
}

impl fmt::Display for DialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one physical phone call, keyed by the carrier call SID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: Uuid,
    pub call_sid: String,
    pub from: String,
    pub to: String,
    pub status: CallStatus,
    pub direction: CallDirection,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Total call duration in seconds.
    pub duration: Option<i64>,
    pub digits_pressed: Option<String>,
    pub action_taken: Option<ActionTaken>,
    pub forwarded_to: Option<String>,
    pub recording_url: Option<String>,
    /// Recording length in seconds; not authoritative for total call length.
    pub recording_duration: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    /// Fresh record for a just-received inbound call.
    pub fn new_inbound(
        call_sid: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            call_sid: call_sid.into(),
            from: from.into(),
            to: to.into(),
            status: CallStatus::Initiated,
            direction: CallDirection::Inbound,
            start_time: now,
            end_time: None,
            duration: None,
            digits_pressed: None,
            action_taken: None,
            forwarded_to: None,
            recording_url: None,
            recording_duration: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_parse_normalizes_case() {
        assert_eq!(CallStatus::parse("Completed"), CallStatus::Completed);
        assert_eq!(CallStatus::parse("NO-ANSWER"), CallStatus::NoAnswer);
        assert_eq!(CallStatus::parse("in-progress"), CallStatus::InProgress);
    }

    #[test]
    fn test_call_status_unknown_goes_to_other() {
        let status = CallStatus::parse("Queued");
        assert_eq!(status, CallStatus::Other("queued".to_string()));
        assert_eq!(status.as_str(), "queued");
    }

    #[test]
    fn test_hangup_statuses() {
        assert!(CallStatus::Completed.is_hangup());
        assert!(CallStatus::Canceled.is_hangup());
        assert!(!CallStatus::InProgress.is_hangup());
        assert!(!CallStatus::Other("queued".into()).is_hangup());
    }

    #[test]
    fn test_action_taken_round_trip() {
        for raw in [
            "forwarded",
            "forwarded_completed",
            "forwarded_busy",
            "forwarded_no_answer",
            "forwarded_failed",
            "voicemail_recording_pending",
            "voicemail_recorded",
            "hung_up_before_action",
            "error_before_action",
            "invalid_input",
        ] {
            assert_eq!(ActionTaken::parse(raw).wire_name(), raw);
        }
    }

    #[test]
    fn test_action_taken_forwarded_other() {
        let action = ActionTaken::parse("forwarded_ringing");
        assert_eq!(action, ActionTaken::ForwardedOther("ringing".to_string()));
        assert_eq!(action.wire_name(), "forwarded_ringing");
        assert!(!action.is_forward_final());
    }

    #[test]
    fn test_forward_final_outcomes() {
        assert!(ActionTaken::ForwardedCompleted.is_forward_final());
        assert!(ActionTaken::ForwardedNoAnswer.is_forward_final());
        assert!(!ActionTaken::Forwarded.is_forward_final());
        assert!(!ActionTaken::VoicemailRecorded.is_forward_final());
    }

    #[test]
    fn test_new_inbound_defaults() {
        let record = CallRecord::new_inbound("CA123", "+15550001111", "+15550002222");
        assert_eq!(record.status, CallStatus::Initiated);
        assert_eq!(record.direction, CallDirection::Inbound);
        assert!(record.action_taken.is_none());
        assert!(record.end_time.is_none());
        assert!(!record.id.is_nil());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = CallRecord::new_inbound("CA123", "+1A", "+1B");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["callSid"], "CA123");
        assert_eq!(json["status"], "initiated");
        assert_eq!(json["direction"], "inbound");
        assert!(json["actionTaken"].is_null());
    }
}
