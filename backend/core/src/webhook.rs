//! Inbound webhook payloads.
//!
//! The carrier posts form-encoded bodies with PascalCase field names; these
//! structs are the deserialization boundary. Numeric fields (durations) arrive
//! as strings and are parsed where they are consumed.

use serde::Deserialize;

/// Event A: a new inbound call has reached the voice webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateEvent {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
}

/// Event B: the caller pressed a digit at the menu prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct GatherEvent {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "Digits", default)]
    pub digits: String,
}

/// Event C: status callback for the parent call or its dialed (forwarded) leg.
#[derive(Debug, Clone, Deserialize)]
pub struct DialStatusEvent {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
    #[serde(rename = "DialCallSid")]
    pub dial_call_sid: Option<String>,
    #[serde(rename = "DialCallStatus")]
    pub dial_call_status: Option<String>,
    #[serde(rename = "DialCallDuration")]
    pub dial_call_duration: Option<String>,
}

impl DialStatusEvent {
    /// Whether this callback reports on the dialed leg rather than the
    /// parent call's general status.
    pub fn concerns_dial_leg(&self) -> bool {
        self.dial_call_sid.is_some() || self.dial_call_status.is_some()
    }
}

/// Event D: the voicemail recording attempt finished.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingStatusEvent {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "RecordingUrl")]
    pub recording_url: Option<String>,
    #[serde(rename = "RecordingDuration")]
    pub recording_duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate_event_from_form() {
        let ev: InitiateEvent =
            serde_urlencoded_like("CallSid=CA1&From=%2B15550001111&To=%2B15550002222");
        assert_eq!(ev.call_sid, "CA1");
        assert_eq!(ev.from, "+15550001111");
        assert!(ev.call_status.is_none());
    }

    #[test]
    fn test_gather_event_defaults_empty_digits() {
        let ev: GatherEvent = serde_urlencoded_like("CallSid=CA1");
        assert_eq!(ev.digits, "");
    }

    #[test]
    fn test_dial_status_event_leg_detection() {
        let with_leg: DialStatusEvent =
            serde_urlencoded_like("CallSid=CA1&DialCallStatus=busy");
        assert!(with_leg.concerns_dial_leg());

        let general: DialStatusEvent =
            serde_urlencoded_like("CallSid=CA1&CallStatus=completed&CallDuration=42");
        assert!(!general.concerns_dial_leg());
        assert_eq!(general.call_duration.as_deref(), Some("42"));
    }

    // Deserialize through serde_json after decoding form pairs; keeps the
    // test free of an extra dev-dependency on a form codec.
    fn serde_urlencoded_like<T: for<'de> Deserialize<'de>>(body: &str) -> T {
        let mut map = serde_json::Map::new();
        for pair in body.split('&') {
            let mut it = pair.splitn(2, '=');
            let key = it.next().unwrap().to_string();
            let value = it.next().unwrap_or("").replace("%2B", "+");
            map.insert(key, serde_json::Value::String(value));
        }
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }
}
