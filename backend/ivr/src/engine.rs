use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use ringline_core::{
    ActionTaken, CallRecord, CallStatus, DialOutcome, DialStatusEvent, GatherEvent,
    InitiateEvent, RecordingStatusEvent,
};
use ringline_storage::{CallMutator, CallStore};
use ringline_twiml::VoiceResponse;

const MENU_DIGITS: u32 = 1;
const GATHER_TIMEOUT_SECS: u32 = 10;
const MAX_RECORDING_SECS: u32 = 60;

const MENU_PROMPT: &str =
    "Thank you for calling. Press 1 to be connected to an agent. Press 2 to leave a voicemail.";
const NO_INPUT_MESSAGE: &str = "We did not receive any input. Goodbye.";
const FORWARDING_MESSAGE: &str = "Forwarding your call. Please wait.";
const VOICEMAIL_PROMPT: &str =
    "Please leave your message after the beep. Press any key or hang up when finished.";
const VOICEMAIL_CLOSING: &str =
    "If you are done recording, please hang up. Otherwise, we will hang up shortly.";
const INVALID_INPUT_MESSAGE: &str = "Invalid input. Please try again.";
const RECORD_NOT_FOUND_MESSAGE: &str =
    "An error occurred. We could not find your call record. Goodbye.";
const GENERIC_ERROR_MESSAGE: &str =
    "We are sorry, an error occurred on our end. Please try again later.";
const GATHER_ERROR_MESSAGE: &str =
    "We are sorry, an error occurred while processing your request. Goodbye.";
const CONFIG_ERROR_MESSAGE: &str =
    "We are sorry, this option is not available right now. Please try again later.";
const THANK_YOU_MESSAGE: &str = "Thank you for your message. Goodbye.";
const NO_RECORDING_MESSAGE: &str =
    "No recording was received, or an error occurred with the recording. Goodbye.";
const RECORDING_ERROR_MESSAGE: &str =
    "An error occurred while finalizing your voicemail. Goodbye.";

/// Per-call behavior settings, injected at startup. The forwarding numbers
/// are optional: their absence is a per-call configuration failure, surfaced
/// as `error_before_action` when the caller picks option 1.
#[derive(Debug, Clone)]
pub struct IvrSettings {
    pub forward_to_number: Option<String>,
    pub caller_id_number: Option<String>,
    pub recording_url_prefix: String,
    pub voice_path: String,
    pub gather_path: String,
    pub call_status_path: String,
    pub recording_status_path: String,
}

impl Default for IvrSettings {
    fn default() -> Self {
        Self {
            forward_to_number: None,
            caller_id_number: None,
            recording_url_prefix: "https://api.twilio.com".to_string(),
            voice_path: "/twilio/voice".to_string(),
            gather_path: "/twilio/gather".to_string(),
            call_status_path: "/twilio/call-status".to_string(),
            recording_status_path: "/twilio/recording-status".to_string(),
        }
    }
}

/// A handler's answer to the carrier: a voice document plus whether the
/// transport should report an error status. Even error replies carry a
/// spoken message — the caller never gets a silent drop.
#[derive(Debug, Clone)]
pub struct IvrReply {
    pub twiml: VoiceResponse,
    pub is_error: bool,
}

impl IvrReply {
    fn ok(twiml: VoiceResponse) -> Self {
        Self { twiml, is_error: false }
    }

    fn error(twiml: VoiceResponse) -> Self {
        Self { twiml, is_error: true }
    }
}

/// The call state machine. Stateless between events: every handler reloads
/// its context from the store by call SID, mutates the record atomically,
/// and produces the next voice action.
pub struct IvrEngine {
    store: Arc<dyn CallStore>,
    settings: IvrSettings,
}

impl IvrEngine {
    pub fn new(store: Arc<dyn CallStore>, settings: IvrSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &IvrSettings {
        &self.settings
    }

    /// Event A: a new inbound call. Creation is idempotent: a carrier retry
    /// for a known SID only refreshes the reported status.
    pub async fn handle_initiate(&self, event: InitiateEvent) -> IvrReply {
        info!(call_sid = %event.call_sid, from = %event.from, to = %event.to, "incoming call");

        let record = CallRecord::new_inbound(&event.call_sid, &event.from, &event.to);
        let created = match self.store.insert_if_absent(&record).await {
            Ok(created) => created,
            Err(err) => {
                error!(call_sid = %event.call_sid, error = %err, "failed to log incoming call");
                return IvrReply::error(VoiceResponse::new().say(GENERIC_ERROR_MESSAGE).hangup());
            }
        };

        if created {
            info!(call_sid = %event.call_sid, record_id = %record.id, "call record created");
        } else {
            info!(call_sid = %event.call_sid, "call record already exists");
            if let Some(raw) = event.call_status.as_deref() {
                let reported = CallStatus::parse(raw);
                let result = self
                    .store
                    .update(
                        &event.call_sid,
                        Box::new(move |call| {
                            if call.status != reported {
                                call.status = reported;
                            }
                        }),
                    )
                    .await;
                if let Err(err) = result {
                    error!(call_sid = %event.call_sid, error = %err, "failed to refresh call status");
                    return IvrReply::error(
                        VoiceResponse::new().say(GENERIC_ERROR_MESSAGE).hangup(),
                    );
                }
            }
        }

        IvrReply::ok(
            VoiceResponse::new()
                .gather(
                    MENU_DIGITS,
                    GATHER_TIMEOUT_SECS,
                    self.settings.gather_path.as_str(),
                    MENU_PROMPT,
                )
                .say(NO_INPUT_MESSAGE)
                .hangup(),
        )
    }

    /// Event B: the caller pressed a menu digit.
    pub async fn handle_gather(&self, event: GatherEvent) -> IvrReply {
        info!(call_sid = %event.call_sid, digits = %event.digits, "menu digit gathered");

        let (mutator, twiml) = match event.digits.as_str() {
            "1" => self.forward_branch(&event.digits),
            "2" => self.voicemail_branch(&event.digits),
            _ => self.invalid_branch(&event.digits),
        };

        match self.store.update(&event.call_sid, mutator).await {
            Ok(Some(record)) => {
                info!(
                    call_sid = %event.call_sid,
                    action = ?record.action_taken,
                    "gather outcome persisted"
                );
                IvrReply::ok(twiml)
            }
            Ok(None) => {
                error!(call_sid = %event.call_sid, "no call record found for gather");
                IvrReply::ok(VoiceResponse::new().say(RECORD_NOT_FOUND_MESSAGE).hangup())
            }
            Err(err) => {
                error!(call_sid = %event.call_sid, error = %err, "failed to persist gather outcome");
                let message = format!("error during gather: {err}");
                self.annotate_failure(
                    &event.call_sid,
                    Box::new(move |call| {
                        call.error_message = Some(message);
                        call.action_taken = Some(ActionTaken::ErrorBeforeAction);
                    }),
                )
                .await;
                IvrReply::error(VoiceResponse::new().say(GATHER_ERROR_MESSAGE).hangup())
            }
        }
    }

    /// Event C: status callback for the parent call or its dialed leg.
    /// Always acknowledged at success level so the carrier never retries.
    pub async fn handle_dial_status(&self, event: DialStatusEvent) -> IvrReply {
        info!(
            call_sid = %event.call_sid,
            dial_leg = event.concerns_dial_leg(),
            call_status = event.call_status.as_deref(),
            dial_call_status = event.dial_call_status.as_deref(),
            "call status callback"
        );

        let concerns_leg = event.concerns_dial_leg();
        let parent_status = event.call_status.as_deref().map(CallStatus::parse);
        let leg_outcome = event.dial_call_status.as_deref().map(DialOutcome::parse);
        let duration = event.call_duration.as_deref().and_then(|d| d.parse::<i64>().ok());

        let mutator: CallMutator = Box::new(move |call| {
            if concerns_leg {
                // The parent call is over once the dial attempt resolves;
                // prefer the carrier-reported parent status when present.
                call.status = parent_status.unwrap_or(CallStatus::Completed);
                if let Some(outcome) = leg_outcome {
                    apply_dial_outcome(call, outcome);
                }
            } else if let Some(status) = parent_status {
                call.status = status;
            }
            if let Some(secs) = duration {
                call.duration = Some(secs);
            }
            call.end_time = Some(Utc::now());
            // Caller disconnected before any menu choice took effect.
            if call.status.is_hangup() && call.action_taken.is_none() {
                call.action_taken = Some(ActionTaken::HungUpBeforeAction);
            }
        });

        match self.store.update(&event.call_sid, mutator).await {
            Ok(Some(record)) => {
                info!(
                    call_sid = %event.call_sid,
                    status = %record.status,
                    action = ?record.action_taken,
                    "call status updated"
                );
            }
            Ok(None) => {
                warn!(call_sid = %event.call_sid, "status callback for unknown call");
            }
            Err(err) => {
                error!(call_sid = %event.call_sid, error = %err, "failed to apply status callback");
                let message = format!("error in call status: {err}");
                self.annotate_failure(
                    &event.call_sid,
                    Box::new(move |call| call.error_message = Some(message)),
                )
                .await;
            }
        }

        IvrReply::ok(VoiceResponse::new())
    }

    /// Event D: the voicemail recording attempt finished. Success is
    /// indicated by a recording URL with the expected carrier prefix.
    pub async fn handle_recording_status(&self, event: RecordingStatusEvent) -> IvrReply {
        info!(
            call_sid = %event.call_sid,
            url = event.recording_url.as_deref(),
            "recording status callback"
        );

        let url = event.recording_url.clone().filter(|u| !u.is_empty());
        let valid = url
            .as_deref()
            .is_some_and(|u| u.starts_with(&self.settings.recording_url_prefix));
        let recording_duration =
            event.recording_duration.as_deref().and_then(|d| d.parse::<i64>().ok());

        let mutator: CallMutator = Box::new(move |call| {
            let now = Utc::now();
            call.action_taken = Some(ActionTaken::VoicemailRecorded);
            call.status = CallStatus::Completed;
            call.end_time = Some(now);
            // The recording length covers the voicemail leg only; total call
            // duration comes from the call timestamps.
            call.duration = Some((now - call.start_time).num_seconds());
            if valid {
                call.recording_url = url;
                call.recording_duration = recording_duration;
            } else {
                call.error_message = Some(format!(
                    "Voicemail attempt made, but no valid recording URL was received (url: {})",
                    url.as_deref().unwrap_or("n/a"),
                ));
            }
        });

        match self.store.update(&event.call_sid, mutator).await {
            Ok(Some(record)) => {
                if valid {
                    info!(
                        call_sid = %event.call_sid,
                        url = record.recording_url.as_deref(),
                        "voicemail saved"
                    );
                    IvrReply::ok(VoiceResponse::new().say(THANK_YOU_MESSAGE).hangup())
                } else {
                    warn!(call_sid = %event.call_sid, "recording callback without a valid URL");
                    IvrReply::ok(VoiceResponse::new().say(NO_RECORDING_MESSAGE).hangup())
                }
            }
            Ok(None) => {
                error!(call_sid = %event.call_sid, "no call record found for recording status");
                IvrReply::ok(VoiceResponse::new().say(RECORD_NOT_FOUND_MESSAGE).hangup())
            }
            Err(err) => {
                error!(call_sid = %event.call_sid, error = %err, "failed to finalize voicemail");
                let message = format!("error in recording status: {err}");
                self.annotate_failure(
                    &event.call_sid,
                    Box::new(move |call| {
                        call.error_message = Some(message);
                        if call.action_taken == Some(ActionTaken::VoicemailRecordingPending) {
                            call.action_taken = Some(ActionTaken::ErrorBeforeAction);
                        }
                        call.status = CallStatus::Failed;
                    }),
                )
                .await;
                IvrReply::error(VoiceResponse::new().say(RECORDING_ERROR_MESSAGE).hangup())
            }
        }
    }

    fn forward_branch(&self, digits: &str) -> (CallMutator, VoiceResponse) {
        let digits = digits.to_string();
        match (
            self.settings.forward_to_number.clone(),
            self.settings.caller_id_number.clone(),
        ) {
            (Some(target), Some(caller_id)) => {
                let twiml = VoiceResponse::new().say(FORWARDING_MESSAGE).dial(
                    caller_id,
                    target.clone(),
                    self.settings.call_status_path.as_str(),
                );
                let mutator: CallMutator = Box::new(move |call| {
                    call.digits_pressed = Some(digits);
                    call.action_taken = Some(ActionTaken::Forwarded);
                    call.forwarded_to = Some(target);
                });
                (mutator, twiml)
            }
            (target, _) => {
                let missing = if target.is_none() {
                    "forwarding number"
                } else {
                    "caller ID number"
                };
                warn!(missing, "forwarding requested but configuration is incomplete");
                let message = format!("{missing} is not configured");
                let mutator: CallMutator = Box::new(move |call| {
                    call.digits_pressed = Some(digits);
                    call.action_taken = Some(ActionTaken::ErrorBeforeAction);
                    call.error_message = Some(message);
                });
                (mutator, VoiceResponse::new().say(CONFIG_ERROR_MESSAGE).hangup())
            }
        }
    }

    fn voicemail_branch(&self, digits: &str) -> (CallMutator, VoiceResponse) {
        let digits = digits.to_string();
        let twiml = VoiceResponse::new()
            .say(VOICEMAIL_PROMPT)
            .record(
                MAX_RECORDING_SECS,
                "any",
                true,
                self.settings.recording_status_path.as_str(),
            )
            .say(VOICEMAIL_CLOSING);
        let mutator: CallMutator = Box::new(move |call| {
            call.digits_pressed = Some(digits);
            call.action_taken = Some(ActionTaken::VoicemailRecordingPending);
        });
        (mutator, twiml)
    }

    fn invalid_branch(&self, digits: &str) -> (CallMutator, VoiceResponse) {
        let digits = digits.to_string();
        // Restarting the menu is safe: Initiate is idempotent on the SID.
        let twiml = VoiceResponse::new()
            .say(INVALID_INPUT_MESSAGE)
            .redirect(self.settings.voice_path.as_str());
        let mutator: CallMutator = Box::new(move |call| {
            call.digits_pressed = Some(digits);
            call.action_taken = Some(ActionTaken::InvalidInput);
        });
        (mutator, twiml)
    }

    /// Degraded write path: best-effort error annotation after a primary
    /// persistence failure. Its own failure is only logged.
    async fn annotate_failure(&self, call_sid: &str, mutate: CallMutator) {
        if let Err(err) = self.store.update(call_sid, mutate).await {
            warn!(call_sid = %call_sid, error = %err, "degraded error annotation also failed");
        }
    }
}

/// Map a dialed-leg outcome onto the record. Final outcomes own the action
/// unconditionally; a non-final leg status only refines the generic
/// `forwarded` placeholder and never touches an already-specific value.
fn apply_dial_outcome(call: &mut CallRecord, outcome: DialOutcome) {
    match outcome {
        DialOutcome::Completed => call.action_taken = Some(ActionTaken::ForwardedCompleted),
        DialOutcome::Busy => call.action_taken = Some(ActionTaken::ForwardedBusy),
        DialOutcome::NoAnswer => call.action_taken = Some(ActionTaken::ForwardedNoAnswer),
        DialOutcome::Failed | DialOutcome::Canceled => {
            call.error_message =
                Some(format!("Forwarded call leg failed with status: {outcome}"));
            call.action_taken = Some(ActionTaken::ForwardedFailed);
        }
        DialOutcome::Other(leg) => {
            if call.action_taken == Some(ActionTaken::Forwarded) {
                call.action_taken = Some(ActionTaken::ForwardedOther(leg));
            }
        }
    }
}
