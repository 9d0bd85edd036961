use std::fmt::Write;

/// A single voice instruction, rendered in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say {
        text: String,
    },
    /// Collect DTMF digits; the nested prompt is spoken while waiting.
    Gather {
        num_digits: u32,
        timeout_secs: u32,
        action: String,
        prompt: String,
    },
    Dial {
        caller_id: String,
        number: String,
        action: String,
    },
    Record {
        max_length_secs: u32,
        finish_on_key: String,
        play_beep: bool,
        action: String,
    },
    Redirect {
        action: String,
    },
    Hangup,
}

/// An ordered voice-markup document.
///
/// Builder methods consume and return `self` so responses read as one chain,
/// mirroring how the handlers compose them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    /// An empty response; renders as a bare acknowledgement document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say { text: text.into() });
        self
    }

    pub fn gather(
        mut self,
        num_digits: u32,
        timeout_secs: u32,
        action: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::Gather {
            num_digits,
            timeout_secs,
            action: action.into(),
            prompt: prompt.into(),
        });
        self
    }

    pub fn dial(
        mut self,
        caller_id: impl Into<String>,
        number: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::Dial {
            caller_id: caller_id.into(),
            number: number.into(),
            action: action.into(),
        });
        self
    }

    pub fn record(
        mut self,
        max_length_secs: u32,
        finish_on_key: impl Into<String>,
        play_beep: bool,
        action: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::Record {
            max_length_secs,
            finish_on_key: finish_on_key.into(),
            play_beep,
            action: action.into(),
        });
        self
    }

    pub fn redirect(mut self, action: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect { action: action.into() });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Render the document. Always well-formed, even with zero verbs.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        if self.verbs.is_empty() {
            xml.push_str("<Response/>");
            return xml;
        }
        xml.push_str("<Response>");
        for verb in &self.verbs {
            render_verb(&mut xml, verb);
        }
        xml.push_str("</Response>");
        xml
    }
}

fn render_verb(xml: &mut String, verb: &Verb) {
    match verb {
        Verb::Say { text } => {
            let _ = write!(xml, "<Say>{}</Say>", escape(text));
        }
        Verb::Gather { num_digits, timeout_secs, action, prompt } => {
            let _ = write!(
                xml,
                "<Gather numDigits=\"{}\" timeout=\"{}\" action=\"{}\" method=\"POST\"><Say>{}</Say></Gather>",
                num_digits,
                timeout_secs,
                escape(action),
                escape(prompt),
            );
        }
        Verb::Dial { caller_id, number, action } => {
            let _ = write!(
                xml,
                "<Dial callerId=\"{}\" action=\"{}\" method=\"POST\"><Number>{}</Number></Dial>",
                escape(caller_id),
                escape(action),
                escape(number),
            );
        }
        Verb::Record { max_length_secs, finish_on_key, play_beep, action } => {
            let _ = write!(
                xml,
                "<Record action=\"{}\" method=\"POST\" maxLength=\"{}\" finishOnKey=\"{}\" playBeep=\"{}\"/>",
                escape(action),
                max_length_secs,
                escape(finish_on_key),
                play_beep,
            );
        }
        Verb::Redirect { action } => {
            let _ = write!(xml, "<Redirect method=\"POST\">{}</Redirect>", escape(action));
        }
        Verb::Hangup => xml.push_str("<Hangup/>"),
    }
}

/// Escape text for use in XML content and attribute values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_is_valid_document() {
        let xml = VoiceResponse::new().to_xml();
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response/>");
    }

    #[test]
    fn test_say_and_hangup_in_order() {
        let xml = VoiceResponse::new().say("Goodbye.").hangup().to_xml();
        assert!(xml.contains("<Response><Say>Goodbye.</Say><Hangup/></Response>"));
    }

    #[test]
    fn test_gather_nests_prompt() {
        let xml = VoiceResponse::new()
            .gather(1, 10, "/twilio/gather", "Press 1 or 2.")
            .to_xml();
        assert!(xml.contains(
            "<Gather numDigits=\"1\" timeout=\"10\" action=\"/twilio/gather\" method=\"POST\">"
        ));
        assert!(xml.contains("<Say>Press 1 or 2.</Say></Gather>"));
    }

    #[test]
    fn test_dial_renders_caller_id_and_number() {
        let xml = VoiceResponse::new()
            .dial("+15550001111", "+15550002222", "/twilio/call-status")
            .to_xml();
        assert!(xml.contains("<Dial callerId=\"+15550001111\" action=\"/twilio/call-status\" method=\"POST\">"));
        assert!(xml.contains("<Number>+15550002222</Number>"));
    }

    #[test]
    fn test_record_attributes() {
        let xml = VoiceResponse::new()
            .record(60, "any", true, "/twilio/recording-status")
            .to_xml();
        assert!(xml.contains("maxLength=\"60\""));
        assert!(xml.contains("finishOnKey=\"any\""));
        assert!(xml.contains("playBeep=\"true\""));
        assert!(xml.contains("action=\"/twilio/recording-status\""));
    }

    #[test]
    fn test_redirect_body_is_target() {
        let xml = VoiceResponse::new().redirect("/twilio/voice").to_xml();
        assert!(xml.contains("<Redirect method=\"POST\">/twilio/voice</Redirect>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = VoiceResponse::new().say("Tom & Jerry <live>").to_xml();
        assert!(xml.contains("<Say>Tom &amp; Jerry &lt;live&gt;</Say>"));
    }

    #[test]
    fn test_deterministic_for_same_verbs() {
        let a = VoiceResponse::new().say("hi").redirect("/twilio/voice");
        let b = VoiceResponse::new().say("hi").redirect("/twilio/voice");
        assert_eq!(a.to_xml(), b.to_xml());
    }
}
