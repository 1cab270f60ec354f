//! TwiML reply envelope for the messaging webhook.
//!
//! The transport expects replies as a TwiML `<Response>` document with one
//! `<Message>` per outbound text. The dialogue logic never sees this; the
//! webhook handler wraps its reply text on the way out.

/// Builder for a TwiML messaging response.
#[derive(Debug, Default)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an outbound message body.
    pub fn message(mut self, body: &str) -> Self {
        self.messages.push(body.to_string());
        self
    }

    /// Render the TwiML document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for body in &self.messages {
            xml.push_str("<Message>");
            xml.push_str(&escape_xml(body));
            xml.push_str("</Message>");
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
