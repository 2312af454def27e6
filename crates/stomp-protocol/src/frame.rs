//! Raw STOMP frame as handed over by the transport.

use serde::{Deserialize, Serialize};

use crate::headers;

/// Server-to-client frame command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Command {
    Message,
    Receipt,
    Error,
    Other(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Command {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<Command> for String {
    fn from(value: Command) -> Self {
        value.as_str().to_string()
    }
}

/// A frame with ordered headers and an opaque body.
///
/// Repeated headers are kept; lookups return the first occurrence, which is
/// the one STOMP says takes effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Build a MESSAGE frame (mostly for tests and mocks).
    pub fn message(destination: &str, message_id: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Command::Message)
            .with_header(headers::DESTINATION, destination)
            .with_header(headers::MESSAGE_ID, message_id)
            .with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header(headers::MESSAGE_ID)
    }

    pub fn subscription(&self) -> Option<&str> {
        self.header(headers::SUBSCRIPTION)
    }

    pub fn destination(&self) -> Option<&str> {
        self.header(headers::DESTINATION)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_header_wins() {
        let frame = Frame::new(Command::Message)
            .with_header("foo", "first")
            .with_header("foo", "second");
        assert_eq!(frame.header("foo"), Some("first"));
        assert_eq!(frame.header("bar"), None);
    }

    #[test]
    fn message_helper_sets_core_headers() {
        let frame = Frame::message("/topic/events", "m-1", "hello")
            .with_header(headers::SUBSCRIPTION, "sub-1");
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.destination(), Some("/topic/events"));
        assert_eq!(frame.message_id(), Some("m-1"));
        assert_eq!(frame.subscription(), Some("sub-1"));
        assert_eq!(frame.body_text(), "hello");
    }

    #[test]
    fn command_string_mapping() {
        assert_eq!(Command::from("RECEIPT".to_string()), Command::Receipt);
        assert_eq!(
            Command::from("CONNECTED".to_string()),
            Command::Other("CONNECTED".into())
        );
        assert_eq!(
            serde_json::to_string(&Command::Error).unwrap(),
            r#""ERROR""#
        );
    }

    #[test]
    fn lossy_body_text() {
        let frame = Frame::new(Command::Message).with_body(vec![0x66, 0x6f, 0xff]);
        assert_eq!(frame.body_text(), "fo\u{fffd}");
    }
}
