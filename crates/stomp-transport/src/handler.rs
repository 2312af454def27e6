//! Inbound frame classification.
//!
//! Sorts frames returned by `StompSession::read_frame` into typed
//! `IncomingFrame` variants so the binding can decide what becomes an
//! ackable pending frame without matching on command strings.

use stomp_protocol::{Command, Frame, headers};

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingFrame {
    /// Delivery on a subscription; the only kind that can be acked.
    Message(Frame),
    /// Broker confirmation of a frame sent with a `receipt` header.
    Receipt { receipt_id: Option<String>, frame: Frame },
    /// Broker-side failure report.
    Error { message: String, frame: Frame },
    /// Anything else (e.g. a stray CONNECTED).
    Unknown(Frame),
}

impl IncomingFrame {
    pub fn frame(&self) -> &Frame {
        match self {
            Self::Message(frame) | Self::Unknown(frame) => frame,
            Self::Receipt { frame, .. } | Self::Error { frame, .. } => frame,
        }
    }
}

/// Classify a raw frame.
pub fn classify(frame: Frame) -> IncomingFrame {
    match frame.command {
        Command::Message => IncomingFrame::Message(frame),
        Command::Receipt => IncomingFrame::Receipt {
            receipt_id: frame.header(headers::RECEIPT_ID).map(str::to_string),
            frame,
        },
        Command::Error => {
            let message = frame
                .header(headers::MESSAGE)
                .map(str::to_string)
                .unwrap_or_else(|| frame.body_text());
            IncomingFrame::Error { message, frame }
        }
        Command::Other(_) => IncomingFrame::Unknown(frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_message() {
        let frame = Frame::message("/queue/a", "m-1", "x");
        assert!(matches!(classify(frame), IncomingFrame::Message(ref f) if f.message_id() == Some("m-1")));
    }

    #[test]
    fn classify_receipt() {
        let frame = Frame::new(Command::Receipt).with_header(headers::RECEIPT_ID, "r-7");
        let msg = classify(frame);
        assert!(matches!(msg, IncomingFrame::Receipt { receipt_id: Some(ref id), .. } if id == "r-7"));
    }

    #[test]
    fn classify_error_prefers_message_header() {
        let frame = Frame::new(Command::Error)
            .with_header(headers::MESSAGE, "malformed frame")
            .with_body("details");
        let msg = classify(frame);
        assert!(matches!(msg, IncomingFrame::Error { ref message, .. } if message == "malformed frame"));
    }

    #[test]
    fn classify_error_falls_back_to_body() {
        let frame = Frame::new(Command::Error).with_body("queue full");
        let msg = classify(frame);
        assert!(matches!(msg, IncomingFrame::Error { ref message, .. } if message == "queue full"));
    }

    #[test]
    fn classify_unknown_command() {
        let frame = Frame::new(Command::Other("CONNECTED".into()));
        let msg = classify(frame);
        assert!(matches!(msg, IncomingFrame::Unknown(_)));
        assert_eq!(msg.frame().command.as_str(), "CONNECTED");
    }
}
