//! Event vs. response classification.
//!
//! AMI interleaves two kinds of messages on the same stream: asynchronous
//! *events* pushed by the PBX, and *responses* to commands the gateway sent.
//! Responses always carry a `Response: ` header; everything else is treated as
//! an event.

use crate::protocol::frame::RawMessage;

/// Header marker that identifies a command response.
pub const RESPONSE_MARKER: &str = "Response: ";

/// The outcome of classifying one [`RawMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// An asynchronous event; its text goes on to the field parser.
    Event(String),
    /// A reply to a prior command; dropped by the ingestion loop.
    Response(String),
}

impl Classified {
    /// Returns `true` for [`Classified::Event`].
    pub fn is_event(&self) -> bool {
        matches!(self, Classified::Event(_))
    }

    /// The concatenated message text, whichever kind it is.
    pub fn text(&self) -> &str {
        match self {
            Classified::Event(text) | Classified::Response(text) => text,
        }
    }
}

/// Classifies a completed message.
///
/// A message containing `"Response: "` anywhere in its text is a response.
/// An empty message classifies as an event with no fields.
///
/// # Example
///
/// ```rust
/// use ami_core::protocol::{classify, Classified, RawMessage};
///
/// let msg = RawMessage::from_lines(["Response: Success\r\n", "Message: Authentication accepted\r\n"]);
/// assert!(matches!(classify(&msg), Classified::Response(_)));
/// ```
pub fn classify(msg: &RawMessage) -> Classified {
    let text = msg.text();
    if text.contains(RESPONSE_MARKER) {
        Classified::Response(text)
    } else {
        Classified::Event(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
