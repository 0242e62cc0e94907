//! `Key: Value` field parsing for AMI event text.
//!
//! The parser works on the whole event text at once rather than line by line:
//!
//! 1. `"Key: \r\n"` (a header with an empty value) becomes `"Key\tNULL\r\n"`,
//!    so empty values survive as the literal token `NULL`.
//! 2. Every remaining `": "` separator becomes a tab.
//! 3. The text is split on tabs, CRs and LFs, dropping empty pieces.
//! 4. The resulting tokens are paired positionally: even index = key, odd
//!    index = value.  A repeated key keeps its last value.
//!
//! `Action: X` lines (echoed in some replies) need no special case; `Action`
//! is paired with its value like any other key.
//!
//! A value that itself contains `": "` splits into extra tokens and shifts
//! the pairing.  When that leaves a dangling final token it is kept aside on
//! [`ParsedEvent::unpaired`] rather than silently discarded, so the caller can
//! report the drift.

use std::collections::HashMap;

use crate::protocol::ProtocolError;

/// Token substituted for an empty field value.
pub const NULL_VALUE: &str = "NULL";

/// Name of the field that carries the event type.
pub const EVENT_FIELD: &str = "Event";

/// A parsed AMI event: a flat map from field name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEvent {
    fields: HashMap<String, String>,
    unpaired: Option<String>,
}

impl ParsedEvent {
    /// Builds an event directly from `(key, value)` pairs.  Later pairs
    /// overwrite earlier ones with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            unpaired: None,
        }
    }

    /// Returns the value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns the value of `key`, or `""` if the field is absent.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// The `Event` field, or `""` for an event with no type.
    pub fn event_type(&self) -> &str {
        self.field(EVENT_FIELD)
    }

    /// The trailing token left over when the token count was odd.
    pub fn unpaired(&self) -> Option<&str> {
        self.unpaired.as_deref()
    }

    /// Reports a dangling trailing token as an error, for callers that want to
    /// log it.
    pub fn check_paired(&self) -> Result<(), ProtocolError> {
        match &self.unpaired {
            Some(token) => Err(ProtocolError::UnpairedToken(token.clone())),
            None => Ok(()),
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parses event text into a [`ParsedEvent`].
///
/// # Example
///
/// ```rust
/// use ami_core::protocol::parse_event;
///
/// let event = parse_event("Event: PeerStatus\r\nPeer: PJSIP/101\r\nCause: \r\n");
/// assert_eq!(event.event_type(), "PeerStatus");
/// assert_eq!(event.field("Peer"), "PJSIP/101");
/// assert_eq!(event.field("Cause"), "NULL");
/// ```
pub fn parse_event(text: &str) -> ParsedEvent {
    let normalized = text
        .replace(": \r\n", "\tNULL\r\n")
        .replace(": ", "\t");

    let mut tokens = normalized
        .split(['\t', '\r', '\n'])
        .filter(|token| !token.is_empty());

    let mut event = ParsedEvent::default();
    while let Some(key) = tokens.next() {
        match tokens.next() {
            Some(value) => {
                event.fields.insert(key.to_string(), value.to_string());
            }
            None => event.unpaired = Some(key.to_string()),
        }
    }
    event
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_simple_key_value_lines() {
        // Arrange
        let text = "Event: PeerStatus\r\nPeer: PJSIP/101\r\nPeerStatus: Reachable\r\n";

        // Act
        let event = parse_event(text);

        // Assert
        assert_eq!(event.len(), 3);
        assert_eq!(event.event_type(), "PeerStatus");
        assert_eq!(event.get("Peer"), Some("PJSIP/101"));
        assert_eq!(event.get("PeerStatus"), Some("Reachable"));
        assert!(event.unpaired().is_none());
    }

    #[test]
    fn test_empty_value_becomes_null_token() {
        let event = parse_event("Event: Hangup\r\nConnectedLineNum: \r\nLinkedid: x1\r\n");
        assert_eq!(event.field("ConnectedLineNum"), NULL_VALUE);
        assert_eq!(event.field("Linkedid"), "x1");
    }

    #[test]
    fn test_action_line_is_an_ordinary_key() {
        let event = parse_event("Action: PJSIPShowEndpoints\r\nActionID: 7\r\n");
        assert_eq!(event.field("Action"), "PJSIPShowEndpoints");
        assert_eq!(event.field("ActionID"), "7");
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let event = parse_event("Event: DialState\r\nDialStatus: RINGING\r\nDialStatus: ANSWER\r\n");
        assert_eq!(event.field("DialStatus"), "ANSWER");
        assert_eq!(event.len(), 2);
    }

    #[test]
    fn test_empty_text_yields_empty_event() {
        let event = parse_event("");
        assert!(event.is_empty());
        assert_eq!(event.event_type(), "");
        assert!(event.check_paired().is_ok());
    }

    #[test]
    fn test_odd_token_count_keeps_trailing_token_aside() {
        // A line with no ": " separator produces a lone token.
        let event = parse_event("Event: Odd\r\nGarbage\r\n");
        assert_eq!(event.field("Event"), "Odd");
        assert_eq!(event.unpaired(), Some("Garbage"));
        assert_eq!(
            event.check_paired(),
            Err(ProtocolError::UnpairedToken("Garbage".to_string()))
        );
    }

    #[test]
    fn test_value_containing_separator_shifts_pairing() {
        // "AppData: a: b" splits into three tokens; pairing shifts from there.
        let event = parse_event("Event: Newexten\r\nAppData: a: b\r\n");
        assert_eq!(event.field("Event"), "Newexten");
        assert_eq!(event.field("AppData"), "a");
        assert_eq!(event.unpaired(), Some("b"));
    }

    #[test]
    fn test_missing_field_reads_as_empty_string() {
        let event = parse_event("Event: DialBegin\r\n");
        assert_eq!(event.field("CallerIDNum"), "");
        assert_eq!(event.get("CallerIDNum"), None);
    }

    #[test]
    fn test_from_pairs_overwrites_duplicates() {
        let event = ParsedEvent::from_pairs([("Event", "A"), ("Event", "B")]);
        assert_eq!(event.event_type(), "B");
    }
}
