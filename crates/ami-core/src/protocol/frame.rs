//! Line-to-message framing for the AMI text stream.
//!
//! AMI is a *stream* of CRLF-terminated lines.  A message is every line up to
//! (but not including) the next bare `\r\n`.  Right after the TCP connection
//! opens, the PBX also sends a one-line greeting banner such as
//! `Asterisk Call Manager/5.0.1` that has no blank line after it; that line
//! is recognised only so it can be skipped.
//!
//! [`FrameAssembler`] is the pure state machine: feed it lines one at a time
//! and it hands back a [`RawMessage`] whenever a blank line closes one.  The
//! async reading loop that drives it lives in the web bridge's infrastructure
//! layer, which keeps this crate free of any I/O.

use super::LINE_TERMINATOR;

/// Substring that identifies the AMI greeting banner line.
pub const BANNER_MARKER: &str = "Asterisk Call Manager";

/// One complete AMI message: the ordered lines collected between two
/// blank-line delimiters.
///
/// Each line keeps its original terminator so the concatenated text is
/// byte-for-byte what the PBX sent (minus the closing blank line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    lines: Vec<String>,
}

impl RawMessage {
    /// Builds a message from already-collected lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// The lines of this message, in arrival order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` if no content lines were collected.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Concatenates all lines back into one string.
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

/// Returns `true` if `line` is a bare line terminator.
///
/// AMI always sends `\r\n`, but a lone `\n` is accepted as well so that a
/// hand-typed session (e.g. through `nc`) still frames correctly.
pub fn is_blank_line(line: &str) -> bool {
    line == LINE_TERMINATOR || line == "\n"
}

/// Accumulates lines into [`RawMessage`]s.
///
/// # Example
///
/// ```rust
/// use ami_core::protocol::frame::FrameAssembler;
///
/// let mut framer = FrameAssembler::new();
/// assert!(framer.push_line("Asterisk Call Manager/5.0.1\r\n").is_none());
/// assert!(framer.push_line("Event: FullyBooted\r\n").is_none());
/// let msg = framer.push_line("\r\n").unwrap();
/// assert_eq!(msg.text(), "Event: FullyBooted\r\n");
/// ```
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Vec<String>,
}

impl FrameAssembler {
    /// Creates an assembler with no buffered lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (including its terminator) into the assembler.
    ///
    /// Returns `Some(message)` when `line` is the blank line that completes a
    /// message.  A blank line with nothing buffered yields an empty message;
    /// the caller treats that as an event with no fields.
    pub fn push_line(&mut self, line: &str) -> Option<RawMessage> {
        if is_blank_line(line) {
            return Some(RawMessage {
                lines: std::mem::take(&mut self.pending),
            });
        }
        if line.contains(BANNER_MARKER) {
            return None;
        }
        self.pending.push(line.to_string());
        None
    }

    /// Number of lines buffered for the message currently being assembled.
    pub fn pending_lines(&self) -> usize {
        self.pending.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_terminator_is_a_blank_line() {
        assert!(is_blank_line(LINE_TERMINATOR));
        assert!(is_blank_line("\n"));
        assert!(!is_blank_line("Event: PeerStatus\r\n"));
    }

    #[test]
    fn test_blank_line_completes_message() {
        // Arrange
        let mut framer = FrameAssembler::new();

        // Act
        assert!(framer.push_line("Event: PeerStatus\r\n").is_none());
        assert!(framer.push_line("Peer: PJSIP/101\r\n").is_none());
        let msg = framer.push_line("\r\n");

        // Assert
        let msg = msg.expect("blank line must complete the message");
        assert_eq!(msg.lines().len(), 2);
        assert_eq!(msg.text(), "Event: PeerStatus\r\nPeer: PJSIP/101\r\n");
    }

    #[test]
    fn test_banner_line_is_never_part_of_a_message() {
        let mut framer = FrameAssembler::new();

        assert!(framer.push_line("Asterisk Call Manager/7.0.3\r\n").is_none());
        assert_eq!(framer.pending_lines(), 0);

        framer.push_line("Response: Success\r\n");
        let msg = framer.push_line("\r\n").unwrap();
        assert_eq!(msg.text(), "Response: Success\r\n");
    }

    #[test]
    fn test_consecutive_blank_lines_yield_empty_message() {
        let mut framer = FrameAssembler::new();
        framer.push_line("Event: A\r\n");
        framer.push_line("\r\n");

        // A second blank line with nothing buffered closes an empty message.
        let msg = framer.push_line("\r\n").unwrap();
        assert!(msg.is_empty());
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn test_assembler_resets_between_messages() {
        let mut framer = FrameAssembler::new();
        framer.push_line("Event: First\r\n");
        let first = framer.push_line("\r\n").unwrap();
        framer.push_line("Event: Second\r\n");
        let second = framer.push_line("\r\n").unwrap();

        assert_eq!(first.text(), "Event: First\r\n");
        assert_eq!(second.text(), "Event: Second\r\n");
    }

    #[test]
    fn test_bare_lf_is_accepted_as_blank_line() {
        assert!(is_blank_line("\n"));
        assert!(is_blank_line("\r\n"));
        assert!(!is_blank_line(" \r\n"));
        assert!(!is_blank_line(""));
    }

    #[test]
    fn test_empty_value_line_is_not_a_blank_line() {
        let mut framer = FrameAssembler::new();
        assert!(framer.push_line("ConnectedLineName: \r\n").is_none());
        assert_eq!(framer.pending_lines(), 1);
    }
}
