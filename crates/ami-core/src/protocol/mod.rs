//! Protocol module: AMI message framing, classification, field parsing, and
//! outbound command formatting.
//!
//! Wire format (all lines terminated by CRLF):
//! ```text
//! Event: PeerStatus\r\n
//! Peer: PJSIP/101\r\n
//! PeerStatus: Reachable\r\n
//! \r\n
//! ```

pub mod classify;
pub mod commands;
pub mod fields;
pub mod frame;

use thiserror::Error;

pub use classify::{classify, Classified};
pub use commands::Command;
pub use fields::{parse_event, ParsedEvent};
pub use frame::{FrameAssembler, RawMessage};

/// Line terminator used by every AMI line, including the blank line that ends
/// a message.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Errors raised while interpreting AMI message contents.
///
/// None of these are fatal to the ingestion task: the offending event is
/// logged and skipped.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A compound `Technology/Resource` identifier had no `/` separator.
    #[error("missing '/' separator in channel identifier {0:?}")]
    MissingSeparator(String),

    /// The event text ended with a key that had no value token after it.
    #[error("unpaired trailing field token {0:?}")]
    UnpairedToken(String),
}
