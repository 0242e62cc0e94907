//! # ami-core
//!
//! Shared library for the AMI live gateway containing the Asterisk Manager
//! Interface (AMI) message framing, the event field parser, and the derived
//! telephony state that events are folded into.
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI
//! frameworks.  Everything here is a pure function or a plain data structure,
//! which keeps the interesting logic testable without a running PBX.
//!
//! # Architecture overview
//!
//! The PBX speaks AMI: a line-oriented text protocol where every message is a
//! block of `Key: Value` lines terminated by a blank line.  The gateway keeps
//! one AMI session open and turns the stream into a live view of the PBX:
//!
//! - **`protocol`** – How text travels over the wire.  Lines are grouped into
//!   messages ([`protocol::frame`]), messages are classified as events or
//!   command responses ([`protocol::classify`]), event text is parsed into a
//!   field map ([`protocol::fields`]), and outbound commands are formatted
//!   ([`protocol::commands`]).
//!
//! - **`domain`** – The state the gateway derives from events: known and
//!   reachable extensions, active calls, and a short rolling log of what
//!   happened ([`domain::state`]), plus the table that maps each event type to
//!   a state mutation ([`domain::aggregator`]).

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ami_core::DerivedState` instead of `ami_core::domain::state::DerivedState`.
pub use domain::aggregator::apply_event;
pub use domain::state::{DerivedState, RecentEvents, RECENT_EVENTS_CAPACITY};
pub use protocol::classify::{classify, Classified};
pub use protocol::commands::Command;
pub use protocol::fields::{parse_event, ParsedEvent};
pub use protocol::frame::{FrameAssembler, RawMessage};
pub use protocol::ProtocolError;
