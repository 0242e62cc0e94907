//! Event-to-state transition table.
//!
//! [`apply_event`] folds one parsed AMI event into [`DerivedState`] and returns
//! the human-readable line it appended to the recent-events log, if any.
//!
//! | Event                  | Condition                | Mutation                       |
//! |------------------------|--------------------------|--------------------------------|
//! | `PeerStatus`           | `Reachable`/`Unreachable`| add/remove active endpoint     |
//! | `DialBegin`/`DialState`| -                        | log only                       |
//! | `DialEnd`              | `DialStatus: ANSWER`     | start call                     |
//! | `AGIExecStart`         | `Command: ANSWER`        | start call                     |
//! | `Hangup`               | linkage id is active     | end call                       |
//! | `EndpointList`         | -                        | record endpoint (no log)       |
//! | `EndpointListComplete` | last pending listing     | swap staged roster (no log)    |
//!
//! Everything else, including an event with no `Event` field, is a no-op.

use tracing::{debug, warn};

use crate::domain::state::DerivedState;
use crate::protocol::fields::ParsedEvent;
use crate::protocol::ProtocolError;

/// `DialStatus` / `Command` value that marks a connected call.
const ANSWER: &str = "ANSWER";

/// `DeviceState` value of an endpoint that is not reachable.
const UNAVAILABLE: &str = "Unavailable";

/// The event types the gateway reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PeerStatus,
    DialBegin,
    DialState,
    DialEnd,
    AgiExecStart,
    Hangup,
    EndpointList,
    EndpointListComplete,
}

impl EventKind {
    /// Maps an `Event` field value to a kind; unknown types yield `None`.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Some(match event_type {
            "PeerStatus" => Self::PeerStatus,
            "DialBegin" => Self::DialBegin,
            "DialState" => Self::DialState,
            "DialEnd" => Self::DialEnd,
            "AGIExecStart" => Self::AgiExecStart,
            "Hangup" => Self::Hangup,
            "EndpointList" => Self::EndpointList,
            "EndpointListComplete" => Self::EndpointListComplete,
            _ => return None,
        })
    }
}

/// Extracts the extension from a `Technology/Resource` identifier, e.g.
/// `PJSIP/101` → `101`.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingSeparator`] if there is no `/`.
pub fn endpoint_id(channel: &str) -> Result<&str, ProtocolError> {
    channel
        .split_once('/')
        .map(|(_, resource)| resource)
        .ok_or_else(|| ProtocolError::MissingSeparator(channel.to_string()))
}

/// Applies one event to `state`.
///
/// Returns the line appended to the recent-events log, or `None` when the
/// event produced no log line.  Malformed events are logged and skipped; this
/// function never panics on PBX input.
pub fn apply_event(state: &mut DerivedState, event: &ParsedEvent) -> Option<String> {
    let Some(kind) = EventKind::from_event_type(event.event_type()) else {
        debug!("ignoring event type {:?}", event.event_type());
        return None;
    };

    let line = match kind {
        EventKind::PeerStatus => peer_status(state, event),
        EventKind::DialBegin => Some(format!(
            "{} has dialed {}.",
            event.field("CallerIDNum"),
            event.field("DestCallerIDNum")
        )),
        EventKind::DialState => Some(format!(
            "Dial status of the call from {} to {} changed to {}.",
            event.field("CallerIDNum"),
            event.field("DestCallerIDNum"),
            event.field("DialStatus")
        )),
        EventKind::DialEnd => Some(dial_end(state, event)),
        EventKind::AgiExecStart => agi_exec_start(state, event),
        EventKind::Hangup => hangup(state, event),
        EventKind::EndpointList => {
            let available = event.field("DeviceState") != UNAVAILABLE;
            state.record_endpoint(event.field("ObjectName"), available);
            None
        }
        EventKind::EndpointListComplete => {
            if !state.complete_refresh() {
                debug!(
                    "EndpointListComplete without swap ({} listing(s) still pending)",
                    state.pending_listings()
                );
            }
            None
        }
    };

    if let Some(line) = &line {
        state.log(line.clone());
    }
    line
}

fn peer_status(state: &mut DerivedState, event: &ParsedEvent) -> Option<String> {
    let status = event.field("PeerStatus");
    if status != "Reachable" && status != "Unreachable" {
        return None;
    }

    let id = match endpoint_id(event.field("Peer")) {
        Ok(id) => id,
        Err(e) => {
            warn!("skipping PeerStatus event: {e}");
            return None;
        }
    };

    if status == "Reachable" {
        state.activate_endpoint(id);
        Some(format!("Ext {id} has registered."))
    } else {
        state.deactivate_endpoint(id);
        Some(format!("Ext {id} has unregistered."))
    }
}

fn dial_end(state: &mut DerivedState, event: &ParsedEvent) -> String {
    let caller = event.field("CallerIDNum");
    let connected = event.field("ConnectedLineNum");
    let status = event.field("DialStatus");

    if status == ANSWER {
        state.start_call(event.field("Linkedid"), format!("{caller} -> {connected}"));
        format!("The call between {caller} and {connected} has started.")
    } else {
        format!("The call from {caller} to {connected} ended with dial status {status}.")
    }
}

fn agi_exec_start(state: &mut DerivedState, event: &ParsedEvent) -> Option<String> {
    if event.field("Command") != ANSWER {
        return None;
    }
    let caller = event.field("CallerIDNum");
    let exten = event.field("Exten");
    state.start_call(event.field("Linkedid"), format!("{caller} -> {exten}"));
    Some(format!("The call between {caller} and {exten} has started."))
}

fn hangup(state: &mut DerivedState, event: &ParsedEvent) -> Option<String> {
    state.end_call(event.field("Linkedid"))?;
    Some(format!(
        "The call between {} and {} has ended.",
        event.field("CallerIDNum"),
        event.field("ConnectedLineNum")
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
