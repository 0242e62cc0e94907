//! The gateway: shared derived state plus change notification.
//!
//! [`Gateway`] is the one object every task shares (behind an `Arc`):
//!
//! - The **ingestion task** hands it each framed AMI message via
//!   [`Gateway::ingest`].  The gateway classifies, parses and applies the
//!   message under a write lock, releases the lock, then bumps a version
//!   counter on a `watch` channel.
//! - Each **viewer task** holds its own `watch::Receiver` from
//!   [`Gateway::subscribe`].  When the version moves it takes a
//!   [`StateSnapshot`] under a read lock and sends it.
//!
//! # Why a `watch` channel?
//!
//! A `watch` channel stores only the latest value and tracks "seen" per
//! receiver.  That gives exactly the delivery semantics the gateway needs:
//!
//! - Publishing never blocks and never fails, even with zero viewers, so a
//!   slow or stuck browser can never stall ingestion.
//! - Several updates between two reads collapse into one wake-up; the viewer
//!   then reads the latest state.
//! - Every viewer is woken independently, so two viewers never compete for a
//!   single notification slot.
//!
//! # Locking
//!
//! The state sits in a `std::sync::RwLock`.  Guards are never held across an
//! `.await`, and a whole event is applied under one write guard, so a reader
//! sees zero or more complete events, never half of one.

use std::io;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ami_core::{apply_event, classify, parse_event, Classified, DerivedState, RawMessage};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::messages::StateSnapshot;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures of the upstream AMI session.
///
/// All of these are fatal to the ingestion task: without the stream, no
/// further state updates are possible.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The PBX closed the TCP connection.
    #[error("AMI connection closed by the PBX")]
    UpstreamClosed,

    /// Reading from the AMI connection failed.
    #[error("failed to read from AMI connection: {0}")]
    Read(#[source] io::Error),

    /// Writing a command to the AMI connection failed.
    #[error("failed to send AMI {action} command: {source}")]
    Write {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

// ── Ingestion outcome ─────────────────────────────────────────────────────────

/// What [`Gateway::ingest`] did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// A command response; dropped without touching the state.
    Response,
    /// An event that was applied to the state.
    Event {
        /// The event's `Event` field (empty for an empty message).
        event_type: String,
        /// The line appended to the recent-events log, if any.
        log_line: Option<String>,
    },
}

// ── Gateway ───────────────────────────────────────────────────────────────────

/// Owner of the derived state and its change notifications.
#[derive(Debug)]
pub struct Gateway {
    state: RwLock<DerivedState>,
    version: watch::Sender<u64>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Creates a gateway with empty state at version 0.
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(DerivedState::new()),
            version,
        }
    }

    /// Returns a receiver that observes every version bump after this call.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// The current state version.  Increases by one per applied event.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Takes a consistent snapshot of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&*self.read())
    }

    /// Classifies, parses and applies one framed message, then notifies
    /// viewers if it was an event.
    ///
    /// Parse anomalies are logged and never returned as errors: a malformed
    /// event is applied as far as its complete fields allow.
    pub fn ingest(&self, msg: &RawMessage) -> Ingested {
        let text = match classify(msg) {
            Classified::Response(_) => {
                debug!("dropping AMI response ({} lines)", msg.lines().len());
                return Ingested::Response;
            }
            Classified::Event(text) => text,
        };

        let event = parse_event(&text);
        if let Err(e) = event.check_paired() {
            warn!("AMI event {:?} looks malformed: {e}", event.event_type());
        }

        let log_line = apply_event(&mut self.write(), &event);
        self.publish();

        debug!("applied AMI event {:?}", event.event_type());
        if let Some(line) = &log_line {
            info!("{line}");
        }

        Ingested::Event {
            event_type: event.event_type().to_string(),
            log_line,
        }
    }

    /// Opens a refresh cycle, or joins the one in flight.  The live roster
    /// stays visible until the last outstanding listing's
    /// `EndpointListComplete` event swaps the new one in.
    pub fn begin_refresh(&self) {
        self.write().begin_refresh();
        debug!("endpoint refresh started");
    }

    /// Withdraws a refresh whose listing command never reached the PBX.
    pub fn abandon_refresh(&self) {
        self.write().abandon_refresh();
        debug!("endpoint refresh abandoned");
    }

    /// Signals that the state changed.  Never blocks.
    fn publish(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    // Poisoning only means a thread panicked while holding the guard; every
    // mutation completes before the guard drops, so the state is still whole.
    fn read(&self) -> RwLockReadGuard<'_, DerivedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DerivedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
