//! The derived telephony state the gateway keeps in memory.
//!
//! [`DerivedState`] is the one long-lived piece of mutable state in the
//! gateway.  It is built up purely from AMI events and can always be rebuilt
//! from scratch by a refresh cycle, so nothing here is persisted.
//!
//! Counts (`total_count`, `active_count`, `call_count`) are derived from the
//! container lengths on every call.  They are never stored, so they cannot
//! drift from the containers they describe.
//!
//! # Refresh cycles
//!
//! A refresh re-lists every endpoint.  Instead of clearing the live roster and
//! refilling it as `EndpointList` events trickle in, [`DerivedState::begin_refresh`]
//! opens a private staging roster; listing events fill that roster, and
//! [`DerivedState::complete_refresh`] swaps it in as a single mutation.  A
//! reader holding the state lock therefore sees either the old roster or the
//! new one, never a half-listed one.
//!
//! Listings can overlap: a second viewer may connect while the first listing
//! is still arriving.  Each `begin_refresh` counts one outstanding listing and
//! reuses the roster already being staged, and only the completion of the
//! last outstanding listing swaps it in.

use std::collections::{BTreeMap, VecDeque};

/// Maximum number of entries kept in [`RecentEvents`].
pub const RECENT_EVENTS_CAPACITY: usize = 10;

/// A fixed-capacity FIFO log of human-readable event descriptions.
///
/// Pushing onto a full log evicts the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEvents {
    entries: VecDeque<String>,
}

impl Default for RecentEvents {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(RECENT_EVENTS_CAPACITY),
        }
    }
}

impl RecentEvents {
    /// Appends `line`, evicting the oldest entry if the log is full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.entries.len() == RECENT_EVENTS_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the log out, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// The known endpoints and the reachable subset of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EndpointRoster {
    total: Vec<String>,
    active: Vec<String>,
}

impl EndpointRoster {
    fn record(&mut self, endpoint: &str, available: bool) {
        push_unique(&mut self.total, endpoint);
        if available {
            push_unique(&mut self.active, endpoint);
        }
    }

    fn activate(&mut self, endpoint: &str) -> bool {
        push_unique(&mut self.active, endpoint)
    }

    fn deactivate(&mut self, endpoint: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|e| e != endpoint);
        self.active.len() != before
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) -> bool {
    if list.iter().any(|e| e == item) {
        return false;
    }
    list.push(item.to_string());
    true
}

/// All state derived from the AMI event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedState {
    roster: EndpointRoster,
    /// Linkage id → `"A -> B"`.
    active_calls: BTreeMap<String, String>,
    recent_events: RecentEvents,
    /// Roster being rebuilt by an in-flight refresh cycle.
    staged: Option<EndpointRoster>,
    /// Listings requested but not yet completed.  Zero iff `staged` is `None`.
    pending_listings: usize,
}

impl DerivedState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Readers ───────────────────────────────────────────────────────────────

    /// Every endpoint known to the PBX, in listing order.
    pub fn total_endpoints(&self) -> &[String] {
        &self.roster.total
    }

    /// Endpoints currently reachable.
    pub fn active_endpoints(&self) -> &[String] {
        &self.roster.active
    }

    /// Connected calls keyed by linkage id.
    pub fn active_calls(&self) -> &BTreeMap<String, String> {
        &self.active_calls
    }

    pub fn recent_events(&self) -> &RecentEvents {
        &self.recent_events
    }

    pub fn total_count(&self) -> usize {
        self.roster.total.len()
    }

    pub fn active_count(&self) -> usize {
        self.roster.active.len()
    }

    pub fn call_count(&self) -> usize {
        self.active_calls.len()
    }

    /// Returns `true` while a refresh cycle is staging a new roster.
    pub fn is_refreshing(&self) -> bool {
        self.staged.is_some()
    }

    // ── Endpoint mutations ────────────────────────────────────────────────────

    /// Marks `endpoint` reachable.  Returns `false` if it already was.
    ///
    /// During a refresh the staged roster is updated too, so a registration
    /// that races the listing is not lost when the roster is swapped in.
    pub fn activate_endpoint(&mut self, endpoint: &str) -> bool {
        if let Some(staged) = self.staged.as_mut() {
            staged.activate(endpoint);
        }
        self.roster.activate(endpoint)
    }

    /// Marks `endpoint` unreachable.  Returns `false` if it was not active.
    pub fn deactivate_endpoint(&mut self, endpoint: &str) -> bool {
        if let Some(staged) = self.staged.as_mut() {
            staged.deactivate(endpoint);
        }
        self.roster.deactivate(endpoint)
    }

    /// Records one endpoint from a listing.  It always joins the total list;
    /// it joins the active list only when `available` is set.
    ///
    /// Goes to the staged roster while a refresh is in flight, otherwise
    /// straight to the live one.
    pub fn record_endpoint(&mut self, endpoint: &str, available: bool) {
        match self.staged.as_mut() {
            Some(staged) => staged.record(endpoint, available),
            None => self.roster.record(endpoint, available),
        }
    }

    /// Starts a refresh cycle for one more listing.
    ///
    /// The first call opens an empty staging roster.  A call while a refresh
    /// is already in flight keeps what has been staged so far; the endpoints
    /// listed again by the new listing are deduplicated into it.
    pub fn begin_refresh(&mut self) {
        self.staged.get_or_insert_with(EndpointRoster::default);
        self.pending_listings += 1;
    }

    /// Marks one listing complete.  Returns `true` if it was the last
    /// outstanding one and the staged roster was swapped in.
    ///
    /// With no refresh in flight nothing changes.
    pub fn complete_refresh(&mut self) -> bool {
        if self.pending_listings == 0 {
            return false;
        }
        self.pending_listings -= 1;
        if self.pending_listings > 0 {
            return false;
        }
        match self.staged.take() {
            Some(staged) => {
                self.roster = staged;
                true
            }
            None => false,
        }
    }

    /// Withdraws one listing that will never complete (its command could not
    /// be sent).  When no listing remains outstanding the staged roster is
    /// discarded and the live roster stays as it was.
    pub fn abandon_refresh(&mut self) {
        self.pending_listings = self.pending_listings.saturating_sub(1);
        if self.pending_listings == 0 {
            self.staged = None;
        }
    }

    /// Number of listings requested but not yet completed.
    pub fn pending_listings(&self) -> usize {
        self.pending_listings
    }

    // ── Call mutations ────────────────────────────────────────────────────────

    /// Records a connected call.  A second start for the same linkage id
    /// replaces the description.
    pub fn start_call(&mut self, linkage_id: &str, description: String) {
        self.active_calls.insert(linkage_id.to_string(), description);
    }

    /// Removes a call, returning its description if it was active.
    pub fn end_call(&mut self, linkage_id: &str) -> Option<String> {
        self.active_calls.remove(linkage_id)
    }

    // ── Log ───────────────────────────────────────────────────────────────────

    pub fn log(&mut self, line: impl Into<String>) {
        self.recent_events.push(line);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
