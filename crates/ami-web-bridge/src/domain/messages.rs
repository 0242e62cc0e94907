//! JSON snapshot sent to browsers over the WebSocket.
//!
//! Every update is the full state, not a diff, so a viewer that misses
//! intermediate updates still converges on the latest state:
//!
//! ```json
//! {
//!   "totalUsers": ["101", "102"], "totalNumOfUsers": 2,
//!   "activeUsers": ["101"],       "activeNumOfUsers": 1,
//!   "activeCalls": {"1700000000.1": "100 -> 200"}, "numOfCalls": 1,
//!   "recentEvents": ["The call between 100 and 200 has started."]
//! }
//! ```

use std::collections::BTreeMap;

use ami_core::DerivedState;
use serde::{Deserialize, Serialize};

/// A point-in-time copy of [`DerivedState`] in the browser's wire shape.
///
/// The count fields are computed from the containers when the snapshot is
/// taken, so they always match the lengths of the lists next to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub total_users: Vec<String>,
    pub total_num_of_users: usize,
    pub active_users: Vec<String>,
    pub active_num_of_users: usize,
    pub active_calls: BTreeMap<String, String>,
    pub num_of_calls: usize,
    pub recent_events: Vec<String>,
}

impl From<&DerivedState> for StateSnapshot {
    fn from(state: &DerivedState) -> Self {
        Self {
            total_users: state.total_endpoints().to_vec(),
            total_num_of_users: state.total_count(),
            active_users: state.active_endpoints().to_vec(),
            active_num_of_users: state.active_count(),
            active_calls: state.active_calls().clone(),
            num_of_calls: state.call_count(),
            recent_events: state.recent_events().to_vec(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
