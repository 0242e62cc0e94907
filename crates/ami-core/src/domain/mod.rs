//! Domain module: the derived telephony state and the rules that update it.
//!
//! Nothing here performs I/O.  The state is plain data; synchronising access
//! to it is the caller's job (the web bridge wraps it in a lock).

pub mod aggregator;
pub mod state;

pub use aggregator::{apply_event, endpoint_id, EventKind};
pub use state::{DerivedState, RecentEvents, RECENT_EVENTS_CAPACITY};
