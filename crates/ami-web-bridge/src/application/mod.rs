//! Application layer for ami-web-bridge.
//!
//! The application layer knows *what* happens to an AMI message once it has
//! been framed; the infrastructure layer decides *how* bytes get in and out.
//!
//! # Responsibilities
//!
//! - Owning the shared [`ami_core::DerivedState`] and its lock
//! - Classifying, parsing and applying framed messages
//! - Notifying viewers that a newer snapshot is available
//! - Defining the `GatewayError` type for upstream session failures
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Serializing snapshots onto a WebSocket (also infrastructure)

pub mod gateway_service;

pub use gateway_service::{Gateway, GatewayError, Ingested};
