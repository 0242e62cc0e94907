//! ami-web-bridge library crate.
//!
//! Keeps one Asterisk Manager Interface session open, folds its event stream
//! into live telephony state, and pushes that state to browsers over
//! WebSocket.
//!
//! # Architecture
//!
//! ```text
//! Asterisk (AMI text over TCP, port 5038)
//!         ↓ events          ↑ Login / PJSIPShowEndpoints
//! [ami-web-bridge]
//!   ├── domain/           Pure types: BridgeConfig, StateSnapshot
//!   ├── application/      Gateway: shared state, ingestion, change notification
//!   └── infrastructure/
//!         ├── pbx_conn/    AMI TCP session: frame reader + command sender
//!         ├── ws_server/   WebSocket accept loop, one delivery task per viewer
//!         └── config_file/ Optional TOML configuration
//!         ↓ JSON snapshots
//! Browsers
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `ami-core`; it uses tokio only for
//!   its `watch` channel.
//! - `infrastructure` depends on all other layers plus tokio and tungstenite.

/// Domain layer: configuration and snapshot types (no I/O).
pub mod domain;

/// Application layer: the gateway that owns the derived state.
pub mod application;

/// Infrastructure layer: AMI connection, WebSocket server, config file.
pub mod infrastructure;
