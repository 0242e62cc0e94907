//! Infrastructure layer for ami-web-bridge.
//!
//! The infrastructure layer handles all I/O: the TCP session with the PBX,
//! the WebSocket listener for browsers, and the optional configuration file.
//!
//! # Responsibilities
//!
//! - Opening the AMI TCP connection and splitting it into a reader and a writer
//! - Reading CRLF lines and assembling them into framed messages
//! - Writing `Login`, `PJSIPShowEndpoints` and `Logoff` commands
//! - Binding the WebSocket listener and spawning one task per viewer
//! - Loading `ami-web-bridge.toml`
//!
//! # What does NOT belong here?
//!
//! - Field parsing and state transitions (that is `ami-core`)
//! - Locking and change notification (that is the application layer)
//! - Precedence between CLI, environment and file (that is done in `main.rs`)

pub mod config_file;
pub mod pbx_conn;
pub mod ws_server;

pub use pbx_conn::{run_ingestion, CommandSender, FrameReader, PbxConnection};
pub use ws_server::run_server;
