//! Domain layer for ami-web-bridge.
//!
//! Pure types with no dependencies on I/O, networking, or async runtimes:
//!
//! - Configuration structures
//! - The JSON snapshot shape sent to browsers
//!
//! Anything that touches a socket, a file, or the environment lives in the
//! infrastructure layer or in `main.rs`.

pub mod config;
pub mod messages;

pub use config::{AmiCredentials, AmiEndpoint, BridgeConfig};
pub use messages::StateSnapshot;
