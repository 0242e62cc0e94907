//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is assembled in `main.rs` from CLI arguments, environment variables and
//! an optional TOML file; the domain layer never reads any of those itself.

use std::fmt;
use std::net::SocketAddr;

/// Default WebSocket listener port.
pub const DEFAULT_WS_PORT: u16 = 3333;

/// Default AMI port (`manager.conf` `port =`).
pub const DEFAULT_AMI_PORT: u16 = 5038;

/// AMI manager account used for the `Login` command.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AmiCredentials {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for AmiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmiCredentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Where the PBX manager interface listens.
///
/// The host may be an IP literal or a hostname; names are resolved when the
/// connection is opened, not when the configuration is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmiEndpoint {
    pub host: String,
    pub port: u16,
}

impl AmiEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for AmiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals need brackets to keep the port unambiguous.
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// All runtime configuration for the gateway.
///
/// # Example
///
/// ```rust
/// use ami_web_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 3333);
/// assert_eq!(cfg.ami_addr.port, 5038);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket server binds to.
    pub ws_bind_addr: SocketAddr,

    /// The host and port of the PBX manager interface.
    pub ami_addr: AmiEndpoint,

    /// Manager account for the session.
    pub credentials: AmiCredentials,
}

impl Default for BridgeConfig {
    /// Local-development defaults: listen on every interface, talk to a PBX
    /// on the same host, empty credentials.
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            ami_addr: AmiEndpoint::new("127.0.0.1", DEFAULT_AMI_PORT),
            credentials: AmiCredentials::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
