//! Outbound AMI commands.
//!
//! Every command is a block of `Key: Value` lines closed by a blank line, the
//! same framing the PBX uses for its own messages.  The gateway only ever sends
//! three commands, so they are modelled as a closed enum rather than a generic
//! header builder.

use std::fmt;

use super::LINE_TERMINATOR;

/// A command the gateway sends to the PBX.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate the manager session.
    Login {
        /// AMI manager user name (from `manager.conf`).
        username: String,
        /// AMI manager secret.
        secret: String,
    },
    /// List every PJSIP endpoint.  The PBX answers with a `Response`, one
    /// `EndpointList` event per endpoint, and a closing
    /// `EndpointListComplete` event.
    ListEndpoints,
    /// Close the manager session cleanly.
    Logoff,
}

impl Command {
    /// Returns the `Action` header value for this command.
    pub fn action(&self) -> &'static str {
        match self {
            Command::Login { .. } => "Login",
            Command::ListEndpoints => "PJSIPShowEndpoints",
            Command::Logoff => "Logoff",
        }
    }

    /// Formats the command exactly as it goes on the wire, including the
    /// terminating blank line.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ami_core::protocol::Command;
    ///
    /// assert_eq!(Command::ListEndpoints.to_wire(), "Action: PJSIPShowEndpoints\r\n\r\n");
    /// ```
    pub fn to_wire(&self) -> String {
        match self {
            Command::Login { username, secret } => format!(
                "Action: Login{eol}Username: {username}{eol}Secret: {secret}{eol}{eol}",
                eol = LINE_TERMINATOR
            ),
            Command::ListEndpoints | Command::Logoff => {
                format!("Action: {}{eol}{eol}", self.action(), eol = LINE_TERMINATOR)
            }
        }
    }
}

// Hand-written so the login secret never ends up in a log line.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("secret", &"<redacted>")
                .finish(),
            Command::ListEndpoints => f.write_str("ListEndpoints"),
            Command::Logoff => f.write_str("Logoff"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
