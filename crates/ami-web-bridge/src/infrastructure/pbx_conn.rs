//! The AMI TCP session with the PBX.
//!
//! The gateway keeps exactly one manager session open for its whole lifetime.
//! The connection is split in two and each half has exactly one owner:
//!
//! - The read half goes to a [`FrameReader`], driven by [`run_ingestion`] on
//!   the ingestion task.
//! - The write half goes to a [`CommandSender`], shared by `main` (login,
//!   logoff) and the viewer tasks (refresh).  Its mutex serialises writes so
//!   two commands never interleave on the wire.
//!
//! # Line streaming
//!
//! TCP is a *stream* protocol: one `read()` may return half a line or several
//! messages at once.  [`FrameReader`] reads whole lines through a buffered
//! reader and feeds them to [`ami_core::FrameAssembler`], which decides where
//! each message ends.

use std::sync::Arc;

use ami_core::{Command, FrameAssembler, RawMessage};
use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::{Gateway, GatewayError, Ingested};
use crate::domain::config::{AmiCredentials, AmiEndpoint};

/// A freshly opened TCP connection to the PBX manager port.
pub struct PbxConnection {
    /// Read half of the AMI stream.
    pub read_half: OwnedReadHalf,
    /// Write half of the AMI stream.
    pub write_half: OwnedWriteHalf,
}

impl PbxConnection {
    /// Opens a TCP connection to the AMI port at `ami_addr`, resolving the
    /// host name first if it is not an IP literal.
    ///
    /// # Errors
    ///
    /// Returns an error if the host name does not resolve or the connection
    /// cannot be established (PBX down, manager interface disabled, firewall).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ami_web_bridge::domain::AmiEndpoint;
    /// use ami_web_bridge::infrastructure::pbx_conn::PbxConnection;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let conn = PbxConnection::connect(&AmiEndpoint::new("pbx.local", 5038)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(ami_addr: &AmiEndpoint) -> anyhow::Result<Self> {
        let stream = TcpStream::connect((ami_addr.host.as_str(), ami_addr.port))
            .await
            .with_context(|| format!("failed to connect to AMI at {ami_addr}"))?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            read_half,
            write_half,
        })
    }

    /// Splits the connection into its frame reader and command sender.
    pub fn into_parts(
        self,
    ) -> (
        FrameReader<BufReader<OwnedReadHalf>>,
        CommandSender<OwnedWriteHalf>,
    ) {
        (
            FrameReader::new(BufReader::new(self.read_half)),
            CommandSender::new(self.write_half),
        )
    }
}

// ── Frame reader ──────────────────────────────────────────────────────────────

/// Turns a buffered byte stream into a sequence of [`RawMessage`]s.
///
/// The sequence is infinite and cannot be restarted: the only way it ends is
/// an error from [`FrameReader::next_frame`].
pub struct FrameReader<R> {
    reader: R,
    framer: FrameAssembler,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: FrameAssembler::new(),
            line: Vec::with_capacity(256),
        }
    }

    /// Reads lines until one completes a message.
    ///
    /// Lines are decoded lossily: caller-ID names are not guaranteed to be
    /// UTF-8, and one odd byte should not end the session.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UpstreamClosed`] on EOF.
    /// - [`GatewayError::Read`] if the socket read fails.
    pub async fn next_frame(&mut self) -> Result<RawMessage, GatewayError> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.line)
                .await
                .map_err(GatewayError::Read)?;
            if n == 0 {
                return Err(GatewayError::UpstreamClosed);
            }

            let line = String::from_utf8_lossy(&self.line);
            if let Some(msg) = self.framer.push_line(&line) {
                return Ok(msg);
            }
        }
    }
}

/// Runs the ingestion pipeline until the AMI stream fails.
///
/// Every framed message goes through [`Gateway::ingest`], which applies
/// events and notifies viewers.  This function only returns on a fatal
/// stream error; the caller decides whether that ends the process.
pub async fn run_ingestion<R>(
    mut frames: FrameReader<R>,
    gateway: Arc<Gateway>,
) -> Result<(), GatewayError>
where
    R: AsyncBufRead + Unpin,
{
    info!("AMI ingestion started");
    loop {
        let msg = frames.next_frame().await?;
        if let Ingested::Event { event_type, .. } = gateway.ingest(&msg) {
            debug!("state version {} after {event_type:?}", gateway.version());
        }
    }
}

// ── Command sender ────────────────────────────────────────────────────────────

/// Writes AMI commands to the PBX.
///
/// Writes are fire-and-forget: the PBX's `Response` to each command comes back
/// on the read half, where the classifier drops it.
pub struct CommandSender<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> CommandSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Writes one command and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Write`] if the write or flush fails.
    pub async fn send(&self, command: &Command) -> Result<(), GatewayError> {
        let wire = command.to_wire();
        let mut writer = self.writer.lock().await;
        let result = match writer.write_all(wire.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        result.map_err(|source| GatewayError::Write {
            action: command.action(),
            source,
        })?;
        debug!("sent AMI {:?}", command);
        Ok(())
    }

    /// Authenticates the manager session.
    pub async fn login(&self, credentials: &AmiCredentials) -> Result<(), GatewayError> {
        self.send(&Command::Login {
            username: credentials.username.clone(),
            secret: credentials.secret.clone(),
        })
        .await
    }

    /// Starts a refresh cycle and requests the endpoint listing.
    ///
    /// The staging roster is opened *before* the command goes out so that no
    /// `EndpointList` event can arrive ahead of it.  If the command cannot be
    /// written, no completion will ever arrive for it, so the refresh is
    /// withdrawn again.
    pub async fn refresh(&self, gateway: &Gateway) -> Result<(), GatewayError> {
        gateway.begin_refresh();
        let sent = self.send(&Command::ListEndpoints).await;
        if sent.is_err() {
            gateway.abandon_refresh();
        }
        sent
    }

    /// Closes the manager session.
    pub async fn logoff(&self) -> Result<(), GatewayError> {
        self.send(&Command::Logoff).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
