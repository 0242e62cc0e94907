//! WebSocket server: accept loop and per-viewer delivery tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from browsers.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Asking the PBX for a fresh endpoint listing for the new viewer.
//! 5. Pushing a full [`StateSnapshot`] to the viewer on connect and again
//!    whenever the gateway's state version moves.
//! 6. Ending the session when the browser closes it or a write fails.
//! 7. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Isolation
//!
//! Each viewer runs in its own Tokio task with its own `watch::Receiver`.  A
//! slow viewer only delays itself: the ingestion task publishes without
//! waiting, and a failed viewer task ends without touching the gateway or the
//! other viewers.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::Gateway;
use crate::domain::config::BridgeConfig;
use crate::infrastructure::pbx_conn::CommandSender;

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener and serves viewers until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).
pub async fn run_server<W>(
    config: &BridgeConfig,
    gateway: Arc<Gateway>,
    commands: Arc<CommandSender<W>>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("WebSocket server listening on {}", config.ws_bind_addr);
    serve(listener, gateway, commands, running).await;
    Ok(())
}

/// Runs the accept loop on an already-bound listener.
///
/// Each accepted connection is handed to its own task, so one slow handshake
/// never delays the next accept.
pub async fn serve<W>(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    commands: Arc<CommandSender<W>>,
    running: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short accept timeout so the loop notices the shutdown flag even
        // when nobody is connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new viewer connection from {peer_addr}");
                let gateway = Arc::clone(&gateway);
                let commands = Arc::clone(&commands);
                tokio::spawn(async move {
                    handle_viewer_session(stream, peer_addr, gateway, commands).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. too many open files); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

// ── Per-viewer handler ────────────────────────────────────────────────────────

async fn handle_viewer_session<W>(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    gateway: Arc<Gateway>,
    commands: Arc<CommandSender<W>>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let session_id = Uuid::new_v4();
    match run_viewer_session(raw_stream, peer_addr, session_id, gateway, commands).await {
        Ok(()) => info!("viewer session {session_id} ({peer_addr}) closed"),
        Err(e) => warn!("viewer session {session_id} ({peer_addr}) closed with error: {e:#}"),
    }
}

/// Runs one viewer session from handshake to disconnect.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails.  Transport failures
/// after the handshake end the session normally; they are expected whenever a
/// browser tab closes.
async fn run_viewer_session<W>(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    session_id: Uuid,
    gateway: Arc<Gateway>,
    commands: Arc<CommandSender<W>>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    info!("viewer session {session_id} established with {peer_addr}");

    // Subscribe before anything can change so no update slips between the
    // first snapshot and the first wait.
    let mut updates = gateway.subscribe();

    // A new viewer gets a freshly listed roster.  A failed write here means
    // the AMI session is gone; the ingestion task reports that, so the viewer
    // keeps receiving whatever state there is.
    if let Err(e) = commands.refresh(&gateway).await {
        warn!("session {session_id}: endpoint refresh failed: {e}");
    }

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let version = *updates.borrow_and_update();
    debug!("session {session_id}: sending initial snapshot (version {version})");
    if !send_snapshot(&mut ws_tx, &gateway, session_id).await {
        return Ok(());
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    debug!("session {session_id}: gateway dropped; closing");
                    break;
                }
                let version = *updates.borrow_and_update();
                debug!("session {session_id}: state version {version}");
                if !send_snapshot(&mut ws_tx, &gateway, session_id).await {
                    break;
                }
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("session {session_id}: browser closed the WebSocket");
                    break;
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    // tokio-tungstenite queues the Pong; it goes out with the next write.
                    debug!("session {session_id}: WebSocket ping ({} bytes)", data.len());
                }
                Some(Ok(_)) => {
                    // Viewers only listen; anything they send is ignored.
                    debug!("session {session_id}: ignoring inbound frame");
                }
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("session {session_id}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("session {session_id}: WebSocket read error: {e}");
                    break;
                }
            },
        }
    }

    Ok(())
}

/// Serializes the current state and sends it as one text frame.
///
/// Returns `false` if the viewer is gone and the session should end.
async fn send_snapshot<S>(ws_tx: &mut S, gateway: &Gateway, session_id: Uuid) -> bool
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let json = match serde_json::to_string(&gateway.snapshot()) {
        Ok(json) => json,
        Err(e) => {
            // A snapshot is plain strings and integers; this cannot really
            // fail, but a bad frame is no reason to drop the viewer.
            error!("session {session_id}: snapshot serialization error: {e}");
            return true;
        }
    };

    match ws_tx.send(WsMessage::Text(json)).await {
        Ok(()) => true,
        Err(e) => {
            debug!("session {session_id}: WebSocket send failed (viewer disconnected): {e}");
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
