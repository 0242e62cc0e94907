//! AMI live-state gateway: entry point.
//!
//! This binary keeps one Asterisk Manager Interface session open, folds the
//! event stream into live telephony state (registered extensions, active
//! calls, recent activity), and pushes a JSON snapshot of that state to every
//! connected browser over WebSocket.
//!
//! # Usage
//!
//! ```text
//! ami-web-bridge [OPTIONS]
//!
//! Options:
//!   --ws-bind  <IP>     WebSocket bind address      [default: 0.0.0.0]
//!   --ws-port  <PORT>   WebSocket listener port     [default: 3333]
//!   --ami-host <HOST>   PBX host name or IP         [default: 127.0.0.1]
//!   --ami-port <PORT>   AMI port                    [default: 5038]
//!   --username <NAME>   AMI manager account         (required)
//!   --secret   <SECRET> AMI manager secret          (required)
//!   --config   <PATH>   Optional TOML config file
//! ```
//!
//! # Configuration precedence
//!
//! Each setting is taken from the first source that provides it:
//!
//! 1. Command-line argument
//! 2. Environment variable
//! 3. `--config` file
//! 4. Built-in default
//!
//! | Variable       | Default     | Description                 |
//! |----------------|-------------|-----------------------------|
//! | `AMI_WS_BIND`  | `0.0.0.0`   | WebSocket bind address      |
//! | `AMI_WS_PORT`  | `3333`      | WebSocket listener port     |
//! | `AMI_HOST`     | `127.0.0.1` | PBX host name or IP         |
//! | `AMI_PORT`     | `5038`      | AMI port                    |
//! | `AMI_USERNAME` |             | AMI manager account         |
//! | `AMI_SECRET`   |             | AMI manager secret          |
//! | `AMI_CONFIG`   |             | Path to the TOML file       |
//!
//! # Lifetime
//!
//! The process runs until Ctrl+C or until the AMI stream ends.  Losing the
//! PBX is fatal: there is no reconnect, and the exit status is non-zero so a
//! supervisor can restart the gateway.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ami_web_bridge::application::Gateway;
use ami_web_bridge::domain::config::{DEFAULT_AMI_PORT, DEFAULT_WS_PORT};
use ami_web_bridge::domain::{AmiCredentials, AmiEndpoint, BridgeConfig};
use ami_web_bridge::infrastructure::config_file::FileConfig;
use ami_web_bridge::infrastructure::{run_ingestion, run_server, PbxConnection};

const DEFAULT_WS_BIND: &str = "0.0.0.0";
const DEFAULT_AMI_HOST: &str = "127.0.0.1";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Live Asterisk telephony state for browser dashboards.
///
/// Every option is optional on the command line so that the environment and
/// the config file can fill in what is left out.
#[derive(Debug, Default, Parser)]
#[command(
    name = "ami-web-bridge",
    about = "Pushes live Asterisk Manager Interface state to browsers over WebSocket",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket server to.
    #[arg(long, env = "AMI_WS_BIND")]
    ws_bind: Option<String>,

    /// TCP port for the WebSocket server (browsers connect to ws://host:PORT).
    #[arg(long, env = "AMI_WS_PORT")]
    ws_port: Option<u16>,

    /// Host name or IP address of the PBX running the manager interface.
    #[arg(long, env = "AMI_HOST")]
    ami_host: Option<String>,

    /// AMI TCP port (`port =` in `manager.conf`).
    #[arg(long, env = "AMI_PORT")]
    ami_port: Option<u16>,

    /// AMI manager account name.
    #[arg(long, env = "AMI_USERNAME")]
    username: Option<String>,

    /// AMI manager secret.
    #[arg(long, env = "AMI_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Path to a TOML config file with `[ami]` and `[server]` sections.
    #[arg(long, env = "AMI_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges the parsed arguments with the optional file into a
    /// [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not a valid IP, if the AMI
    /// host is empty or contains whitespace, or if no source provides the AMI
    /// username or secret.
    fn into_bridge_config(self, file: Option<FileConfig>) -> anyhow::Result<BridgeConfig> {
        let file = file.unwrap_or_default();

        let ws_bind = self
            .ws_bind
            .or(file.server.bind)
            .unwrap_or_else(|| DEFAULT_WS_BIND.to_string());
        let ws_port = self.ws_port.or(file.server.port).unwrap_or(DEFAULT_WS_PORT);
        let ami_host = self
            .ami_host
            .or(file.ami.host)
            .unwrap_or_else(|| DEFAULT_AMI_HOST.to_string());
        let ami_port = self.ami_port.or(file.ami.port).unwrap_or(DEFAULT_AMI_PORT);

        let ws_ip: IpAddr = ws_bind
            .parse()
            .with_context(|| format!("invalid WebSocket bind address: '{ws_bind}'"))?;
        let ami_host = ami_host.trim().to_string();
        if ami_host.is_empty() || ami_host.contains(char::is_whitespace) {
            bail!("invalid AMI host: '{ami_host}'");
        }

        let Some(username) = self.username.or(file.ami.username) else {
            bail!("no AMI username given (use --username, AMI_USERNAME, or [ami] username)");
        };
        let Some(secret) = self.secret.or(file.ami.secret) else {
            bail!("no AMI secret given (use --secret, AMI_SECRET, or [ami] secret)");
        };

        Ok(BridgeConfig {
            ws_bind_addr: SocketAddr::new(ws_ip, ws_port),
            ami_addr: AmiEndpoint::new(ami_host, ami_port),
            credentials: AmiCredentials { username, secret },
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; `RUST_LOG` controls the level.
/// 2. CLI arguments are parsed, the config file is loaded if named, and the
///    two are merged into a [`BridgeConfig`].
/// 3. The AMI connection is opened.  Failure here ends the process.
/// 4. `Login` is sent and the ingestion task is spawned.
/// 5. A Ctrl+C handler is spawned; it sends `Logoff` and clears the shared
///    `running` flag.
/// 6. The WebSocket server runs until the flag is cleared or ingestion fails,
///    whichever comes first.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => Some(
            FileConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
        ),
        None => None,
    };
    let config = cli.into_bridge_config(file)?;

    info!(
        "AMI gateway starting: ws={}, ami={}, user={}",
        config.ws_bind_addr, config.ami_addr, config.credentials.username
    );

    // ── AMI session ───────────────────────────────────────────────────────────
    let (frames, commands) = PbxConnection::connect(&config.ami_addr).await?.into_parts();
    let commands = Arc::new(commands);
    commands
        .login(&config.credentials)
        .await
        .context("failed to send AMI login")?;

    let gateway = Arc::new(Gateway::new());
    let mut ingestion = tokio::spawn(run_ingestion(frames, Arc::clone(&gateway)));

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    let logoff_commands = Arc::clone(&commands);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                if let Err(e) = logoff_commands.logoff().await {
                    warn!("failed to send AMI logoff: {e}");
                }
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    //
    // Whichever side finishes first ends the process.  Dropping the handle of
    // a finished server does not stop ingestion, so it is aborted explicitly.
    let outcome = tokio::select! {
        served = run_server(&config, Arc::clone(&gateway), commands, running) => {
            ingestion.abort();
            served
        }
        ingested = &mut ingestion => match ingested {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("AMI session ended")),
            Err(e) => Err(anyhow::Error::new(e).context("AMI ingestion task failed")),
        },
    };

    match &outcome {
        Ok(()) => info!("AMI gateway stopped"),
        Err(e) => error!("AMI gateway stopped: {e:#}"),
    }
    outcome
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn with_credentials() -> Cli {
        Cli {
            username: Some("amina".to_string()),
            secret: Some("1234".to_string()),
            ..Cli::default()
        }
    }

    #[test]
    fn test_cli_ws_port_override() {
        // Arrange: override --ws-port
        let cli = Cli::parse_from(["ami-web-bridge", "--ws-port", "9999"]);

        // Assert
        assert_eq!(cli.ws_port, Some(9999));
    }

    #[test]
    fn test_cli_ami_host_and_port_override() {
        let cli = Cli::parse_from([
            "ami-web-bridge",
            "--ami-host",
            "10.0.0.5",
            "--ami-port",
            "5039",
        ]);
        assert_eq!(cli.ami_host.as_deref(), Some("10.0.0.5"));
        assert_eq!(cli.ami_port, Some(5039));
    }

    #[test]
    fn test_cli_credentials_override() {
        let cli = Cli::parse_from(["ami-web-bridge", "--username", "amina", "--secret", "1234"]);
        assert_eq!(cli.username.as_deref(), Some("amina"));
        assert_eq!(cli.secret.as_deref(), Some("1234"));
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["ami-web-bridge", "--config", "/etc/ami.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ami.toml")));
    }

    #[test]
    fn test_into_bridge_config_defaults() {
        // Arrange: only credentials given
        let cli = with_credentials();

        // Act
        let config = cli.into_bridge_config(None).unwrap();

        // Assert
        assert_eq!(config.ws_bind_addr.to_string(), "0.0.0.0:3333");
        assert_eq!(config.ami_addr.to_string(), "127.0.0.1:5038");
        assert_eq!(config.credentials.username, "amina");
        assert_eq!(config.credentials.secret, "1234");
    }

    #[test]
    fn test_into_bridge_config_custom_addresses() {
        let cli = Cli {
            ws_bind: Some("127.0.0.1".to_string()),
            ws_port: Some(8080),
            ami_host: Some("192.168.1.100".to_string()),
            ami_port: Some(5039),
            ..with_credentials()
        };
        let config = cli.into_bridge_config(None).unwrap();
        assert_eq!(config.ws_bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.ami_addr.to_string(), "192.168.1.100:5039");
    }

    #[test]
    fn test_into_bridge_config_missing_username_returns_error() {
        let cli = Cli {
            secret: Some("1234".to_string()),
            ..Cli::default()
        };
        assert!(cli.into_bridge_config(None).is_err());
    }

    #[test]
    fn test_into_bridge_config_missing_secret_returns_error() {
        let cli = Cli {
            username: Some("amina".to_string()),
            ..Cli::default()
        };
        assert!(cli.into_bridge_config(None).is_err());
    }

    #[test]
    fn test_into_bridge_config_invalid_ws_bind_returns_error() {
        // Arrange: provide an invalid IP address string
        let cli = Cli {
            ws_bind: Some("not.an.ip".to_string()),
            ..with_credentials()
        };

        // Act
        let result = cli.into_bridge_config(None);

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }

    #[test]
    fn test_into_bridge_config_invalid_ami_host_returns_error() {
        let cli = Cli {
            ami_host: Some("pbx.invalid host".to_string()),
            ..with_credentials()
        };
        assert!(cli.into_bridge_config(None).is_err());
    }

    #[test]
    fn test_into_bridge_config_accepts_ami_host_name() {
        let cli = Cli {
            ami_host: Some("pbx.local".to_string()),
            ..with_credentials()
        };
        let config = cli.into_bridge_config(None).unwrap();
        assert_eq!(config.ami_addr, AmiEndpoint::new("pbx.local", 5038));
        assert_eq!(config.ami_addr.to_string(), "pbx.local:5038");
    }

    #[test]
    fn test_into_bridge_config_empty_ami_host_returns_error() {
        let cli = Cli {
            ami_host: Some("  ".to_string()),
            ..with_credentials()
        };
        assert!(cli.into_bridge_config(None).is_err());
    }

    #[test]
    fn test_file_fills_in_what_cli_leaves_out() {
        // Arrange: credentials and AMI address only in the file
        let file = FileConfig::from_toml_str(
            "[ami]\nhost = \"10.0.0.20\"\nusername = \"dash\"\nsecret = \"s\"\n\n[server]\nport = 4000\n",
        )
        .unwrap();

        // Act
        let config = Cli::default().into_bridge_config(Some(file)).unwrap();

        // Assert
        assert_eq!(config.ami_addr.to_string(), "10.0.0.20:5038");
        assert_eq!(config.ws_bind_addr.port(), 4000);
        assert_eq!(config.credentials.username, "dash");
    }

    #[test]
    fn test_cli_wins_over_file() {
        let file = FileConfig::from_toml_str(
            "[ami]\nusername = \"from-file\"\nsecret = \"s\"\n\n[server]\nport = 4000\n",
        )
        .unwrap();
        let cli = Cli {
            ws_port: Some(5000),
            username: Some("from-cli".to_string()),
            ..Cli::default()
        };

        let config = cli.into_bridge_config(Some(file)).unwrap();

        assert_eq!(config.ws_bind_addr.port(), 5000);
        assert_eq!(config.credentials.username, "from-cli");
        assert_eq!(config.credentials.secret, "s");
    }
}
