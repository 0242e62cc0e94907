//! Optional TOML configuration file.
//!
//! The file is only read when `--config` (or `AMI_CONFIG`) names it.  Every
//! key is optional: a value left out here falls back to the built-in default
//! in `main.rs`, and a value given on the command line or in the environment
//! wins over the file.
//!
//! # Example `ami-web-bridge.toml`
//!
//! ```toml
//! [ami]
//! host = "10.0.0.20"
//! port = 5038
//! username = "dashboard"
//! secret = "s3cret"
//!
//! [server]
//! bind = "0.0.0.0"
//! port = 3333
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has an unknown key.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub ami: AmiSection,
    pub server: ServerSection,
}

/// `[ami]`: where the PBX manager interface is and how to log in.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmiSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub secret: Option<String>,
}

impl std::fmt::Debug for AmiSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmiSection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `[server]`: where browsers connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is malformed or contains a
    /// key this schema does not know.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// Unlike a settings store, a missing file is an error here: the operator
    /// asked for this file explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, and
    /// [`ConfigError::Parse`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_empty_file_leaves_everything_unset() {
        let cfg = FileConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn test_full_file_is_parsed() {
        // Arrange
        let toml = r#"
            [ami]
            host = "10.0.0.20"
            port = 5039
            username = "dashboard"
            secret = "s3cret"

            [server]
            bind = "127.0.0.1"
            port = 8080
        "#;

        // Act
        let cfg = FileConfig::from_toml_str(toml).unwrap();

        // Assert
        assert_eq!(cfg.ami.host.as_deref(), Some("10.0.0.20"));
        assert_eq!(cfg.ami.port, Some(5039));
        assert_eq!(cfg.ami.username.as_deref(), Some("dashboard"));
        assert_eq!(cfg.ami.secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.server.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(cfg.server.port, Some(8080));
    }

    #[test]
    fn test_partial_section_leaves_other_keys_unset() {
        let cfg = FileConfig::from_toml_str("[ami]\nusername = \"amina\"\n").unwrap();
        assert_eq!(cfg.ami.username.as_deref(), Some("amina"));
        assert!(cfg.ami.secret.is_none());
        assert_eq!(cfg.server, ServerSection::default());
    }

    #[test]
    fn test_unknown_key_returns_parse_error() {
        let result = FileConfig::from_toml_str("[ami]\npasword = \"typo\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result = FileConfig::from_toml_str("[ami\nhost = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cfg = FileConfig::from_toml_str("[ami]\nsecret = \"1234\"\n").unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("1234"));
        assert!(debug.contains("<redacted>"));
    }

    // ── load from temp directory ─────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_returns_io_error() {
        let path = std::env::temp_dir().join(format!("ami_missing_{}.toml", Uuid::new_v4()));
        let result = FileConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!("ami_test_{}.toml", Uuid::new_v4()));
        std::fs::write(&path, "[server]\nport = 4444\n").unwrap();

        // Act
        let result = FileConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(result.unwrap().server.port, Some(4444));
    }
}
