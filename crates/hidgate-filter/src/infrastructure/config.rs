//! TOML configuration for the filter daemon.
//!
//! Reads `DaemonConfig` from the platform config directory
//! (`$XDG_CONFIG_HOME/hidgate/config.toml` or `~/.config/hidgate/config.toml`),
//! falling back to defaults when the file does not exist yet. Example:
//!
//! ```toml
//! [daemon]
//! socket_path = "/tmp/hidgate-control.sock"
//! log_level = "debug"
//!
//! [[keyboards]]
//! name = "kbd0"
//!
//! [[keyboards]]
//! name = "kbd1"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    /// Simulated keyboards the daemon attaches at startup.
    #[serde(default = "default_keyboards")]
    pub keyboards: Vec<KeyboardEntry>,
}

/// General daemon behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSection {
    /// Path of the Unix control socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One simulated keyboard device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyboardEntry {
    /// Name used in log output.
    pub name: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_socket_path() -> String {
    "/tmp/hidgate-control.sock".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_keyboards() -> Vec<KeyboardEntry> {
    vec![KeyboardEntry {
        name: "kbd0".to_string(),
    }]
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            log_level: default_log_level(),
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(base.join("hidgate").join("config.toml"))
}

/// Loads the daemon configuration from `path`, or from the platform config
/// file when `path` is `None`. A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: DaemonConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfig::default_with_devices()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

impl DaemonConfig {
    /// The default configuration including the default simulated keyboard.
    ///
    /// `DaemonConfig::default()` derives field-by-field and therefore leaves
    /// `keyboards` empty; first-run behaviour wants one device.
    pub fn default_with_devices() -> Self {
        Self {
            daemon: DaemonSection::default(),
            keyboards: default_keyboards(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_socket_and_level() {
        // Arrange / Act
        let cfg = DaemonConfig::default_with_devices();

        // Assert
        assert_eq!(cfg.daemon.socket_path, "/tmp/hidgate-control.sock");
        assert_eq!(cfg.daemon.log_level, "info");
        assert_eq!(cfg.keyboards.len(), 1);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = DaemonConfig::default_with_devices();
        cfg.daemon.log_level = "debug".to_string();
        cfg.keyboards.push(KeyboardEntry {
            name: "kbd1".to_string(),
        });

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: DaemonConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(restored, cfg);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let cfg: DaemonConfig = toml::from_str("[daemon]\n").expect("deserialize");
        assert_eq!(cfg.daemon.socket_path, "/tmp/hidgate-control.sock");
        assert_eq!(cfg.keyboards.len(), 1, "default keyboard is present");
    }

    #[test]
    fn test_partial_daemon_section_overrides_defaults() {
        let cfg: DaemonConfig =
            toml::from_str("[daemon]\nlog_level = \"trace\"\n").expect("deserialize");
        assert_eq!(cfg.daemon.log_level, "trace");
        assert_eq!(cfg.daemon.socket_path, "/tmp/hidgate-control.sock");
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let result: Result<DaemonConfig, toml::de::Error> = toml::from_str("[[[ nope");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file_yields_defaults() {
        let path = Path::new("/nonexistent/hidgate/config.toml");
        let cfg = load_config(Some(path)).expect("load");
        assert_eq!(cfg, DaemonConfig::default_with_devices());
    }
}
