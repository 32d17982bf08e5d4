//! TOML daemon configuration.
//!
//! Read from `~/.pomodoro/config.toml` unless a path is given:
//! - Socket and state file locations
//! - Countdown tick interval
//! - End-of-phase sound selection
//! - Log filter
//!
//! A missing file yields the defaults. A malformed file is reported and
//! also yields the defaults, so the daemon always starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory under the home directory holding all service files.
pub const APP_DIR: &str = ".pomodoro";

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// JSON file backing the preference store.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Custom end-of-phase sound. Falls back to a desktop sound, then the
    /// built-in chime.
    #[serde(default)]
    pub sound_file: Option<PathBuf>,
    /// Master switch for audio output.
    #[serde(default = "default_true")]
    pub sound: bool,
    /// `tracing` filter directive, e.g. `"pomodoro_service=debug"`.
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_socket_path() -> PathBuf {
    app_dir().join("pomodoro.sock")
}

fn default_state_path() -> PathBuf {
    app_dir().join("state.json")
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            state_path: default_state_path(),
            tick_interval_ms: default_tick_interval_ms(),
            sound_file: None,
            sound: true,
            log_filter: None,
        }
    }
}

impl ServiceConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        app_dir().join("config.toml")
    }

    /// Reads and parses `path`. Returns `Ok(None)` when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config: {:?}", path))
            }
        };
        let config: Self = toml::from_str(&content).context("Failed to parse config")?;
        Ok(Some(config.normalized()))
    }

    /// Tick interval, never below [`MIN_TICK_INTERVAL_MS`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }

    fn normalized(mut self) -> Self {
        self.socket_path = expand_home(&self.socket_path);
        self.state_path = expand_home(&self.state_path);
        self.sound_file = self.sound_file.as_deref().map(expand_home);
        self.tick_interval_ms = self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS);
        self
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
