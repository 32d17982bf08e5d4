//! Persistent key-value preference store.
//!
//! The store is an opaque map of string keys to JSON values. Repositories on
//! top of it decode typed records and substitute defaults for anything that
//! is missing, mistyped or unreadable:
//!
//! - `state`: the engine snapshot and the rest interval
//! - `settings`: phase durations and user options
//! - `tags`: the task journal and the focus task
//!
//! Read and write failures never reach the engine. They are logged and
//! replaced with defaults or the last known value.

mod file;
mod memory;
mod settings;
mod state;
mod tags;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings::SettingsRepository;
pub use state::PomodoroRepository;
pub use tags::TagsRepository;

/// Preference keys.
pub mod keys {
    pub const CURRENT_SECONDS: &str = "current_seconds";
    pub const CHOSEN_PHASE_NAME: &str = "chosen_phase_name";
    pub const CURRENT_PHASE_NAME: &str = "current_phase_name";
    pub const OPERATING_MODE: &str = "operating_mode";
    pub const REST_INTERVAL: &str = "rest_interval";

    pub const WORK_PHASE_MINUTES: &str = "work_phase_minutes";
    pub const SHORT_BREAK_PHASE_MINUTES: &str = "short_break_phase_minutes";
    pub const LONG_BREAK_PHASE_MINUTES: &str = "long_break_phase_minutes";

    pub const NOTIFICATION_SOUND: &str = "notification_sound";
    pub const VIBRATION: &str = "vibration";
    pub const AUTO_BREAK_START: &str = "auto_break_start";
    pub const AUTO_POMODORO_START: &str = "auto_pomodoro_start";

    pub const TAGS: &str = "tags";
    pub const TAG_ID: &str = "tag_id";
    pub const TAG_NAME: &str = "tag_name";
    pub const TASK_NAME: &str = "task_name";
}

// ============================================================================
// StoreError
// ============================================================================

/// Errors raised by preference store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read
    #[error("failed to read preferences from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file could not be written
    #[error("failed to write preferences to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a JSON object
    #[error("preferences file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded
    #[error("failed to encode preference value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend refused the operation
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Preferences
// ============================================================================

/// A snapshot of every stored key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, Value>);

impl Preferences {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of `key`.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `key` as an unsigned integer, if it holds one that fits.
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Returns `key` as a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Returns `key` as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Decodes `key` into `T`; a value of the wrong shape counts as missing.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring malformed preference '{}': {}", key, e);
                None
            }
        }
    }

    /// Stores `value` under `key`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// Backend of the key-value store.
///
/// `edit` is a read-modify-write that is atomic with respect to other edits
/// on the same store.
pub trait PreferenceStore: Send + Sync {
    /// Reads every stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self) -> Result<Preferences, StoreError>;

    /// Applies `apply` to the stored keys and persists the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be persisted.
    fn edit(&self, apply: &mut dyn FnMut(&mut Preferences)) -> Result<Preferences, StoreError>;

    /// Blocks until every accepted edit has reached the backend.
    fn flush(&self) {}
}

/// Reads the store, logging and substituting an empty snapshot on failure.
pub(crate) fn read_or_empty(store: &dyn PreferenceStore) -> Preferences {
    store.read().unwrap_or_else(|e| {
        tracing::error!("Error reading preferences, using defaults: {}", e);
        Preferences::new()
    })
}

/// Edits the store without reporting failure to the caller.
pub(crate) fn edit_or_log(store: &dyn PreferenceStore, mut apply: impl FnMut(&mut Preferences)) {
    if let Err(e) = store.edit(&mut apply) {
        tracing::error!("Error writing preferences: {}", e);
    }
}

// ============================================================================
// Tests
// ============================================================================
