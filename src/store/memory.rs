//! In-memory backend for the preference store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{PreferenceStore, Preferences, StoreError};

/// Preference store kept in memory.
///
/// Used for tests and for running without a state file. Reads and writes can
/// be made to fail to exercise the recovery paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    prefs: Mutex<Preferences>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `prefs`.
    #[must_use]
    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
            ..Self::default()
        }
    }

    /// Makes subsequent reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a copy of the stored keys, ignoring injected failures.
    #[must_use]
    pub fn snapshot(&self) -> Preferences {
        self.prefs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PreferenceStore for MemoryStore {
    fn read(&self) -> Result<Preferences, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".to_string()));
        }
        Ok(self.snapshot())
    }

    fn edit(&self, apply: &mut dyn FnMut(&mut Preferences)) -> Result<Preferences, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".to_string()));
        }
        let mut prefs = self.prefs.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut prefs);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(prefs.clone())
    }
}
