//! JSON file backend for the preference store.
//!
//! Reads are served from an in-memory copy loaded on first use. Edits update
//! that copy and hand the snapshot to a dedicated writer thread, so no file
//! I/O happens on the caller's task. The writer coalesces queued snapshots
//! and only writes the newest one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, warn};

use super::{PreferenceStore, Preferences, StoreError};

enum WriteRequest {
    Save(Preferences),
    Flush(Sender<()>),
}

/// Preference store persisted as a single JSON object on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target, so
/// a crash mid-write leaves the previous snapshot intact. Dropping the store
/// waits for pending writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// `None` until the file has been loaded
    cache: Mutex<Option<Preferences>>,
    writer: Option<Sender<WriteRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    ///
    /// Falls back to writing on the caller's thread if the writer thread
    /// cannot be started.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = unbounded::<WriteRequest>();
        let writer_path = path.clone();

        let spawned = std::thread::Builder::new()
            .name("pomodoro-store".to_string())
            .spawn(move || run_writer(&writer_path, &rx));

        let (writer, handle) = match spawned {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                warn!("Cannot spawn store writer, writing inline: {}", e);
                (None, None)
            }
        };

        Self {
            path,
            cache: Mutex::new(None),
            writer,
            handle,
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, prefs: Preferences) -> Result<(), StoreError> {
        match &self.writer {
            Some(tx) => {
                if tx.send(WriteRequest::Save(prefs.clone())).is_ok() {
                    return Ok(());
                }
                write_file(&self.path, &prefs)
            }
            None => write_file(&self.path, &prefs),
        }
    }
}

impl PreferenceStore for JsonFileStore {
    fn read(&self) -> Result<Preferences, StoreError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prefs) = cache.as_ref() {
            return Ok(prefs.clone());
        }
        let prefs = read_file(&self.path)?;
        *cache = Some(prefs.clone());
        Ok(prefs)
    }

    fn edit(&self, apply: &mut dyn FnMut(&mut Preferences)) -> Result<Preferences, StoreError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        let mut prefs = match cache.take() {
            Some(prefs) => prefs,
            None => match read_file(&self.path) {
                Ok(prefs) => prefs,
                Err(e @ StoreError::Corrupt { .. }) => {
                    warn!("{}; starting from an empty snapshot", e);
                    Preferences::new()
                }
                Err(e) => return Err(e),
            },
        };

        apply(&mut prefs);
        *cache = Some(prefs.clone());
        self.persist(prefs.clone())?;
        Ok(prefs)
    }

    fn flush(&self) {
        let Some(tx) = &self.writer else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(WriteRequest::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        // Closing the queue lets the writer finish what is pending and exit.
        self.writer.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Store writer thread panicked");
            }
        }
    }
}

/// Writes the newest queued snapshot, then acknowledges waiting flushes.
fn run_writer(path: &Path, rx: &Receiver<WriteRequest>) {
    while let Ok(first) = rx.recv() {
        let mut latest = None;
        let mut acks = Vec::new();
        for request in std::iter::once(first).chain(rx.try_iter()) {
            match request {
                WriteRequest::Save(prefs) => latest = Some(prefs),
                WriteRequest::Flush(ack) => acks.push(ack),
            }
        }

        if let Some(prefs) = latest {
            if let Err(e) = write_file(path, &prefs) {
                error!("Error writing preferences: {}", e);
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
    debug!("Store writer exiting");
}

fn read_file(path: &Path) -> Result<Preferences, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Preferences::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Preferences::new());
    }

    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, prefs: &Preferences) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let json = serde_json::to_vec_pretty(prefs)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = temp_store();
        let prefs = store.read().unwrap();
        assert!(prefs.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_edit_persists_to_disk() {
        let (_dir, store) = temp_store();

        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::REST_INTERVAL, 6))
            .unwrap();
        store.flush();

        assert!(store.path().exists());
        let reopened = JsonFileStore::new(store.path());
        let prefs = reopened.read().unwrap();
        assert_eq!(prefs.get_u32(keys::REST_INTERVAL), Some(6));
    }

    #[test]
    fn test_edit_keeps_other_keys() {
        let (_dir, store) = temp_store();

        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::VIBRATION, false))
            .unwrap();
        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::REST_INTERVAL, 3))
            .unwrap();

        let prefs = store.read().unwrap();
        assert_eq!(prefs.get_bool(keys::VIBRATION), Some(false));
        assert_eq!(prefs.get_u32(keys::REST_INTERVAL), Some(3));
    }

    #[test]
    fn test_corrupt_file_is_reported_on_read() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{ not json").unwrap();

        let result = store.read();
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_edit_overwrites_corrupt_file() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "garbage").unwrap();

        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::CURRENT_SECONDS, 42))
            .unwrap();

        let prefs = store.read().unwrap();
        assert_eq!(prefs.get_u32(keys::CURRENT_SECONDS), Some(42));
        assert_eq!(prefs.len(), 1);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state.json"));

        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::VIBRATION, true))
            .unwrap();
        store.flush();

        assert!(store.path().exists());
    }

    #[test]
    fn test_drop_writes_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = JsonFileStore::new(&path);
            for seconds in 0..50u32 {
                store
                    .edit(&mut |prefs: &mut Preferences| {
                        prefs.set(keys::CURRENT_SECONDS, seconds)
                    })
                    .unwrap();
            }
        }

        let prefs = JsonFileStore::new(&path).read().unwrap();
        assert_eq!(prefs.get_u32(keys::CURRENT_SECONDS), Some(49));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_reads_come_from_memory_after_load() {
        let (_dir, store) = temp_store();
        store
            .edit(&mut |prefs: &mut Preferences| prefs.set(keys::REST_INTERVAL, 2))
            .unwrap();
        store.flush();

        std::fs::write(store.path(), "{ not json").unwrap();

        let prefs = store.read().unwrap();
        assert_eq!(prefs.get_u32(keys::REST_INTERVAL), Some(2));
    }

    #[test]
    fn test_blank_file_reads_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "  \n").unwrap();
        assert!(store.read().unwrap().is_empty());
    }
}
