//! # Storage Module
//!
//! A small key-value contract and the session history built on top of it.
//!
//! Storage is best effort: [`HistoryStore`] logs and swallows store errors,
//! reading failures as "no data" and dropping failed writes. Nothing here
//! should be mistaken for durable storage.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::error::StoreError;
use crate::session::Session;

/// Key holding the JSON array of finalized sessions.
pub const SESSIONS_KEY: &str = "audiogram_sessions";
/// Key holding the last confirmed headphone label.
pub const HEADPHONE_KEY: &str = "headphone_model";
/// Key holding the calibration reference volume.
pub const CALIBRATION_KEY: &str = "audiogram_calibration_volume";

/// String-to-string storage with get/set/remove semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, used by tests and as a fallback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object file.
///
/// Every operation re-reads the file so several handles on the same path
/// observe each other's writes. A missing file is an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(data) if data.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json_string = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json_string)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut entries = self.read_entries()?;
        f(&mut entries);
        self.write_entries(&entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Reads a JSON value stored under `key`.
pub fn get_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Stores `value` as JSON under `key`.
pub fn set_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    store.set(key, &serde_json::to_string(value)?)
}

/// Append-only session history and the remembered headphone label.
#[derive(Debug)]
pub struct HistoryStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying key-value store, shared with calibration.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All finalized sessions in the order they were saved.
    ///
    /// Read or parse failures are logged and reported as an empty history.
    pub fn all_sessions(&self) -> Vec<Session> {
        match get_json::<_, Vec<Session>>(&self.store, SESSIONS_KEY) {
            Ok(sessions) => sessions.unwrap_or_default(),
            Err(e) => {
                error!("[STORAGE] Error getting sessions: {}", e);
                Vec::new()
            }
        }
    }

    /// Appends a finalized session. Failures are logged and dropped.
    ///
    /// A stored history that cannot be read is left untouched rather than
    /// overwritten, so the new session is dropped in that case.
    pub fn append_session(&self, session: &Session) {
        let mut sessions = match get_json::<_, Vec<Session>>(&self.store, SESSIONS_KEY) {
            Ok(sessions) => sessions.unwrap_or_default(),
            Err(e) => {
                error!(
                    "[STORAGE] Not saving session {}: existing sessions unreadable: {}",
                    session.id, e
                );
                return;
            }
        };
        sessions.push(session.clone());
        match set_json(&self.store, SESSIONS_KEY, &sessions) {
            Ok(()) => debug!("[STORAGE] Saved session {} ({} total)", session.id, sessions.len()),
            Err(e) => error!("[STORAGE] Error saving session {}: {}", session.id, e),
        }
    }

    /// Looks a finalized session up by id.
    pub fn session_by_id(&self, id: &str) -> Option<Session> {
        self.all_sessions().into_iter().find(|s| s.id == id)
    }

    /// The last confirmed headphone label, if one was saved.
    pub fn headphone_label(&self) -> Option<String> {
        match self.store.get(HEADPHONE_KEY) {
            Ok(label) => label.filter(|l| !l.is_empty()),
            Err(e) => {
                error!("[STORAGE] Error getting headphone model: {}", e);
                None
            }
        }
    }

    pub fn set_headphone_label(&self, label: &str) {
        if let Err(e) = self.store.set(HEADPHONE_KEY, label) {
            error!("[STORAGE] Error saving headphone model: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Ear, Measurement, TestType};
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_persists_between_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let first = JsonFileStore::new(&path);
        assert_eq!(first.get(HEADPHONE_KEY).unwrap(), None);
        first.set(HEADPHONE_KEY, "HD 600").unwrap();
        first.set("other", "1").unwrap();

        let second = JsonFileStore::new(&path);
        assert_eq!(second.get(HEADPHONE_KEY).unwrap().as_deref(), Some("HD 600"));
        second.remove("other").unwrap();
        assert_eq!(first.get("other").unwrap(), None);
    }

    #[test]
    fn corrupt_file_surfaces_format_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "{not json").unwrap();
        let store = JsonFileStore::new(file.path());
        assert!(matches!(store.get(SESSIONS_KEY), Err(StoreError::Format(_))));
    }

    #[test]
    fn history_is_append_only() {
        let history = HistoryStore::new(MemoryStore::new());
        assert!(history.all_sessions().is_empty());

        let first = Session::create("HD 600", TestType::Standard)
            .upsert(Measurement::new(1000, Ear::Left, 40.0));
        let second = Session::create("HD 600", TestType::HighFrequency);
        history.append_session(&first);
        history.append_session(&second);

        let sessions = history.all_sessions();
        assert_eq!(sessions, vec![first.clone(), second]);
        assert_eq!(history.session_by_id(&first.id), Some(first));
        assert_eq!(history.session_by_id("session-0-missing"), None);
    }

    #[test]
    fn unreadable_history_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(SESSIONS_KEY, "[{\"broken\": true}]").unwrap();
        let history = HistoryStore::new(store);
        assert!(history.all_sessions().is_empty());
    }

    #[test]
    fn append_keeps_unreadable_history_intact() {
        let valid = Session::create("HD 600", TestType::Standard)
            .upsert(Measurement::new(1000, Ear::Left, 40.0));
        let mut unknown = serde_json::to_value(&valid).unwrap();
        unknown["id"] = "session-1-unknown".into();
        unknown["testType"] = "extended".into();
        let stored = serde_json::to_string(&vec![serde_json::to_value(&valid).unwrap(), unknown])
            .unwrap();

        let store = MemoryStore::new();
        store.set(SESSIONS_KEY, &stored).unwrap();
        let history = HistoryStore::new(store);
        history.append_session(&Session::create("HD 600", TestType::HighFrequency));

        assert_eq!(history.store().get(SESSIONS_KEY).unwrap(), Some(stored));
    }

    #[test]
    fn headphone_label_round_trip() {
        let history = HistoryStore::new(MemoryStore::new());
        assert_eq!(history.headphone_label(), None);
        history.set_headphone_label("Sony WH-1000XM5");
        assert_eq!(history.headphone_label().as_deref(), Some("Sony WH-1000XM5"));
        history.set_headphone_label("");
        assert_eq!(history.headphone_label(), None);
    }
}
