//! Event Store
//!
//! Persists the connection-event log and the settings record in two fixed
//! slots of a key-value backend. The log is stored newest-first and rewritten
//! wholesale on every save.

use crate::domain::errors::StoreError;
use crate::domain::models::ConnectionEvent;
use crate::domain::settings::Settings;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const EVENTS_KEY: &str = "bluetooth_events";
pub const SETTINGS_KEY: &str = "app_settings";

/// Minimal string key-value persistence.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per slot inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("Using storage directory {}", dir.display());
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // temp file + rename, the slot is replaced atomically
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    slots: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        slots.remove(key);
        Ok(())
    }
}

pub struct EventStore {
    backend: Box<dyn KeyValueStore>,
}

impl EventStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKeyValueStore::default()))
    }

    /// Prepend `event` to the log and write the whole log back.
    /// Returns the running log, newest first.
    pub fn save_event(&self, event: ConnectionEvent) -> Result<Vec<ConnectionEvent>, StoreError> {
        let mut events = self.get_events();
        events.insert(0, event);
        self.replace_events(&events)?;
        Ok(events)
    }

    /// Overwrite the stored log with `events`, kept in the given order.
    pub fn replace_events(&self, events: &[ConnectionEvent]) -> Result<(), StoreError> {
        let json = serde_json::to_string(events)?;
        self.backend.set(EVENTS_KEY, &json)?;
        debug!("Persisted event log ({} entries)", events.len());
        Ok(())
    }

    /// The stored log, newest first. Unreadable data yields an empty log.
    pub fn get_events(&self) -> Vec<ConnectionEvent> {
        match self.read_events() {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to read event log: {}", e);
                Vec::new()
            }
        }
    }

    fn read_events(&self) -> Result<Vec<ConnectionEvent>, StoreError> {
        match self.backend.get(EVENTS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn clear_events(&self) -> Result<(), StoreError> {
        self.backend.remove(EVENTS_KEY)?;
        info!("Cleared event log");
        Ok(())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let json = serde_json::to_string(settings)?;
        self.backend.set(SETTINGS_KEY, &json)
    }

    /// The stored settings, or defaults when absent or unreadable.
    pub fn get_settings(&self) -> Settings {
        let stored = self
            .backend
            .get(SETTINGS_KEY)
            .and_then(|json| match json {
                Some(json) => Ok(Some(serde_json::from_str::<Settings>(&json)?)),
                None => Ok(None),
            });

        match stored {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                Settings::default()
            }
        }
    }
}
