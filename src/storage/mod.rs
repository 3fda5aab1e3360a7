//! Storage Layer
//!
//! Persists one JSON state object per namespace key. Backends are synchronous
//! and shared by every context of an origin: [`MemoryStore`] within a process,
//! [`SqliteStore`] across processes and restarts. [`SqliteSignal`] carries
//! change notifications through the same database file.

pub mod changes;
pub mod database;

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::shared::State;

pub use changes::SqliteSignal;
pub use database::SqliteStore;

/// Failure inside a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key/value persistence shared across browsing contexts
pub trait StateStore: Send + Sync {
    /// Raw payload stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the payload stored under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Every key that currently holds a payload
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Fetch and parse the state for `key`
    ///
    /// Absent keys, corrupt payloads and backend failures all read as `None`.
    fn read(&self, key: &str) -> Option<State> {
        let payload = match self.get_item(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read state for {}: {}", key, e);
                return None;
            }
        };

        match State::from_json(&payload) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt state for {}: {}", key, e);
                None
            }
        }
    }

    /// Serialize `state` and replace whatever is stored under `key`
    fn write(&self, key: &str, state: &State) -> Result<(), StoreError> {
        let payload = state.to_json()?;
        self.set_item(key, &payload)?;
        debug!("Wrote {} bytes of state for {}", payload.len(), key);
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.items.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "obsoverlay", "ObsOverlay")
        .ok_or_else(|| anyhow::anyhow!("Could not determine project directories"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}
