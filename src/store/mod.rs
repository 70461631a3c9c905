//! Preference storage.
//!
//! [`KeyValueStore`] is the capability every backend provides: asynchronous
//! JSON reads and partial-object writes with no error channel. Backend faults
//! are logged and surface as a missing value, so callers always fall back to
//! defaults. [`Preferences`] layers the typed keys on top.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use serde_json::{Map, Value};

mod preferences;
mod sqlite;

pub use preferences::{
    Preferences, PreferencesSnapshot, TimerSession, DEFAULT_BLOCK_DURATION_MINUTES,
    MAX_BLOCK_DURATION_MINUTES, MIN_BLOCK_DURATION_MINUTES,
};
pub use sqlite::SqliteStore;

pub trait KeyValueStore: Send + Sync + 'static {
    /// Read `key`; `None` when absent or when the backend failed.
    fn get(&self, key: &str) -> impl Future<Output = Option<Value>> + Send;

    /// Merge `entries` into the store, last write wins.
    fn set(&self, entries: Map<String, Value>) -> impl Future<Output = ()> + Send;
}

/// In-process store. Used by tests and by ephemeral host runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut HashMap<String, Value>) -> T) -> T {
        let mut guard = match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.with_data(|data| data.get(key).cloned())
    }

    async fn set(&self, entries: Map<String, Value>) {
        self.with_data(|data| data.extend(entries));
    }
}
