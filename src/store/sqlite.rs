use std::path::PathBuf;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::db::Database;

use super::KeyValueStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Durable store backed by the SQLite worker.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let db = Database::new(path)?;
        log_info!("preference store opened at {}", db.path().display());
        Ok(Self { db })
    }
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Option<Value> {
        match self.db.get_value(key).await {
            Ok(value) => value,
            Err(err) => {
                log_error!("failed to read preference '{key}': {err:?}");
                None
            }
        }
    }

    async fn set(&self, entries: Map<String, Value>) {
        if let Err(err) = self.db.set_values(entries).await {
            log_error!("failed to write preferences: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn corrupt_rows_read_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("prefs.sqlite3")).unwrap();

        store
            .db
            .execute(|conn| {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES ('enabled', '{not json', '')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.get("enabled").await, None);

        let mut entries = Map::new();
        entries.insert("enabled".into(), json!(false));
        store.set(entries).await;
        assert_eq!(store.get("enabled").await, Some(json!(false)));
    }
}
