use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};

use crate::db::Database;

impl Database {
    /// Fetch the JSON value stored under `key`.
    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
                .with_context(|| format!("failed to read key '{key}'"))?;

            raw.map(|text| {
                serde_json::from_str::<Value>(&text)
                    .with_context(|| format!("stored value for '{key}' is not valid JSON"))
            })
            .transpose()
        })
        .await
    }

    /// Upsert every entry in one transaction. A JSON `null` is stored as-is,
    /// matching how cleared records read back.
    pub async fn set_values(&self, entries: Map<String, Value>) -> Result<()> {
        self.execute(move |conn| {
            let updated_at = Utc::now().to_rfc3339();
            let tx = conn
                .transaction()
                .context("failed to open kv transaction")?;
            for (key, value) in &entries {
                let text = serde_json::to_string(value)?;
                tx.execute(
                    "INSERT INTO kv (key, value, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at",
                    params![key, text, updated_at],
                )
                .with_context(|| format!("failed to write key '{key}'"))?;
            }
            tx.commit().context("failed to commit kv transaction")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            let mut entries = Map::new();
            entries.insert("whitelist".into(), json!(["example.com"]));
            entries.insert("blockDuration".into(), json!(7));
            db.set_values(entries).await.unwrap();
        }

        let db = Database::new(path).unwrap();
        assert_eq!(
            db.get_value("whitelist").await.unwrap(),
            Some(json!(["example.com"]))
        );
        assert_eq!(db.get_value("blockDuration").await.unwrap(), Some(json!(7)));
        assert_eq!(db.get_value("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn null_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("prefs.sqlite3")).unwrap();

        let mut entries = Map::new();
        entries.insert("xo_blocker_timer_a.com".into(), json!({"start": 1}));
        db.set_values(entries).await.unwrap();

        let mut entries = Map::new();
        entries.insert("xo_blocker_timer_a.com".into(), Value::Null);
        db.set_values(entries).await.unwrap();

        assert_eq!(
            db.get_value("xo_blocker_timer_a.com").await.unwrap(),
            Some(Value::Null)
        );
    }
}
