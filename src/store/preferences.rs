use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::KeyValueStore;

pub const DEFAULT_BLOCK_DURATION_MINUTES: u32 = 5;
pub const MIN_BLOCK_DURATION_MINUTES: u32 = 1;
pub const MAX_BLOCK_DURATION_MINUTES: u32 = 60;

const KEY_ENABLED: &str = "enabled";
const KEY_BLOCK_DURATION: &str = "blockDuration";
const KEY_WHITELIST: &str = "whitelist";
const TIMER_KEY_PREFIX: &str = "xo_blocker_timer_";

/// Advisory record of a running block period for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    /// Epoch milliseconds.
    pub start: i64,
    pub duration: u32,
    pub session_id: String,
}

impl TimerSession {
    pub fn new(start: i64, duration: u32) -> Self {
        Self {
            start,
            duration,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        u64::from(self.duration) * 60_000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesSnapshot {
    pub enabled: bool,
    pub whitelist: Vec<String>,
    pub block_duration_minutes: u32,
}

/// Typed view over the preference keys.
pub struct Preferences<S> {
    store: Arc<S>,
}

impl<S> Clone for Preferences<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Install hook: seed defaults without clobbering existing values.
    pub async fn ensure_defaults(&self) {
        let mut entries = Map::new();
        if !matches!(self.store.get(KEY_BLOCK_DURATION).await, Some(Value::Number(_))) {
            entries.insert(
                KEY_BLOCK_DURATION.into(),
                json!(DEFAULT_BLOCK_DURATION_MINUTES),
            );
        }
        if !matches!(self.store.get(KEY_ENABLED).await, Some(Value::Bool(_))) {
            entries.insert(KEY_ENABLED.into(), json!(true));
        }
        if !entries.is_empty() {
            self.store.set(entries).await;
        }
    }

    /// Only an explicit `false` disables blocking.
    pub async fn enabled(&self) -> bool {
        !matches!(self.store.get(KEY_ENABLED).await, Some(Value::Bool(false)))
    }

    pub async fn set_enabled(&self, enabled: bool) {
        self.set_one(KEY_ENABLED, json!(enabled)).await;
    }

    pub async fn whitelist(&self) -> Vec<String> {
        match self.store.get(KEY_WHITELIST).await {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(domain) => Some(domain),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub async fn is_whitelisted(&self, domain: &str) -> bool {
        self.whitelist().await.iter().any(|entry| entry == domain)
    }

    /// Appends `domain` unless already present. Returns whether it was added.
    pub async fn add_to_whitelist(&self, domain: &str) -> bool {
        let mut whitelist = self.whitelist().await;
        if whitelist.iter().any(|entry| entry == domain) {
            return false;
        }
        whitelist.push(domain.to_string());
        self.set_one(KEY_WHITELIST, json!(whitelist)).await;
        true
    }

    /// Stored duration in minutes; anything missing or non-positive reads as
    /// the default.
    pub async fn block_duration(&self) -> u32 {
        self.store
            .get(KEY_BLOCK_DURATION)
            .await
            .and_then(|value| value.as_f64())
            .filter(|minutes| *minutes >= 1.0)
            .map(|minutes| minutes.min(f64::from(u32::MAX)) as u32)
            .unwrap_or(DEFAULT_BLOCK_DURATION_MINUTES)
    }

    /// Clamps to the supported range and stores. Returns the stored value.
    pub async fn set_block_duration(&self, minutes: i64) -> u32 {
        let clamped = clamp_duration(minutes);
        self.set_one(KEY_BLOCK_DURATION, json!(clamped)).await;
        clamped
    }

    pub async fn timer_session(&self, domain: &str) -> Option<TimerSession> {
        let value = self.store.get(&timer_key(domain)).await?;
        serde_json::from_value(value).ok()
    }

    /// Overwrites whatever record the domain had.
    pub async fn put_timer_session(&self, domain: &str, session: &TimerSession) {
        match serde_json::to_value(session) {
            Ok(value) => self.set_one(&timer_key(domain), value).await,
            Err(err) => log::warn!("failed to encode timer session for {domain}: {err}"),
        }
    }

    pub async fn clear_timer_session(&self, domain: &str) {
        self.set_one(&timer_key(domain), Value::Null).await;
    }

    pub async fn snapshot(&self) -> PreferencesSnapshot {
        PreferencesSnapshot {
            enabled: self.enabled().await,
            whitelist: self.whitelist().await,
            block_duration_minutes: self.block_duration().await,
        }
    }

    async fn set_one(&self, key: &str, value: Value) {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value);
        self.store.set(entries).await;
    }
}

pub fn clamp_duration(minutes: i64) -> u32 {
    minutes.clamp(
        i64::from(MIN_BLOCK_DURATION_MINUTES),
        i64::from(MAX_BLOCK_DURATION_MINUTES),
    ) as u32
}

fn timer_key(domain: &str) -> String {
    format!("{TIMER_KEY_PREFIX}{domain}")
}
