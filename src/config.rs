use std::{env, path::PathBuf, time::Duration};

use directories::ProjectDirs;

pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com";

/// Delays that drive the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTiming {
    /// Gap between the end of one countdown render and the next.
    pub tick_interval: Duration,
    /// Wait between "time's up" and the redirect.
    pub expiry_grace: Duration,
    /// How long a finished game stays on screen before a new one starts.
    pub restart_delay: Duration,
    pub opponent_delay: Duration,
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            expiry_grace: Duration::from_millis(1500),
            restart_delay: Duration::from_millis(2500),
            opponent_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockerConfig {
    pub data_dir: PathBuf,
    pub redirect_url: String,
    pub timing: OverlayTiming,
    pub debug: bool,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            timing: OverlayTiming::default(),
            debug: false,
        }
    }
}

impl BlockerConfig {
    /// Defaults overridden by `XO_BLOCKER_DATA_DIR`, `XO_BLOCKER_REDIRECT_URL`
    /// and `XO_BLOCKER_DEBUG`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = env::var_os("XO_BLOCKER_DATA_DIR").filter(|dir| !dir.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("XO_BLOCKER_REDIRECT_URL") {
            if !url.trim().is_empty() {
                config.redirect_url = url.trim().to_string();
            }
        }
        config.debug = env::var("XO_BLOCKER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("preferences.sqlite3")
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "xo-blocker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".xo-blocker"))
}
