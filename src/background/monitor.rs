use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{page_domain, BlockRule},
    messaging::{PageMessage, TabId, TabRegistry},
    store::{KeyValueStore, Preferences},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// A tab changed; only `Complete` updates with a URL are acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    pub tab_id: TabId,
    pub status: LoadStatus,
    pub url: Option<String>,
}

impl TabUpdate {
    pub fn complete(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            status: LoadStatus::Complete,
            url: Some(url.into()),
        }
    }
}

/// What the monitor decided for one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ignored,
    Disabled,
    Whitelisted(String),
    Allowed(String),
    Blocked(String),
}

/// Watches completed page loads and asks the page to start blocking when the
/// URL is on the blocklist.
pub struct NavigationMonitor<S> {
    prefs: Preferences<S>,
    rules: Arc<BlockRule>,
    tabs: TabRegistry,
}

impl<S> Clone for NavigationMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            prefs: self.prefs.clone(),
            rules: Arc::clone(&self.rules),
            tabs: self.tabs.clone(),
        }
    }
}

impl<S: KeyValueStore> NavigationMonitor<S> {
    pub fn new(prefs: Preferences<S>, rules: Arc<BlockRule>, tabs: TabRegistry) -> Self {
        Self { prefs, rules, tabs }
    }

    pub async fn on_tab_updated(&self, update: TabUpdate) -> Verdict {
        let url = match (update.status, update.url) {
            (LoadStatus::Complete, Some(url)) => url,
            _ => return Verdict::Ignored,
        };

        if !self.prefs.enabled().await {
            return Verdict::Disabled;
        }

        let domain = page_domain(&url);
        if self.prefs.is_whitelisted(&domain).await {
            log_debug!("tab {} on whitelisted {}", update.tab_id, domain);
            return Verdict::Whitelisted(domain);
        }

        if !self.rules.is_blocked(&url) {
            return Verdict::Allowed(domain);
        }

        log_info!("tab {} hit blocked domain {}", update.tab_id, domain);
        self.tabs.send(
            update.tab_id,
            PageMessage::BeginBlock {
                domain: domain.clone(),
            },
        );
        Verdict::Blocked(domain)
    }
}
