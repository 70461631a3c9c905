//! Messages exchanged between the background service and page contexts.
//!
//! Fire-and-forget requests travel without a reply channel; the two queries
//! (`get_block_duration`, `get_enabled`) carry a oneshot sender that the
//! background service answers exactly once.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub type TabId = u32;

/// Background → page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageMessage {
    BeginBlock { domain: String },
}

/// Anything → background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackgroundRequest {
    WhitelistSite { domain: String },
    GetBlockDuration,
    SetEnabled { enabled: bool },
    GetEnabled,
}

impl BackgroundRequest {
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            BackgroundRequest::GetBlockDuration | BackgroundRequest::GetEnabled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundResponse {
    BlockDuration {
        #[serde(rename = "blockDurationMinutes")]
        block_duration_minutes: u32,
    },
    Enabled {
        enabled: bool,
    },
}

pub struct BackgroundCommand {
    pub request: BackgroundRequest,
    pub reply: Option<oneshot::Sender<BackgroundResponse>>,
}

/// Sending half of the background endpoint. Clone freely.
#[derive(Clone)]
pub struct BackgroundHandle {
    sender: mpsc::UnboundedSender<BackgroundCommand>,
}

impl BackgroundHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BackgroundCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn whitelist_site(&self, domain: &str) {
        self.notify(BackgroundRequest::WhitelistSite {
            domain: domain.to_string(),
        });
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.notify(BackgroundRequest::SetEnabled { enabled });
    }

    /// `None` when the background service is gone or answered with the wrong
    /// shape.
    pub async fn get_block_duration(&self) -> Option<u32> {
        match self.request(BackgroundRequest::GetBlockDuration).await? {
            BackgroundResponse::BlockDuration {
                block_duration_minutes,
            } => Some(block_duration_minutes),
            _ => None,
        }
    }

    pub async fn get_enabled(&self) -> Option<bool> {
        match self.request(BackgroundRequest::GetEnabled).await? {
            BackgroundResponse::Enabled { enabled } => Some(enabled),
            _ => None,
        }
    }

    fn notify(&self, request: BackgroundRequest) {
        let command = BackgroundCommand {
            request,
            reply: None,
        };
        if self.sender.send(command).is_err() {
            log_warn!("background service is gone; dropping message");
        }
    }

    async fn request(&self, request: BackgroundRequest) -> Option<BackgroundResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = BackgroundCommand {
            request,
            reply: Some(reply_tx),
        };
        if self.sender.send(command).is_err() {
            log_warn!("background service is gone; request unanswered");
            return None;
        }
        reply_rx.await.ok()
    }
}

/// Routes background → page messages to whichever page context is attached
/// to a tab.
#[derive(Clone, Default)]
pub struct TabRegistry {
    tabs: Arc<Mutex<HashMap<TabId, mpsc::UnboundedSender<PageMessage>>>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh page context to `tab_id`, replacing any previous one.
    pub fn attach(&self, tab_id: TabId) -> mpsc::UnboundedReceiver<PageMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.with_tabs(|tabs| tabs.insert(tab_id, sender));
        receiver
    }

    pub fn detach(&self, tab_id: TabId) {
        self.with_tabs(|tabs| tabs.remove(&tab_id));
    }

    /// Returns whether a live page context received the message.
    pub fn send(&self, tab_id: TabId, message: PageMessage) -> bool {
        let delivered = self.with_tabs(|tabs| match tabs.get(&tab_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        });
        if !delivered {
            log_debug!("no page context listening on tab {tab_id}");
        }
        delivered
    }

    fn with_tabs<T>(
        &self,
        f: impl FnOnce(&mut HashMap<TabId, mpsc::UnboundedSender<PageMessage>>) -> T,
    ) -> T {
        let mut guard = match self.tabs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}
