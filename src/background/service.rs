use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    classifier::BlockRule,
    messaging::{
        BackgroundCommand, BackgroundHandle, BackgroundRequest, BackgroundResponse, TabRegistry,
    },
    store::{KeyValueStore, Preferences},
};

use super::monitor::{NavigationMonitor, TabUpdate};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// The extension's background process: answers messages and feeds tab
/// updates through the [`NavigationMonitor`].
pub struct BackgroundService<S> {
    prefs: Preferences<S>,
    monitor: NavigationMonitor<S>,
}

impl<S: KeyValueStore> BackgroundService<S> {
    pub fn new(prefs: Preferences<S>, rules: Arc<BlockRule>, tabs: TabRegistry) -> Self {
        let monitor = NavigationMonitor::new(prefs.clone(), rules, tabs);
        Self { prefs, monitor }
    }

    /// Install hook.
    pub async fn on_installed(&self) {
        self.prefs.ensure_defaults().await;
        log_info!("defaults ensured");
    }

    /// Answer one request. Fire-and-forget requests return `None`.
    pub async fn handle_request(&self, request: BackgroundRequest) -> Option<BackgroundResponse> {
        match request {
            BackgroundRequest::WhitelistSite { domain } => {
                if self.prefs.add_to_whitelist(&domain).await {
                    log_info!("whitelisted {domain}");
                }
                None
            }
            BackgroundRequest::GetBlockDuration => Some(BackgroundResponse::BlockDuration {
                block_duration_minutes: self.prefs.block_duration().await,
            }),
            BackgroundRequest::SetEnabled { enabled } => {
                self.prefs.set_enabled(enabled).await;
                log_info!("blocking {}", if enabled { "enabled" } else { "disabled" });
                None
            }
            BackgroundRequest::GetEnabled => Some(BackgroundResponse::Enabled {
                enabled: self.prefs.enabled().await,
            }),
        }
    }

    async fn dispatch(&self, command: BackgroundCommand) {
        let BackgroundCommand { request, reply } = command;
        if request.expects_response() && reply.is_none() {
            log_warn!("{request:?} arrived without a reply channel");
        }
        let response = self.handle_request(request).await;
        match (response, reply) {
            (Some(response), Some(reply)) => {
                if reply.send(response).is_err() {
                    log_warn!("requester dropped before reply");
                }
            }
            (None, Some(_)) => log_warn!("request expected a reply but none was produced"),
            _ => {}
        }
    }

    /// Spawn the service. Returns the message handle, the sender for tab
    /// updates and the task handle. Each tab update runs in its own task, so a
    /// slow store read never delays the next event. The task ends once both
    /// the message handle and the update sender are dropped.
    pub fn spawn(self) -> (BackgroundHandle, mpsc::UnboundedSender<TabUpdate>, JoinHandle<()>) {
        let (handle, mut commands) = BackgroundHandle::channel();
        let (update_tx, mut updates) = mpsc::unbounded_channel::<TabUpdate>();
        let service = Arc::new(self);

        let task = tokio::spawn(async move {
            service.on_installed().await;
            let mut commands_open = true;
            let mut updates_open = true;
            while commands_open || updates_open {
                tokio::select! {
                    command = commands.recv(), if commands_open => match command {
                        Some(command) => service.dispatch(command).await,
                        None => {
                            log_info!("message endpoint closed");
                            commands_open = false;
                        }
                    },
                    update = updates.recv(), if updates_open => match update {
                        Some(update) => {
                            let monitor = service.monitor.clone();
                            tokio::spawn(async move {
                                monitor.on_tab_updated(update).await;
                            });
                        }
                        None => {
                            log_info!("tab update feed closed");
                            updates_open = false;
                        }
                    },
                }
            }
            log_info!("background service shutting down");
        });

        (handle, update_tx, task)
    }
}
