use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{BlockerConfig, OverlayTiming},
    game::{Board, GameSession, Outcome},
    messaging::{BackgroundHandle, PageMessage},
    store::{KeyValueStore, Preferences, TimerSession, DEFAULT_BLOCK_DURATION_MINUTES},
};

use super::{
    state::{remaining_secs, timer_text, OverlayPhase, OverlayState},
    surface::OverlaySurface,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
    pub phase: OverlayPhase,
    pub domain: Option<String>,
    pub session_id: Option<String>,
    pub remaining_secs: u64,
    pub board: Board,
    pub outcome: Option<Outcome>,
}

/// Owns the overlay for one page instance: the countdown task, the game and
/// the redirect on expiry. Cloning shares the same page state.
pub struct OverlayController<S, R> {
    prefs: Preferences<S>,
    background: BackgroundHandle,
    surface: Arc<R>,
    timing: OverlayTiming,
    redirect_url: Arc<str>,
    state: Arc<Mutex<OverlayState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl<S, R> Clone for OverlayController<S, R> {
    fn clone(&self) -> Self {
        Self {
            prefs: self.prefs.clone(),
            background: self.background.clone(),
            surface: Arc::clone(&self.surface),
            timing: self.timing,
            redirect_url: Arc::clone(&self.redirect_url),
            state: Arc::clone(&self.state),
            ticker: Arc::clone(&self.ticker),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: KeyValueStore, R: OverlaySurface> OverlayController<S, R> {
    pub fn new(
        prefs: Preferences<S>,
        background: BackgroundHandle,
        surface: Arc<R>,
        config: &BlockerConfig,
    ) -> Self {
        Self {
            prefs,
            background,
            surface,
            timing: config.timing,
            redirect_url: Arc::from(config.redirect_url.as_str()),
            state: Arc::new(Mutex::new(OverlayState::new())),
            ticker: Arc::new(Mutex::new(None)),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn phase(&self) -> OverlayPhase {
        self.state.lock().await.phase
    }

    pub async fn snapshot(&self) -> OverlaySnapshot {
        let guard = self.state.lock().await;
        OverlaySnapshot {
            phase: guard.phase,
            domain: guard.domain.clone(),
            session_id: guard
                .session
                .as_ref()
                .map(|session| session.session_id.clone()),
            remaining_secs: guard.remaining_secs(Instant::now()),
            board: *guard.game.board(),
            outcome: guard.game.outcome(),
        }
    }

    /// Page-side message loop. Ends when the sender is dropped or the page is
    /// torn down.
    pub async fn run(self, mut messages: mpsc::UnboundedReceiver<PageMessage>) {
        loop {
            tokio::select! {
                message = messages.recv() => {
                    let Some(message) = message else { break };
                    self.handle_message(message).await;
                }
                _ = self.cancel.cancelled() => break,
            }
        }
    }

    pub async fn handle_message(&self, message: PageMessage) {
        match message {
            PageMessage::BeginBlock { domain } => {
                if domain.is_empty() {
                    log_warn!("begin_block without a domain");
                    return;
                }
                self.begin_block(&domain).await;
            }
        }
    }

    /// `Idle -> Presenting`. Returns whether the overlay was started.
    ///
    /// The whitelist is checked again here because it may have changed after
    /// the background decided to block.
    pub async fn begin_block(&self, domain: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.prefs.is_whitelisted(domain).await {
            log_info!("{domain} was whitelisted before the overlay started");
            return false;
        }

        let mut state = self.state.lock().await;
        if state.phase != OverlayPhase::Idle {
            log_debug!("overlay already {:?}; ignoring begin_block", state.phase);
            return false;
        }

        let duration = self
            .background
            .get_block_duration()
            .await
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_BLOCK_DURATION_MINUTES);
        if self.cancel.is_cancelled() {
            log_debug!("page torn down while starting the block on {domain}");
            return false;
        }

        // Every visit starts a fresh period; whatever was stored is replaced.
        let session = TimerSession::new(Utc::now().timestamp_millis(), duration);
        let ends_at = Instant::now() + Duration::from_millis(session.duration_ms());
        self.prefs.put_timer_session(domain, &session).await;
        if self.cancel.is_cancelled() {
            self.prefs.clear_timer_session(domain).await;
            log_debug!("page torn down while starting the block on {domain}");
            return false;
        }

        self.surface.mount(domain, duration);
        log_info!(
            "blocking {domain} for {duration} min (session {})",
            session.session_id
        );
        state.present(domain, session, ends_at);
        self.surface.render_board(state.game.board(), true);
        drop(state);

        self.spawn_ticker(domain.to_string(), ends_at).await;
        true
    }

    /// Player takes `cell`. The opponent answers after a short pause unless the
    /// move ended the game.
    pub async fn play(&self, cell: usize) -> Result<Option<Outcome>> {
        let outcome = {
            let mut state = self.state.lock().await;
            if state.phase != OverlayPhase::Presenting {
                bail!("overlay is not presenting");
            }
            if state.awaiting_opponent {
                bail!("waiting for the opponent");
            }
            let outcome = state.game.player_move(cell)?;
            state.awaiting_opponent = outcome.is_none();
            self.surface.render_board(state.game.board(), false);
            outcome
        };

        if let Some(outcome) = outcome {
            self.on_outcome(outcome);
            return Ok(Some(outcome));
        }

        tokio::select! {
            _ = time::sleep(self.timing.opponent_delay) => {}
            _ = self.cancel.cancelled() => return Ok(None),
        }

        let outcome = {
            let mut state = self.state.lock().await;
            state.awaiting_opponent = false;
            if state.phase != OverlayPhase::Presenting {
                return Ok(None);
            }
            let (_, outcome) = state.game.opponent_move();
            self.surface
                .render_board(state.game.board(), outcome.is_none());
            outcome
        };

        if let Some(outcome) = outcome {
            self.on_outcome(outcome);
        }
        Ok(outcome)
    }

    /// Ask the background to exempt the blocked domain from now on. The
    /// running countdown is unaffected.
    pub async fn request_whitelist(&self) -> Option<String> {
        let domain = self.state.lock().await.domain.clone()?;
        self.background.whitelist_site(&domain);
        Some(domain)
    }

    /// Stop every task owned by this page and take the overlay down.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.ticker.lock().await.take() {
            if let Err(err) = handle.await {
                log_warn!("countdown task failed to join: {err}");
            }
        }
        self.surface.unmount();
    }

    fn on_outcome(&self, outcome: Outcome) {
        self.surface.show_outcome(outcome);

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(controller.timing.restart_delay) => {}
                _ = controller.cancel.cancelled() => return,
            }

            let mut state = controller.state.lock().await;
            if state.phase != OverlayPhase::Presenting {
                return;
            }
            state.game = GameSession::new();
            state.awaiting_opponent = false;
            controller.surface.render_board(state.game.board(), true);
        });
    }

    async fn spawn_ticker(&self, domain: String, ends_at: Instant) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }
        if self.cancel.is_cancelled() {
            return;
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            controller.countdown(domain, ends_at).await;
        });

        *ticker_guard = Some(handle);
    }

    /// Render, then sleep one interval, then render again. Drift is not
    /// corrected.
    async fn countdown(&self, domain: String, ends_at: Instant) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let remaining = remaining_secs(ends_at, Instant::now());
            if !self.surface.render_timer(&timer_text(remaining)) {
                log_debug!("timer target for {domain} is gone; stopping countdown");
                return;
            }
            if remaining == 0 {
                break;
            }

            tokio::select! {
                _ = time::sleep(self.timing.tick_interval) => {}
                _ = self.cancel.cancelled() => return,
            }
        }

        self.state.lock().await.expire();
        self.prefs.clear_timer_session(&domain).await;
        log_info!("block on {domain} expired; redirecting to {}", self.redirect_url);

        tokio::select! {
            _ = time::sleep(self.timing.expiry_grace) => {
                self.surface.navigate(&self.redirect_url);
            }
            _ = self.cancel.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        overlay::surface::{RecordingSurface, SurfaceEvent},
        store::MemoryStore,
    };

    struct Page {
        controller: OverlayController<MemoryStore, RecordingSurface>,
        prefs: Preferences<MemoryStore>,
        surface: Arc<RecordingSurface>,
    }

    /// Controller wired to a background stub that answers every duration
    /// query with `minutes`.
    fn page(minutes: Option<u32>) -> Page {
        page_with(minutes, Duration::ZERO, BlockerConfig::default())
    }

    fn page_with(minutes: Option<u32>, reply_delay: Duration, config: BlockerConfig) -> Page {
        let prefs = Preferences::new(MemoryStore::new());
        let (background, mut commands) = BackgroundHandle::channel();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                if !reply_delay.is_zero() {
                    time::sleep(reply_delay).await;
                }
                if let (Some(reply), Some(minutes)) = (command.reply, minutes) {
                    let _ = reply.send(crate::messaging::BackgroundResponse::BlockDuration {
                        block_duration_minutes: minutes,
                    });
                }
            }
        });
        let surface = Arc::new(RecordingSurface::new());
        let controller = OverlayController::new(
            prefs.clone(),
            background,
            Arc::clone(&surface),
            &config,
        );
        Page {
            controller,
            prefs,
            surface,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn presents_and_counts_down() {
        let page = page(Some(5));
        assert!(page.controller.begin_block("pornhub.com").await);
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(page.controller.phase().await, OverlayPhase::Presenting);
        let first = page.surface.timer_texts()[0].clone();
        assert!(
            first == "Time left: 5:00" || first == "Time left: 4:59",
            "got {first}"
        );
        assert!(matches!(
            page.surface.events()[0],
            SurfaceEvent::Mounted {
                duration_minutes: 5,
                ..
            }
        ));

        let stored = page.prefs.timer_session("pornhub.com").await.unwrap();
        assert_eq!(stored.duration, 5);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            page.surface.timer_texts(),
            vec!["Time left: 5:00", "Time left: 4:59", "Time left: 4:58"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_during_duration_query_leaves_nothing_behind() {
        let page = page_with(
            Some(5),
            Duration::from_millis(100),
            BlockerConfig::default(),
        );
        let controller = page.controller.clone();
        let starting = tokio::spawn(async move { controller.begin_block("pornhub.com").await });

        time::sleep(Duration::from_millis(10)).await;
        page.controller.teardown().await;

        assert!(!starting.await.unwrap());
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(page.surface.events(), vec![SurfaceEvent::Unmounted]);
        assert_eq!(page.controller.phase().await, OverlayPhase::Idle);
        assert!(page.prefs.timer_session("pornhub.com").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_clears_session_and_redirects_after_grace() {
        let page = page(Some(1));
        page.controller.begin_block("xvideos.com").await;

        time::sleep(Duration::from_millis(60_500)).await;
        assert_eq!(page.controller.phase().await, OverlayPhase::Expired);
        assert_eq!(
            page.surface.timer_texts().last().map(String::as_str),
            Some("Time's up! Redirecting...")
        );
        assert!(page.prefs.timer_session("xvideos.com").await.is_none());
        assert!(page.surface.navigations().is_empty());

        time::sleep(Duration::from_millis(1_600)).await;
        assert_eq!(page.surface.navigations(), vec!["https://www.google.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_duration_reply_falls_back_to_default() {
        let page = page(None);
        page.controller.begin_block("beeg.com").await;
        assert!(matches!(
            page.surface.events()[0],
            SurfaceEvent::Mounted {
                duration_minutes: 5,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn whitelisted_domain_never_presents() {
        let page = page(Some(5));
        page.prefs.add_to_whitelist("pornhub.com").await;
        assert!(!page.controller.begin_block("pornhub.com").await);
        assert_eq!(page.controller.phase().await, OverlayPhase::Idle);
        assert!(page.surface.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_begin_block_is_ignored() {
        let page = page(Some(5));
        assert!(page.controller.begin_block("pornhub.com").await);
        let session = page.prefs.timer_session("pornhub.com").await;
        assert!(!page.controller.begin_block("pornhub.com").await);
        assert_eq!(page.prefs.timer_session("pornhub.com").await, session);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_when_timer_element_disappears() {
        let page = page(Some(5));
        page.controller.begin_block("pornhub.com").await;
        time::sleep(Duration::from_millis(1)).await;
        page.surface.remove_timer();

        let before = page.surface.timer_texts().len();
        time::sleep(Duration::from_secs(400)).await;
        assert_eq!(page.surface.timer_texts().len(), before);
        assert!(page.surface.navigations().is_empty());
        assert_eq!(page.controller.phase().await, OverlayPhase::Presenting);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_countdown() {
        let page = page(Some(1));
        page.controller.begin_block("pornhub.com").await;
        page.controller.teardown().await;

        let before = page.surface.timer_texts().len();
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(page.surface.timer_texts().len(), before);
        assert!(page.surface.navigations().is_empty());
        assert_eq!(page.surface.events().last(), Some(&SurfaceEvent::Unmounted));
    }

    #[tokio::test(start_paused = true)]
    async fn game_restarts_after_outcome() {
        let page = page(Some(5));
        page.controller.begin_block("pornhub.com").await;

        let mut outcome = None;
        while outcome.is_none() {
            let board = page.controller.snapshot().await.board;
            let cell = board.empty_cells().next().unwrap();
            outcome = page.controller.play(cell).await.unwrap();
        }
        assert_ne!(outcome, Some(Outcome::PlayerWin));
        assert!(page.controller.play(0).await.is_err());

        time::sleep(Duration::from_millis(2_600)).await;
        let snapshot = page.controller.snapshot().await;
        assert_eq!(snapshot.outcome, None);
        assert_eq!(snapshot.board, Board::new());
        assert_eq!(page.surface.last_board(), Some((Board::new(), true)));
    }

    #[tokio::test(start_paused = true)]
    async fn opponent_answers_after_its_delay() {
        let page = page(Some(5));
        page.controller.begin_block("pornhub.com").await;

        let controller = page.controller.clone();
        let first = tokio::spawn(async move { controller.play(4).await });
        time::sleep(Duration::from_millis(10)).await;

        let (board, interactive) = page.surface.last_board().unwrap();
        assert_eq!(board.empty_cells().count(), 8);
        assert!(!interactive);

        time::sleep(Duration::from_millis(280)).await;
        assert_eq!(page.surface.last_board().unwrap().0.empty_cells().count(), 8);

        time::sleep(Duration::from_millis(20)).await;
        let (board, interactive) = page.surface.last_board().unwrap();
        assert_eq!(board.empty_cells().count(), 7);
        assert!(interactive);
        assert_eq!(first.await.unwrap().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_move_is_refused_while_opponent_is_thinking() {
        let page = page(Some(5));
        page.controller.begin_block("pornhub.com").await;

        let controller = page.controller.clone();
        let first = tokio::spawn(async move { controller.play(4).await });
        time::sleep(Duration::from_millis(10)).await;

        let err = page.controller.play(0).await.unwrap_err();
        assert!(err.to_string().contains("waiting for the opponent"));
        assert_eq!(page.controller.snapshot().await.board.empty_cells().count(), 8);

        assert_eq!(first.await.unwrap().unwrap(), None);
        let board = page.controller.snapshot().await.board;
        let cell = board.empty_cells().next().unwrap();
        assert!(page.controller.play(cell).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_game_is_not_restarted_after_expiry() {
        let mut config = BlockerConfig::default();
        config.timing.restart_delay = Duration::from_secs(120);
        let page = page_with(Some(1), Duration::ZERO, config);
        page.controller.begin_block("pornhub.com").await;

        let mut outcome = None;
        while outcome.is_none() {
            let board = page.controller.snapshot().await.board;
            let cell = board.empty_cells().next().unwrap();
            outcome = page.controller.play(cell).await.unwrap();
        }

        time::sleep(Duration::from_secs(130)).await;
        let snapshot = page.controller.snapshot().await;
        assert_eq!(snapshot.phase, OverlayPhase::Expired);
        assert_eq!(snapshot.outcome, outcome);
        assert_ne!(snapshot.board, Board::new());
        assert_ne!(page.surface.last_board(), Some((Board::new(), true)));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_carries_the_stored_session_id() {
        let page = page(Some(5));
        assert_eq!(page.controller.snapshot().await.session_id, None);

        page.controller.begin_block("pornhub.com").await;
        let stored = page.prefs.timer_session("pornhub.com").await.unwrap();
        assert_eq!(
            page.controller.snapshot().await.session_id,
            Some(stored.session_id)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn play_is_refused_while_idle() {
        let page = page(Some(5));
        assert!(page.controller.play(4).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_dispatches_begin_block() {
        let page = page(Some(2));
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(page.controller.clone().run(rx));

        tx.send(PageMessage::BeginBlock {
            domain: String::new(),
        })
        .unwrap();
        tx.send(PageMessage::BeginBlock {
            domain: "porn.com".into(),
        })
        .unwrap();
        drop(tx);
        task.await.unwrap();

        let snapshot = page.controller.snapshot().await;
        assert_eq!(snapshot.phase, OverlayPhase::Presenting);
        assert_eq!(snapshot.domain.as_deref(), Some("porn.com"));
    }
}
