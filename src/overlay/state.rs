use serde::Serialize;
use tokio::time::Instant;

use crate::{game::GameSession, store::TimerSession};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum OverlayPhase {
    #[default]
    Idle,
    Presenting,
    Expired,
}

/// Per-page overlay state. Moves `Idle -> Presenting -> Expired` and never
/// goes back.
#[derive(Debug, Default)]
pub struct OverlayState {
    pub phase: OverlayPhase,
    pub domain: Option<String>,
    pub session: Option<TimerSession>,
    pub ends_at: Option<Instant>,
    pub game: GameSession,
    /// Set while the opponent's reply is pending; player input is refused.
    pub awaiting_opponent: bool,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present(&mut self, domain: &str, session: TimerSession, ends_at: Instant) {
        *self = Self {
            phase: OverlayPhase::Presenting,
            domain: Some(domain.to_string()),
            session: Some(session),
            ends_at: Some(ends_at),
            game: GameSession::new(),
            awaiting_opponent: false,
        };
    }

    pub fn expire(&mut self) {
        self.phase = OverlayPhase::Expired;
        self.session = None;
        self.awaiting_opponent = false;
    }

    pub fn remaining_secs(&self, now: Instant) -> u64 {
        self.ends_at
            .map(|ends_at| remaining_secs(ends_at, now))
            .unwrap_or(0)
    }
}

/// Whole seconds left, rounded down and never negative.
pub fn remaining_secs(ends_at: Instant, now: Instant) -> u64 {
    ends_at.saturating_duration_since(now).as_secs()
}

/// `m:ss`.
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn timer_text(secs: u64) -> String {
    if secs > 0 {
        format!("Time left: {}", format_remaining(secs))
    } else {
        "Time's up! Redirecting...".to_string()
    }
}
