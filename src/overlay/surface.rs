use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use crate::game::{Board, Outcome};

/// Where the overlay draws. Implementations must tolerate calls after the
/// page has gone away.
pub trait OverlaySurface: Send + Sync + 'static {
    fn mount(&self, domain: &str, duration_minutes: u32);

    /// Returns `false` when the timer element no longer exists.
    fn render_timer(&self, text: &str) -> bool;

    fn render_board(&self, board: &Board, interactive: bool);

    fn show_outcome(&self, outcome: Outcome);

    fn navigate(&self, url: &str);

    fn unmount(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Mounted { domain: String, duration_minutes: u32 },
    Timer(String),
    Board { board: Board, interactive: bool },
    Outcome(Outcome),
    Navigated(String),
    Unmounted,
}

/// Headless surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
    timer_removed: AtomicBool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.lock().clone()
    }

    pub fn timer_texts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Timer(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_board(&self) -> Option<(Board, bool)> {
        self.lock().iter().rev().find_map(|event| match event {
            SurfaceEvent::Board { board, interactive } => Some((*board, *interactive)),
            _ => None,
        })
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Navigated(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulate the page removing the timer element.
    pub fn remove_timer(&self) {
        self.timer_removed.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: SurfaceEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SurfaceEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl OverlaySurface for RecordingSurface {
    fn mount(&self, domain: &str, duration_minutes: u32) {
        self.record(SurfaceEvent::Mounted {
            domain: domain.to_string(),
            duration_minutes,
        });
    }

    fn render_timer(&self, text: &str) -> bool {
        if self.timer_removed.load(Ordering::SeqCst) {
            return false;
        }
        self.record(SurfaceEvent::Timer(text.to_string()));
        true
    }

    fn render_board(&self, board: &Board, interactive: bool) {
        self.record(SurfaceEvent::Board {
            board: *board,
            interactive,
        });
    }

    fn show_outcome(&self, outcome: Outcome) {
        self.record(SurfaceEvent::Outcome(outcome));
    }

    fn navigate(&self, url: &str) {
        self.record(SurfaceEvent::Navigated(url.to_string()));
    }

    fn unmount(&self) {
        self.record(SurfaceEvent::Unmounted);
    }
}
