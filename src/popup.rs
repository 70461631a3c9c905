//! Toolbar popup: shows whether blocking is on and flips it.

use crate::messaging::BackgroundHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupView {
    pub enabled: bool,
}

impl PopupView {
    pub fn status_text(&self) -> &'static str {
        if self.enabled {
            "Blocking is ENABLED"
        } else {
            "Blocking is DISABLED"
        }
    }

    pub fn button_label(&self) -> &'static str {
        if self.enabled {
            "Disable XO Blocker"
        } else {
            "Enable XO Blocker"
        }
    }
}

pub struct Popup {
    background: BackgroundHandle,
}

impl Popup {
    pub fn new(background: BackgroundHandle) -> Self {
        Self { background }
    }

    /// An unanswered query renders as disabled.
    pub async fn load(&self) -> PopupView {
        PopupView {
            enabled: self.background.get_enabled().await.unwrap_or(false),
        }
    }

    /// Re-reads the current flag rather than trusting what is on screen, then
    /// stores its negation.
    pub async fn toggle(&self) -> PopupView {
        let current = self.load().await.enabled;
        self.background.set_enabled(!current);
        PopupView { enabled: !current }
    }
}
