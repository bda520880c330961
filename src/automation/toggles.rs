//! Process-wide feature switches.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Feature switches shared by the sticker loop and the message handlers.
///
/// Nothing is persisted: every restart begins with automation and reactions
/// off and auto-join on.
#[derive(Debug)]
pub struct Toggles {
    automation: AtomicBool,
    reactions: AtomicBool,
    auto_join: AtomicBool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            automation: AtomicBool::new(false),
            reactions: AtomicBool::new(false),
            auto_join: AtomicBool::new(true),
        }
    }
}

impl Toggles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the sticker loop posts.
    pub fn automation(&self) -> bool {
        self.automation.load(Ordering::Relaxed)
    }

    pub fn set_automation(&self, on: bool) {
        self.automation.store(on, Ordering::Relaxed);
    }

    /// Reactions only fire while automation is also on.
    pub fn reactions(&self) -> bool {
        self.reactions.load(Ordering::Relaxed)
    }

    pub fn set_reactions(&self, on: bool) {
        self.reactions.store(on, Ordering::Relaxed);
    }

    pub fn auto_join(&self) -> bool {
        self.auto_join.load(Ordering::Relaxed)
    }

    pub fn set_auto_join(&self, on: bool) {
        self.auto_join.store(on, Ordering::Relaxed);
    }
}

impl fmt::Display for Toggles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |on: bool| if on { "ON" } else { "OFF" };
        writeln!(f, "Automation: {}", state(self.automation()))?;
        writeln!(f, "Reactions: {}", state(self.reactions()))?;
        write!(f, "Auto-join: {}", state(self.auto_join()))
    }
}
