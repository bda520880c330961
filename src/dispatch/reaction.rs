//! Reacts to group chatter while automation is running.

use std::sync::Arc;

use tracing::{debug, error};

use crate::automation::Toggles;
use crate::telegram::{IncomingMessage, Messenger};

/// Attaches a fixed reaction to incoming group messages.
pub struct ReactionHandler<M: Messenger + ?Sized> {
    messenger: Arc<M>,
    toggles: Arc<Toggles>,
    emoji: String,
}

impl<M: Messenger + ?Sized> ReactionHandler<M> {
    #[must_use]
    pub fn new(messenger: Arc<M>, toggles: Arc<Toggles>, emoji: String) -> Self {
        Self {
            messenger,
            toggles,
            emoji,
        }
    }

    /// Reacts to `message` if it qualifies. Returns whether a reaction was
    /// sent; failures are logged and never reach the caller.
    pub async fn observe(&self, message: &IncomingMessage) -> bool {
        if message.is_service || message.outgoing || !message.chat_kind.is_group() {
            return false;
        }
        if !(self.toggles.automation() && self.toggles.reactions()) {
            return false;
        }

        match self
            .messenger
            .react(message.chat, message.id, &self.emoji)
            .await
        {
            Ok(()) => {
                debug!("Reacted to message {} in {}", message.id, message.chat);
                true
            }
            Err(e) => {
                error!("Error reacting to message {} in {}: {}", message.id, message.chat, e);
                false
            }
        }
    }
}
