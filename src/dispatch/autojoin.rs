//! Joins groups whose invite links privileged users post.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::automation::Toggles;
use crate::commands::{JoinReport, join_sequentially};
use crate::config::BotSettings;
use crate::telegram::links::{InviteLink, extract_invite_links};
use crate::telegram::{FloodControl, IncomingMessage, JoinTarget, Messenger, author_of};

/// Watches privileged chatter for `t.me` links and joins them.
pub struct AutoJoinHandler<M: Messenger + ?Sized> {
    messenger: Arc<M>,
    settings: Arc<BotSettings>,
    toggles: Arc<Toggles>,
    flood: FloodControl,
}

impl<M: Messenger + ?Sized> AutoJoinHandler<M> {
    #[must_use]
    pub fn new(
        messenger: Arc<M>,
        settings: Arc<BotSettings>,
        toggles: Arc<Toggles>,
        flood: FloodControl,
    ) -> Self {
        Self {
            messenger,
            settings,
            toggles,
            flood,
        }
    }

    /// Joins every invite link in `message`.
    ///
    /// Returns `None` when the message does not qualify: auto-join is off,
    /// the sender is not privileged, the text is a command, or it carries no
    /// links.
    pub async fn handle(&self, message: &IncomingMessage) -> Option<JoinReport> {
        if !self.toggles.auto_join() {
            return None;
        }
        if message
            .text
            .trim_start()
            .starts_with(self.settings.command_prefix.as_str())
        {
            return None;
        }

        let author = author_of(self.messenger.as_ref(), message).await;
        if !author.is_some_and(|id| self.settings.is_privileged(id)) {
            return None;
        }

        let targets: Vec<JoinTarget> = extract_invite_links(&message.text)
            .iter()
            .map(InviteLink::target)
            .collect();
        if targets.is_empty() {
            return None;
        }

        info!("Auto-joining {} links from message {}", targets.len(), message.id);
        let report = join_sequentially(
            self.messenger.as_ref(),
            &self.flood,
            Duration::from_secs(self.settings.join_delay_secs),
            &targets,
            message.chat,
        )
        .await;

        if report.joined > 0 {
            let summary = format!(
                "Auto-join completed. Joined {}/{} groups.",
                report.joined,
                targets.len()
            );
            if let Err(e) = self.messenger.send_text(message.chat, &summary).await {
                warn!("Failed to send auto-join summary: {}", e);
            }
        }

        Some(report)
    }
}
