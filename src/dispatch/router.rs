//! Runs every inbound message through the handler stages in a fixed order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AutoJoinHandler, ReactionHandler};
use crate::automation::Toggles;
use crate::commands::CommandHandler;
use crate::config::BotSettings;
use crate::telegram::{FloodControl, IncomingMessage, Messenger};

/// A handler stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Observes every message, never consumes it.
    Reaction,
    /// Consumes messages that parse as commands from privileged senders.
    Commands,
    /// Sees only what the command stage left alone.
    AutoJoin,
}

/// Order in which stages see a message.
pub const DISPATCH_ORDER: [Stage; 3] = [Stage::Reaction, Stage::Commands, Stage::AutoJoin];

/// Routes inbound messages to the reaction, command and auto-join handlers.
pub struct Dispatcher<M: Messenger + ?Sized> {
    messenger: Arc<M>,
    reactions: ReactionHandler<M>,
    commands: CommandHandler<M>,
    auto_join: AutoJoinHandler<M>,
}

impl<M: Messenger + ?Sized> Dispatcher<M> {
    #[must_use]
    pub fn new(
        messenger: Arc<M>,
        settings: Arc<BotSettings>,
        toggles: Arc<Toggles>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reactions: ReactionHandler::new(
                Arc::clone(&messenger),
                Arc::clone(&toggles),
                settings.reaction.clone(),
            ),
            commands: CommandHandler::new(
                Arc::clone(&messenger),
                Arc::clone(&settings),
                Arc::clone(&toggles),
                shutdown.clone(),
            ),
            auto_join: AutoJoinHandler::new(
                Arc::clone(&messenger),
                settings,
                toggles,
                FloodControl::new(shutdown),
            ),
            messenger,
        }
    }

    /// Handles one inbound message.
    pub async fn dispatch(&self, message: &IncomingMessage) {
        for stage in DISPATCH_ORDER {
            match stage {
                Stage::Reaction => {
                    self.reactions.observe(message).await;
                }
                Stage::Commands => {
                    if let Some(result) = self.commands.try_handle(message).await {
                        let reply = self.messenger.send_text(message.chat, &result.message);
                        if let Err(e) = reply.await {
                            warn!("Failed to reply in {}: {}", message.chat, e);
                        }
                        return;
                    }
                }
                Stage::AutoJoin => {
                    if let Some(report) = self.auto_join.handle(message).await {
                        debug!("Auto-join joined {}/{}", report.joined, report.attempted);
                    }
                }
            }
        }
    }
}
