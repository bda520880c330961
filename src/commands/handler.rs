//! Command handler implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::join::join_sequentially;
use super::types::{BotCommand, COMMANDS, CommandResult, INVALID_CHANNEL};
use crate::automation::Toggles;
use crate::config::BotSettings;
use crate::store::{AddOutcome, StickerStore, tail};
use crate::telegram::links::{MessageLink, build_message_link};
use crate::telegram::sticker::StickerRef;
use crate::telegram::{
    ChannelPost, ChannelRef, ChatId, Disposition, FloodControl, IncomingMessage, JoinTarget,
    MessageId, Messenger, ResolvedChannel, TelegramError, author_of, list_postable_groups,
};

/// Longest post excerpt included in a shared message, in characters.
const EXCERPT_LIMIT: usize = 200;

/// How many failed group ids a fan-out summary lists.
const MAX_LISTED_FAILURES: usize = 5;

/// What a fan-out delivers to each group.
#[derive(Debug, Clone, Copy)]
enum Delivery<'a> {
    Text(&'a str),
    Forward { from: ChatId, message: MessageId },
}

/// Handles bot commands from privileged users.
pub struct CommandHandler<M: Messenger + ?Sized> {
    messenger: Arc<M>,
    settings: Arc<BotSettings>,
    toggles: Arc<Toggles>,
    store: StickerStore,
    flood: FloodControl,
}

impl<M: Messenger + ?Sized> CommandHandler<M> {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        messenger: Arc<M>,
        settings: Arc<BotSettings>,
        toggles: Arc<Toggles>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store: StickerStore::new(&settings.store_path),
            messenger,
            settings,
            toggles,
            flood: FloodControl::new(shutdown),
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command or its sender may not
    /// run commands.
    pub async fn try_handle(&self, message: &IncomingMessage) -> Option<CommandResult> {
        let parsed = BotCommand::parse(&message.text, &self.settings.command_prefix)?;

        let author = author_of(self.messenger.as_ref(), message).await;
        let Some(sender) = author.filter(|id| self.settings.is_privileged(*id)) else {
            debug!(
                "Ignoring command from unprivileged sender {:?} in {}",
                author, message.chat
            );
            return None;
        };

        let command = match parsed {
            Ok(command) => command,
            Err(usage) => return Some(CommandResult::error(usage.message)),
        };

        info!("Handling command {} from {}", command, sender);
        let result = self.execute(command, message).await;
        info!("Command result: success={}", result.success);

        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand, message: &IncomingMessage) -> CommandResult {
        match command {
            BotCommand::AddPack(token) => self.handle_add_pack(&token),
            BotCommand::On => {
                self.toggles.set_automation(true);
                CommandResult::success("Automation started.")
            }
            BotCommand::Off => {
                self.toggles.set_automation(false);
                CommandResult::success("Automation stopped.")
            }
            BotCommand::EnableReact => {
                self.toggles.set_reactions(true);
                CommandResult::success("Reactions enabled.")
            }
            BotCommand::DisableReact => {
                self.toggles.set_reactions(false);
                CommandResult::success("Reactions disabled.")
            }
            BotCommand::EnableAutoJoin => {
                self.toggles.set_auto_join(true);
                CommandResult::success("Auto-join enabled.")
            }
            BotCommand::DisableAutoJoin => {
                self.toggles.set_auto_join(false);
                CommandResult::success("Auto-join disabled.")
            }
            BotCommand::LeaveRestricted => self.handle_leave_restricted().await,
            BotCommand::Broadcast(text) => self.handle_broadcast(&text).await,
            BotCommand::Forward(channel) => self.handle_forward(&channel).await,
            BotCommand::Share(channel) => self.handle_share(&channel).await,
            BotCommand::ShareLink(link) => self.handle_share_link(&link).await,
            BotCommand::GetSticker => self.handle_get_sticker(message).await,
            BotCommand::Join(names) => self.handle_join(names, message.chat).await,
            BotCommand::Ping => self.handle_ping().await,
            BotCommand::Status => self.handle_status(),
            BotCommand::Help => self.handle_help(),
        }
    }

    fn handle_add_pack(&self, token: &str) -> CommandResult {
        if let Err(e) = StickerRef::decode(token) {
            return CommandResult::error(format!("Invalid sticker token: {e}"));
        }

        match self.store.add(token) {
            Ok(AddOutcome::Added) => {
                CommandResult::success(format!("Added sticker with ID: ...{}", tail(token, 10)))
            }
            Ok(AddOutcome::AlreadyPresent) => {
                CommandResult::error("This sticker is already in the list.")
            }
            Err(e) => {
                error!("Error adding sticker: {}", e);
                CommandResult::error("Error adding sticker.")
            }
        }
    }

    async fn handle_leave_restricted(&self) -> CommandResult {
        let groups = match self.messenger.dialogs().await {
            Ok(dialogs) => dialogs
                .into_iter()
                .filter(|d| d.kind.is_group())
                .map(|d| d.chat)
                .collect::<Vec<_>>(),
            Err(e) => {
                error!("Error in leave_restricted: {}", e);
                return CommandResult::error("Error processing request.");
            }
        };

        let mut left = 0;
        for group in groups {
            let probe = self
                .flood
                .call(|| self.messenger.send_typing(group))
                .await;
            let Err(e) = probe else { continue };

            if e.disposition() != Disposition::LeaveGroup {
                warn!("Error checking group {}: {}", group, e);
                continue;
            }
            match self.messenger.leave(group).await {
                Ok(()) => {
                    info!("Left restricted group {}", group);
                    left += 1;
                }
                Err(e) => error!("Failed to leave group {}: {}", group, e),
            }
        }

        CommandResult::success(format!("Left {left} restricted groups."))
    }

    async fn handle_broadcast(&self, text: &str) -> CommandResult {
        let groups = list_postable_groups(self.messenger.as_ref()).await;
        let failed = self.fan_out(&groups, Delivery::Text(text)).await;
        CommandResult::success(fan_out_summary("Broadcast sent to", groups.len(), &failed))
    }

    async fn handle_forward(&self, channel: &ChannelRef) -> CommandResult {
        let (_, post) = match self.latest_post(channel).await {
            Ok(found) => found,
            Err(reply) => return reply,
        };

        let groups = list_postable_groups(self.messenger.as_ref()).await;
        if groups.is_empty() {
            return CommandResult::error("No joined groups found to forward to.");
        }

        let delivery = Delivery::Forward {
            from: post.chat,
            message: post.id,
        };
        let failed = self.fan_out(&groups, delivery).await;
        CommandResult::success(fan_out_summary("Message forwarded to", groups.len(), &failed))
    }

    async fn handle_share(&self, channel: &ChannelRef) -> CommandResult {
        let (resolved, post) = match self.latest_post(channel).await {
            Ok(found) => found,
            Err(reply) => return reply,
        };

        let link = build_message_link(post.chat, resolved.username.as_deref(), post.id);
        let text = share_text(&post, &link);

        let groups = list_postable_groups(self.messenger.as_ref()).await;
        if groups.is_empty() {
            return CommandResult::error("No joined groups found to share to.");
        }

        let failed = self.fan_out(&groups, Delivery::Text(&text)).await;
        CommandResult::success(fan_out_summary("Post shared to", groups.len(), &failed))
    }

    async fn handle_share_link(&self, link: &MessageLink) -> CommandResult {
        let fetched = match self.messenger.resolve_channel(&link.channel_ref()).await {
            Ok(resolved) => self.messenger.post(resolved.chat, link.message_id).await,
            Err(e) => Err(e),
        };

        let post = match fetched {
            Ok(Some(post)) => post,
            Ok(None) => return CommandResult::error("Could not retrieve the specified message."),
            Err(e) => {
                error!("Error getting message {} from {}: {}", link.message_id, link.channel_ref(), e);
                return CommandResult::error(format!("Error retrieving message: {e}"));
            }
        };

        let groups = list_postable_groups(self.messenger.as_ref()).await;
        if groups.is_empty() {
            return CommandResult::error("No joined groups found to forward to.");
        }

        let delivery = Delivery::Forward {
            from: post.chat,
            message: post.id,
        };
        let failed = self.fan_out(&groups, delivery).await;
        CommandResult::success(fan_out_summary("Message forwarded to", groups.len(), &failed))
    }

    async fn handle_get_sticker(&self, message: &IncomingMessage) -> CommandResult {
        const NOT_A_STICKER: &str = "Please reply to a sticker with this command.";

        let Some(reply_to) = message.reply_to else {
            return CommandResult::error(NOT_A_STICKER);
        };

        match self.messenger.sticker_of(message.chat, reply_to).await {
            Ok(Some(token)) => {
                info!("Provided sticker token ...{}", tail(&token, 10));
                CommandResult::success(format!("Sticker token:\n{token}"))
            }
            Ok(None) => CommandResult::error(NOT_A_STICKER),
            Err(e) => {
                error!("Error getting sticker ID: {}", e);
                CommandResult::error("Error getting sticker ID.")
            }
        }
    }

    async fn handle_join(&self, names: Vec<String>, reply_chat: ChatId) -> CommandResult {
        let targets: Vec<JoinTarget> = names.into_iter().map(JoinTarget::Username).collect();
        let report = join_sequentially(
            self.messenger.as_ref(),
            &self.flood,
            Duration::from_secs(self.settings.join_delay_secs),
            &targets,
            reply_chat,
        )
        .await;

        CommandResult::success(format!(
            "Join process completed. Joined {}/{} groups.",
            report.joined,
            targets.len()
        ))
    }

    async fn handle_ping(&self) -> CommandResult {
        let started = Instant::now();
        match self.messenger.me().await {
            Ok(_) => {
                let latency = started.elapsed().as_millis();
                info!("Ping latency: {}ms", latency);
                CommandResult::success(format!("🏓 Pong! Bot is alive.\nLatency: {latency}ms"))
            }
            Err(e) => {
                error!("Error in ping command: {}", e);
                CommandResult::error("Error executing ping command.")
            }
        }
    }

    fn handle_status(&self) -> CommandResult {
        CommandResult::success(format!(
            "{}\nStickers: {}\nPrivileged users: {}",
            self.toggles,
            self.store.len(),
            self.settings.sudo_users.len()
        ))
    }

    fn handle_help(&self) -> CommandResult {
        let prefix = &self.settings.command_prefix;
        let mut lines = vec![
            format!("Sticker Bot Commands (prefix: {prefix})"),
            String::new(),
        ];

        for spec in COMMANDS {
            let aliases = spec
                .aliases
                .iter()
                .map(|alias| format!("{prefix}{alias}"))
                .collect::<Vec<_>>();
            let alias_str = if aliases.is_empty() {
                String::new()
            } else {
                format!(" ({})", aliases.join(", "))
            };
            lines.push(format!(
                "  {prefix}{}{alias_str} - {}",
                spec.token, spec.description
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    /// Resolves a channel and fetches its latest post, or the reply to send
    /// when that fails.
    async fn latest_post(
        &self,
        channel: &ChannelRef,
    ) -> Result<(ResolvedChannel, ChannelPost), CommandResult> {
        let resolved = self
            .messenger
            .resolve_channel(channel)
            .await
            .map_err(|e| channel_error(channel, &e))?;

        match self.messenger.latest_post(resolved.chat).await {
            Ok(Some(post)) => Ok((resolved, post)),
            Ok(None) => Err(empty_channel(channel)),
            Err(e) => Err(channel_error(channel, &e)),
        }
    }

    /// Delivers to every group in turn. Returns the groups that failed.
    async fn fan_out(&self, groups: &[ChatId], delivery: Delivery<'_>) -> Vec<ChatId> {
        let mut failed = Vec::new();

        for &group in groups {
            let sent = match delivery {
                Delivery::Text(text) => {
                    self.flood
                        .call(|| self.messenger.send_text(group, text))
                        .await
                }
                Delivery::Forward { from, message } => {
                    self.flood
                        .call(|| self.messenger.forward(group, from, message))
                        .await
                }
            };

            match sent {
                Ok(()) => debug!("Delivered to group {}", group),
                Err(e) => {
                    error!("Failed to deliver to group {}: {}", group, e);
                    failed.push(group);
                }
            }
        }

        failed
    }
}

impl<M: Messenger + ?Sized> std::fmt::Debug for CommandHandler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("store", &self.store)
            .field("toggles", &self.toggles)
            .finish_non_exhaustive()
    }
}

fn channel_error(channel: &ChannelRef, err: &TelegramError) -> CommandResult {
    if err.disposition() == Disposition::Report {
        warn!("Channel {} not found: {}", channel, err);
        return CommandResult::error(INVALID_CHANNEL);
    }
    error!("Error getting chat history from {}: {}", channel, err);
    CommandResult::error(format!(
        "Error retrieving message from channel {channel}: {err}"
    ))
}

fn empty_channel(channel: &ChannelRef) -> CommandResult {
    CommandResult::error(format!(
        "Could not retrieve message from channel {channel} or channel is empty."
    ))
}

/// Builds the text posted by `share`.
fn share_text(post: &ChannelPost, link: &str) -> String {
    if post.text.is_empty() {
        return format!("Check out this post:\n\n{link}");
    }
    format!("Check out this post:\n\n{}\n\n{link}", excerpt(&post.text, EXCERPT_LIMIT))
}

/// Cuts `text` to `limit` characters, marking the cut with `...`.
fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

/// Summary of a fan-out, e.g. `Post shared to 3/5 groups.` followed by the
/// first few failed group ids.
fn fan_out_summary(action: &str, total: usize, failed: &[ChatId]) -> String {
    let mut lines = vec![format!(
        "{action} {}/{total} groups.",
        total.saturating_sub(failed.len())
    )];

    if !failed.is_empty() {
        let listed = failed
            .iter()
            .take(MAX_LISTED_FAILURES)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let more = failed.len().saturating_sub(MAX_LISTED_FAILURES);
        if more > 0 {
            lines.push(format!("Failed groups: {listed} and {more} more..."));
        } else {
            lines.push(format!("Failed groups: {listed}"));
        }
    }

    lines.join("\n")
}
