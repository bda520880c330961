//! The narrow interface the bot needs from the messaging layer.
//!
//! Handlers, the directory and the sticker loop only ever talk to a
//! [`Messenger`]; the grammers-backed [`TelegramBot`](super::TelegramBot)
//! implements it for production and a recording mock implements it in tests.

use std::fmt;

use async_trait::async_trait;

use super::TelegramError;

/// Offset used by Bot-API style ids for channels and supergroups.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// A chat identifier in "marked" form: positive for users, `-id` for basic
/// groups and `-100…` for channels and supergroups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// The kind of peer a [`ChatId`] refers to, with its bare id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    User(i64),
    Group(i64),
    Channel(i64),
}

impl ChatId {
    /// Marked id of a user.
    #[must_use]
    pub const fn user(id: i64) -> Self {
        Self(id)
    }

    /// Marked id of a basic group.
    #[must_use]
    pub const fn group(id: i64) -> Self {
        Self(-id)
    }

    /// Marked id of a channel or supergroup.
    ///
    /// Saturates for bare ids too large to mark; user input goes through
    /// [`ChatId::try_channel`] instead.
    #[must_use]
    pub const fn channel(id: i64) -> Self {
        Self((-CHANNEL_ID_OFFSET).saturating_sub(id))
    }

    /// Marked id of a channel, `None` unless `id` is positive and small
    /// enough to carry the `-100` marker.
    #[must_use]
    pub const fn try_channel(id: i64) -> Option<Self> {
        if id <= 0 {
            return None;
        }
        match (-CHANNEL_ID_OFFSET).checked_sub(id) {
            Some(marked) => Some(Self(marked)),
            None => None,
        }
    }

    /// Splits the marked id into its kind and bare id.
    #[must_use]
    pub const fn kind(self) -> PeerKind {
        if self.0 > 0 {
            PeerKind::User(self.0)
        } else if self.0 < -CHANNEL_ID_OFFSET {
            // self.0 + offset is negative and above i64::MIN here.
            PeerKind::Channel(-(self.0 + CHANNEL_ID_OFFSET))
        } else {
            PeerKind::Group(-self.0)
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message id within a chat.
pub type MessageId = i32;

/// What kind of conversation a chat is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Groups and supergroups are the only chats the bot posts into.
    #[must_use]
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// One entry of the account's chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub chat: ChatId,
    pub kind: ChatKind,
    pub title: String,
    /// False when the account left, was kicked, or is banned from sending.
    pub can_post: bool,
}

/// An inbound message, as far as the bot cares about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub chat: ChatId,
    pub chat_kind: ChatKind,
    /// Author, if known. Messages posted as a channel have none.
    pub sender: Option<i64>,
    /// Sent by this account.
    pub outgoing: bool,
    /// Text, or the caption of a media message.
    pub text: String,
    pub reply_to: Option<MessageId>,
    /// Join/leave/pin and similar service messages.
    pub is_service: bool,
}

/// A post fetched from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    pub id: MessageId,
    pub chat: ChatId,
    /// Text, or the caption of a media post. Empty if neither.
    pub text: String,
}

/// A channel the bot resolved from a user-supplied reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub chat: ChatId,
    pub username: Option<String>,
}

/// How the user pointed at a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Public username, without the leading `@`.
    Username(String),
    /// Marked numeric id.
    Id(ChatId),
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) => write!(f, "@{name}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// What to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// A public group or channel, by username.
    Username(String),
    /// A private invite link hash (`t.me/joinchat/<hash>` or `t.me/+<hash>`).
    InviteHash(String),
}

impl JoinTarget {
    /// How the target is shown in replies.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Username(name) => format!("@{name}"),
            Self::InviteHash(hash) => format!("https://t.me/+{hash}"),
        }
    }
}

impl fmt::Display for JoinTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) | Self::InviteHash(name) => f.write_str(name),
        }
    }
}

/// Operations the bot performs against Telegram.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Id of the account the bot runs as.
    async fn me(&self) -> Result<i64, TelegramError>;

    /// Every chat the account has a dialog with.
    async fn dialogs(&self) -> Result<Vec<Dialog>, TelegramError>;

    /// Succeeds if the account is still a member of the group.
    async fn check_membership(&self, chat: ChatId) -> Result<(), TelegramError>;

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError>;

    /// Sends a sticker identified by an opaque token.
    async fn send_sticker(&self, chat: ChatId, sticker: &str) -> Result<(), TelegramError>;

    /// Sends a "typing" action; used to probe write access.
    async fn send_typing(&self, chat: ChatId) -> Result<(), TelegramError>;

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> Result<(), TelegramError>;

    async fn join(&self, target: &JoinTarget) -> Result<(), TelegramError>;

    async fn leave(&self, chat: ChatId) -> Result<(), TelegramError>;

    async fn react(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), TelegramError>;

    async fn resolve_channel(
        &self,
        reference: &ChannelRef,
    ) -> Result<ResolvedChannel, TelegramError>;

    /// Most recent post of a channel, `None` if it has none.
    async fn latest_post(&self, channel: ChatId) -> Result<Option<ChannelPost>, TelegramError>;

    /// A specific post, `None` if it does not exist.
    async fn post(
        &self,
        channel: ChatId,
        id: MessageId,
    ) -> Result<Option<ChannelPost>, TelegramError>;

    /// Token of the sticker carried by a message, `None` if it carries none.
    async fn sticker_of(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<Option<String>, TelegramError>;
}

/// Author of `message`, filling in this account for outgoing messages the
/// server sent without a sender.
pub async fn author_of<M: Messenger + ?Sized>(
    messenger: &M,
    message: &IncomingMessage,
) -> Option<i64> {
    match message.sender {
        Some(id) => Some(id),
        None if message.outgoing => messenger.me().await.ok(),
        None => None,
    }
}
