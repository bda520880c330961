//! Telegram client wrapper module.
//!
//! Provides the [`Messenger`] port the rest of the bot is written against,
//! its grammers-backed implementation, error classification, flood control
//! and the pure link and sticker-token helpers.

mod client;
pub mod directory;
mod error;
mod flood;
pub mod links;
mod messenger;
pub mod sticker;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{TelegramBot, UpdateReceiver};
pub use directory::list_postable_groups;
pub use error::{DEFAULT_FLOOD_WAIT, Disposition, TelegramError};
pub use flood::FloodControl;
pub use grammers_client::client::{LoginToken, PasswordToken};
pub use messenger::{
    ChannelPost, ChannelRef, ChatId, ChatKind, Dialog, IncomingMessage, JoinTarget, MessageId,
    Messenger, PeerKind, ResolvedChannel, author_of,
};
