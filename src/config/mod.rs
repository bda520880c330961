//! Configuration module for the sticker bot.
//!
//! Handles loading and validation of the Telegram API credentials and the
//! bot's own settings from the environment.

mod settings;

pub use settings::{BotSettings, ConfigError, TelegramConfig, parse_sudo_users};

/// Default lower bound between two automatic stickers, in seconds.
pub const DEFAULT_MIN_DELAY_SECS: u64 = 5;

/// Default upper bound between two automatic stickers, in seconds.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 20;

/// Default pause between two consecutive group joins, in seconds.
pub const DEFAULT_JOIN_DELAY_SECS: u64 = 30;

/// Default size of the message handler pool.
pub const DEFAULT_WORKERS: usize = 20;
