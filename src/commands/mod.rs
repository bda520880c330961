//! Command handling module.
//!
//! Processes commands sent by privileged users via Telegram messages.
//! Commands use the configured prefix, `.` by default.

mod handler;
mod join;
mod types;

pub use handler::CommandHandler;
pub use join::{JoinReport, join_sequentially};
pub use types::{BotCommand, COMMANDS, CommandResult, CommandSpec, UsageError, find_spec};
