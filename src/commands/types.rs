//! Command types and definitions.

use std::fmt;

use thiserror::Error;

use crate::telegram::ChannelRef;
use crate::telegram::links::{MessageLink, parse_channel_ref, parse_message_link};

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Append a sticker token to the store.
    AddPack(String),

    /// Stop the sticker loop.
    Off,

    /// Start the sticker loop.
    On,

    /// Leave every group that refuses our messages.
    LeaveRestricted,

    /// Send a text to every postable group.
    Broadcast(String),

    /// Forward the latest post of a channel to every postable group.
    Forward(ChannelRef),

    /// Share a link and excerpt of the latest post of a channel.
    Share(ChannelRef),

    /// Forward a specific post, given by link, to every postable group.
    ShareLink(MessageLink),

    /// Reply with the token of the sticker being replied to.
    GetSticker,

    /// Join public groups by username.
    Join(Vec<String>),

    EnableReact,
    DisableReact,
    EnableAutoJoin,
    DisableAutoJoin,

    /// Measure a round-trip to Telegram.
    Ping,

    /// Show help information.
    Help,

    /// Show toggle states and store size.
    Status,
}

/// One entry of the command registration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub token: &'static str,
    pub aliases: &'static [&'static str],
    /// Whether the command needs arguments.
    pub takes_args: bool,
    /// Reply sent when arguments are missing or malformed.
    pub usage: &'static str,
    pub description: &'static str,
}

/// Every command the bot understands.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        token: "addpack",
        aliases: &[],
        takes_args: true,
        usage: "Usage: .addpack <sticker_token>",
        description: "Add a sticker token to the rotation",
    },
    CommandSpec {
        token: "on",
        aliases: &[],
        takes_args: false,
        usage: ".on",
        description: "Start posting stickers",
    },
    CommandSpec {
        token: "off",
        aliases: &[],
        takes_args: false,
        usage: ".off",
        description: "Stop posting stickers",
    },
    CommandSpec {
        token: "leave_restricted",
        aliases: &[],
        takes_args: false,
        usage: ".leave_restricted",
        description: "Leave groups where we cannot write",
    },
    CommandSpec {
        token: "broadcast",
        aliases: &[],
        takes_args: true,
        usage: "Usage: .broadcast <text>",
        description: "Send a text to every group",
    },
    CommandSpec {
        token: "forward",
        aliases: &[],
        takes_args: true,
        usage: "Usage: .forward <channel_id>\nExamples:\n.forward @channelusername\n.forward -1001234567890\n.forward channelname",
        description: "Forward the latest channel post to every group",
    },
    CommandSpec {
        token: "share",
        aliases: &[],
        takes_args: true,
        usage: "Usage: .share <channel_id>\nExamples:\n.share @channelusername\n.share -1001234567890\n.share channelname\n\nFor specific posts: .s https://t.me/channel/123",
        description: "Share a link to the latest channel post with every group",
    },
    CommandSpec {
        token: "sharelink",
        aliases: &["s"],
        takes_args: true,
        usage: "Usage: .sharelink or .s <message_link>\nExample: .s https://t.me/globalcryptogang/2354",
        description: "Forward a linked post to every group",
    },
    CommandSpec {
        token: "getsticker",
        aliases: &[],
        takes_args: false,
        usage: "Please reply to a sticker with this command.",
        description: "Show the token of the replied sticker",
    },
    CommandSpec {
        token: "join",
        aliases: &[],
        takes_args: true,
        usage: "Usage: .join @username1 @username2 ...",
        description: "Join groups by username",
    },
    CommandSpec {
        token: "enablereact",
        aliases: &[],
        takes_args: false,
        usage: ".enablereact",
        description: "React to group messages",
    },
    CommandSpec {
        token: "disablereact",
        aliases: &[],
        takes_args: false,
        usage: ".disablereact",
        description: "Stop reacting to group messages",
    },
    CommandSpec {
        token: "enableautojoin",
        aliases: &[],
        takes_args: false,
        usage: ".enableautojoin",
        description: "Join groups from posted invite links",
    },
    CommandSpec {
        token: "disableautojoin",
        aliases: &[],
        takes_args: false,
        usage: ".disableautojoin",
        description: "Ignore posted invite links",
    },
    CommandSpec {
        token: "ping",
        aliases: &[],
        takes_args: false,
        usage: ".ping",
        description: "Check that the bot is alive",
    },
    CommandSpec {
        token: "status",
        aliases: &[],
        takes_args: false,
        usage: ".status",
        description: "Show feature switches and sticker count",
    },
    CommandSpec {
        token: "help",
        aliases: &["h", "?"],
        takes_args: false,
        usage: ".help",
        description: "Show this help message",
    },
];

/// Arguments did not fit the command; carries the text to reply with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UsageError {
    pub message: &'static str,
}

/// Reply for a malformed or unknown channel reference.
pub const INVALID_CHANNEL: &str = "Invalid channel ID. Please check the channel username or ID.\nExamples:\n.forward @channelusername\n.forward -1001234567890\n.forward channelname";

/// Reply for a malformed post link.
pub const INVALID_LINK: &str =
    "Invalid message link format. Please use: https://t.me/channel_name/message_id";

/// Looks up a command by token or alias, ignoring case.
#[must_use]
pub fn find_spec(token: &str) -> Option<&'static CommandSpec> {
    let token = token.to_lowercase();
    COMMANDS
        .iter()
        .find(|spec| spec.token == token || spec.aliases.contains(&token.as_str()))
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a registered command, and
    /// `Some(Err(_))` if it is one but its arguments are unusable.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Result<Self, UsageError>> {
        let text = text.trim();
        let after_prefix = text.strip_prefix(prefix)?;

        let (cmd, args) = match after_prefix.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (after_prefix, ""),
        };

        // `.ping@my_account` addresses this account explicitly.
        let cmd = cmd.split_once('@').map_or(cmd, |(name, _)| name);
        let spec = find_spec(cmd)?;

        Some(Self::from_spec(spec, args).map_err(|message| UsageError { message }))
    }

    fn from_spec(spec: &CommandSpec, args: &str) -> Result<Self, &'static str> {
        if spec.takes_args && args.is_empty() {
            return Err(spec.usage);
        }

        let first = args.split_whitespace().next().ok_or(spec.usage);
        let command = match spec.token {
            "addpack" => Self::AddPack(first?.to_owned()),
            "on" => Self::On,
            "off" => Self::Off,
            "leave_restricted" => Self::LeaveRestricted,
            "broadcast" => Self::Broadcast(args.to_owned()),
            "forward" => Self::Forward(parse_channel_ref(first?).ok_or(INVALID_CHANNEL)?),
            "share" => Self::Share(parse_channel_ref(first?).ok_or(INVALID_CHANNEL)?),
            "sharelink" => Self::ShareLink(parse_message_link(first?).ok_or(INVALID_LINK)?),
            "getsticker" => Self::GetSticker,
            "join" => Self::Join(
                args.split_whitespace()
                    .map(|name| name.trim_start_matches('@').to_owned())
                    .filter(|name| !name.is_empty())
                    .collect(),
            ),
            "enablereact" => Self::EnableReact,
            "disablereact" => Self::DisableReact,
            "enableautojoin" => Self::EnableAutoJoin,
            "disableautojoin" => Self::DisableAutoJoin,
            "ping" => Self::Ping,
            "status" => Self::Status,
            "help" => Self::Help,
            _ => return Err(spec.usage),
        };

        match &command {
            Self::Join(names) if names.is_empty() => Err(spec.usage),
            _ => Ok(command),
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddPack(_) => "addpack",
            Self::Off => "off",
            Self::On => "on",
            Self::LeaveRestricted => "leave_restricted",
            Self::Broadcast(_) => "broadcast",
            Self::Forward(_) => "forward",
            Self::Share(_) => "share",
            Self::ShareLink(_) => "sharelink",
            Self::GetSticker => "getsticker",
            Self::Join(_) => "join",
            Self::EnableReact => "enablereact",
            Self::DisableReact => "disablereact",
            Self::EnableAutoJoin => "enableautojoin",
            Self::DisableAutoJoin => "disableautojoin",
            Self::Ping => "ping",
            Self::Help => "help",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward(channel) | Self::Share(channel) => write!(f, "{} {channel}", self.name()),
            Self::Join(names) => write!(f, "join {}", names.join(" ")),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::ChatId;
    use crate::telegram::links::LinkChannel;

    const PREFIX: &str = ".";

    fn parse(text: &str) -> Option<Result<BotCommand, UsageError>> {
        BotCommand::parse(text, PREFIX)
    }

    #[test]
    fn test_every_registered_token_parses() {
        for spec in COMMANDS {
            let text = if spec.takes_args {
                match spec.token {
                    "sharelink" => ".sharelink https://t.me/news/1".to_owned(),
                    other => format!(".{other} news"),
                }
            } else {
                format!(".{}", spec.token)
            };
            let parsed = parse(&text);
            assert!(
                matches!(parsed, Some(Ok(ref cmd)) if cmd.name() == spec.token),
                "{text} parsed as {parsed:?}"
            );
        }
    }

    #[test]
    fn test_parse_is_case_insensitive_and_ignores_mention() {
        assert_eq!(parse(".PING"), Some(Ok(BotCommand::Ping)));
        assert_eq!(parse(".ping@my_account"), Some(Ok(BotCommand::Ping)));
        assert_eq!(parse("  .On  "), Some(Ok(BotCommand::On)));
    }

    #[test]
    fn test_parse_not_a_command() {
        assert_eq!(parse("ping"), None);
        assert_eq!(parse(".unknown"), None);
        assert_eq!(parse("/ping"), None);
    }

    #[test]
    fn test_missing_arguments_yield_usage() {
        assert_eq!(
            parse(".addpack"),
            Some(Err(UsageError {
                message: "Usage: .addpack <sticker_token>"
            }))
        );
        assert!(matches!(parse(".broadcast   "), Some(Err(_))));
        assert!(matches!(parse(".join"), Some(Err(_))));
        assert!(matches!(parse(".join @"), Some(Err(_))));
    }

    #[test]
    fn test_parse_join_strips_at() {
        assert_eq!(
            parse(".join @foo bar"),
            Some(Ok(BotCommand::Join(vec!["foo".into(), "bar".into()])))
        );
    }

    #[test]
    fn test_parse_broadcast_keeps_full_text() {
        assert_eq!(
            parse(".broadcast Hello   world\nline two"),
            Some(Ok(BotCommand::Broadcast("Hello   world\nline two".into())))
        );
    }

    #[test]
    fn test_parse_channel_commands() {
        assert_eq!(
            parse(".forward @news"),
            Some(Ok(BotCommand::Forward(ChannelRef::Username("news".into()))))
        );
        assert_eq!(
            parse(".share -1001234567890"),
            Some(Ok(BotCommand::Share(ChannelRef::Id(ChatId(-1_001_234_567_890)))))
        );
        assert_eq!(
            parse(".forward bad!name"),
            Some(Err(UsageError {
                message: INVALID_CHANNEL
            }))
        );
        for out_of_range in [".forward 9223372036854775807", ".share -9223372036854775808"] {
            assert_eq!(
                parse(out_of_range),
                Some(Err(UsageError {
                    message: INVALID_CHANNEL
                }))
            );
        }
    }

    #[test]
    fn test_parse_sharelink_and_alias() {
        let Some(Ok(BotCommand::ShareLink(link))) = parse(".s https://t.me/c/123456789/2354") else {
            panic!("expected a sharelink command");
        };
        assert_eq!(link.channel, LinkChannel::Private(123_456_789));
        assert_eq!(link.message_id, 2354);

        assert_eq!(
            parse(".sharelink not-a-link"),
            Some(Err(UsageError {
                message: INVALID_LINK
            }))
        );
    }

    #[test]
    fn test_command_result() {
        let ok = CommandResult::success("done");
        assert!(ok.success);
        let err = CommandResult::error("failed");
        assert!(!err.success);
        assert_eq!(err.message, "failed");
    }
}
