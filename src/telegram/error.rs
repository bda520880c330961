//! Error taxonomy for Telegram operations and the policy that decides what a
//! handler does with each kind of failure.

use std::time::Duration;

use grammers_client::InvocationError;
use grammers_client::client::PasswordToken;
use thiserror::Error;

/// Wait applied when the server asks to slow down without a usable value.
pub const DEFAULT_FLOOD_WAIT: Duration = Duration::from_secs(60);

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Flood wait required: {}", describe_wait(.seconds))]
    FloodWait { seconds: Option<u32> },

    #[error("Cannot write to this chat: {0}")]
    WriteForbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Telegram error {code}: {name}")]
    Rpc { code: i32, name: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),
}

#[allow(clippy::ref_option)]
fn describe_wait(seconds: &Option<u32>) -> String {
    seconds.map_or_else(|| "unknown duration".to_owned(), |s| format!("{s} seconds"))
}

/// What a caller should do about a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Wait and try again (bounded by the flood-control policy).
    Retry { after: Duration },
    /// The agent can no longer post here; leave the group where applicable.
    LeaveGroup,
    /// Bad input from the user; tell them and carry on.
    Report,
    /// Unexpected; log with detail and fall back to a generic reply.
    Log,
}

impl TelegramError {
    /// Decides how callers treat this error.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::FloodWait { .. } => Disposition::Retry {
                after: self.flood_wait().unwrap_or(DEFAULT_FLOOD_WAIT),
            },
            Self::WriteForbidden(_) => Disposition::LeaveGroup,
            Self::NotFound(_) => Disposition::Report,
            _ => Disposition::Log,
        }
    }

    /// Wait requested by a rate-limit error, if this is one.
    ///
    /// A missing value is coerced to [`DEFAULT_FLOOD_WAIT`].
    #[must_use]
    pub fn flood_wait(&self) -> Option<Duration> {
        match self {
            Self::FloodWait { seconds } => Some(
                seconds.map_or(DEFAULT_FLOOD_WAIT, |s| Duration::from_secs(u64::from(s))),
            ),
            _ => None,
        }
    }

    /// Whether the failure comes from the transport rather than the server.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Session(_))
    }
}

/// RPC error names meaning the account may not post in the chat.
const WRITE_FORBIDDEN: &[&str] = &[
    "CHAT_WRITE_FORBIDDEN",
    "CHAT_RESTRICTED",
    "CHAT_ADMIN_REQUIRED",
    "CHAT_GUEST_SEND_FORBIDDEN",
    "CHAT_SEND_PLAIN_FORBIDDEN",
    "CHAT_SEND_STICKERS_FORBIDDEN",
    "USER_BANNED_IN_CHANNEL",
    "CHANNEL_PRIVATE",
];

/// RPC error names meaning a referenced peer, message or link does not exist.
const NOT_FOUND: &[&str] = &[
    "PEER_ID_INVALID",
    "CHANNEL_INVALID",
    "CHAT_ID_INVALID",
    "USERNAME_INVALID",
    "USERNAME_NOT_OCCUPIED",
    "MSG_ID_INVALID",
    "MESSAGE_ID_INVALID",
    "INVITE_HASH_INVALID",
    "INVITE_HASH_EXPIRED",
    "INVITE_HASH_EMPTY",
];

/// RPC error names carrying a wait in their value.
const RATE_LIMITED: &[&str] = &["FLOOD_WAIT", "FLOOD_PREMIUM_WAIT", "SLOWMODE_WAIT"];

impl TelegramError {
    /// Classifies an RPC error by name.
    #[must_use]
    pub fn from_rpc(code: i32, name: &str, value: Option<u32>) -> Self {
        if RATE_LIMITED.contains(&name) {
            return Self::FloodWait { seconds: value };
        }
        if WRITE_FORBIDDEN.contains(&name) {
            return Self::WriteForbidden(name.to_owned());
        }
        if NOT_FOUND.contains(&name) {
            return Self::NotFound(name.to_owned());
        }
        Self::Rpc {
            code,
            name: name.to_owned(),
        }
    }
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::Rpc(rpc) => Self::from_rpc(rpc.code, &rpc.name, rpc.value),
            other => {
                let err_str = other.to_string();
                // Some transports only surface the flood wait in the message.
                if let Some(seconds) = extract_flood_wait_seconds(&err_str) {
                    return Self::FloodWait {
                        seconds: Some(seconds),
                    };
                }
                Self::Connection(err_str)
            }
        }
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["flood_wait_", "flood wait "];
    let lower = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lower.find(pattern) {
            let start = idx + pattern.len();
            let num_str: String = lower[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_rpc_classification() {
        assert!(matches!(
            TelegramError::from_rpc(420, "FLOOD_WAIT", Some(7)),
            TelegramError::FloodWait { seconds: Some(7) }
        ));
        assert!(matches!(
            TelegramError::from_rpc(403, "CHAT_WRITE_FORBIDDEN", None),
            TelegramError::WriteForbidden(_)
        ));
        assert!(matches!(
            TelegramError::from_rpc(400, "USERNAME_NOT_OCCUPIED", None),
            TelegramError::NotFound(_)
        ));
        assert!(matches!(
            TelegramError::from_rpc(500, "INTERNAL", None),
            TelegramError::Rpc { code: 500, .. }
        ));
    }

    #[test]
    fn test_flood_wait_defaults_when_missing() {
        let missing = TelegramError::FloodWait { seconds: None };
        assert_eq!(missing.flood_wait(), Some(DEFAULT_FLOOD_WAIT));

        let zero = TelegramError::FloodWait { seconds: Some(0) };
        assert_eq!(zero.flood_wait(), Some(Duration::ZERO));

        let given = TelegramError::FloodWait { seconds: Some(3) };
        assert_eq!(given.flood_wait(), Some(Duration::from_secs(3)));

        assert_eq!(TelegramError::NotFound("x".into()).flood_wait(), None);
    }

    #[test]
    fn test_disposition() {
        assert_eq!(
            TelegramError::FloodWait { seconds: Some(2) }.disposition(),
            Disposition::Retry {
                after: Duration::from_secs(2)
            }
        );
        assert_eq!(
            TelegramError::WriteForbidden("CHAT_WRITE_FORBIDDEN".into()).disposition(),
            Disposition::LeaveGroup
        );
        assert_eq!(
            TelegramError::NotFound("PEER_ID_INVALID".into()).disposition(),
            Disposition::Report
        );
        assert_eq!(
            TelegramError::Connection("reset".into()).disposition(),
            Disposition::Log
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(TelegramError::Connection("eof".into()).is_transport());
        assert!(!TelegramError::Rpc { code: 400, name: "X".into() }.is_transport());
    }
}
