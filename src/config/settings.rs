//! Application settings and Telegram configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use super::{
    DEFAULT_JOIN_DELAY_SECS, DEFAULT_MAX_DELAY_SECS, DEFAULT_MIN_DELAY_SECS, DEFAULT_WORKERS,
};

/// Telegram API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("userbot.session")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` (or the shorter `API_ID` and
    /// `API_HASH`) to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = env_any(&["TG_API_ID", "API_ID"])
            .ok_or(ConfigError::MissingEnvVar("TG_API_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = env_any(&["TG_API_HASH", "API_HASH"])
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let session_path =
            std::env::var("TG_SESSION_PATH").map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            session_path,
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Path to the sticker identifier file.
    pub store_path: PathBuf,

    /// Prefix that marks a message as a command.
    pub command_prefix: String,

    /// User ids allowed to run commands and trigger auto-join.
    pub sudo_users: HashSet<i64>,

    /// Lower bound of the pause between two automatic stickers, in seconds.
    pub min_delay_secs: u64,

    /// Upper bound of the pause between two automatic stickers, in seconds.
    pub max_delay_secs: u64,

    /// Pause between two consecutive joins.
    pub join_delay_secs: u64,

    /// Maximum number of messages handled concurrently.
    pub workers: usize,

    /// Reaction attached by the reaction handler.
    pub reaction: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sticker_packs.json")
}

fn default_command_prefix() -> String {
    ".".to_owned()
}

const fn default_min_delay() -> u64 {
    DEFAULT_MIN_DELAY_SECS
}

const fn default_max_delay() -> u64 {
    DEFAULT_MAX_DELAY_SECS
}

const fn default_join_delay() -> u64 {
    DEFAULT_JOIN_DELAY_SECS
}

const fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_reaction() -> String {
    "❤️".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            command_prefix: default_command_prefix(),
            sudo_users: HashSet::new(),
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            join_delay_secs: default_join_delay(),
            workers: default_workers(),
            reaction: default_reaction(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// resulting settings are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let sudo_users = match std::env::var("SUDO_USERS") {
            Ok(raw) => parse_sudo_users(&raw)?,
            Err(_) => HashSet::new(),
        };

        let settings = Self {
            store_path: std::env::var("STICKER_STORE_PATH")
                .map_or_else(|_| default_store_path(), PathBuf::from),
            command_prefix: std::env::var("COMMAND_PREFIX")
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(default_command_prefix),
            sudo_users,
            min_delay_secs: parse_env_or("MIN_DELAY", default_min_delay())?,
            max_delay_secs: parse_env_or("MAX_DELAY", default_max_delay())?,
            join_delay_secs: parse_env_or("JOIN_DELAY", default_join_delay())?,
            workers: parse_env_or("WORKERS", default_workers())?,
            reaction: std::env::var("REACTION_EMOJI")
                .ok()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(default_reaction),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the delay window is inverted or no workers are
    /// configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_secs > self.max_delay_secs {
            return Err(ConfigError::InvalidDelayWindow {
                min: self.min_delay_secs,
                max: self.max_delay_secs,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                name: "WORKERS",
                value: "0".to_owned(),
            });
        }
        Ok(())
    }

    /// Checks whether a user may run commands.
    #[must_use]
    pub fn is_privileged(&self, user_id: i64) -> bool {
        self.sudo_users.contains(&user_id)
    }
}

/// Parses a comma-separated list of user ids. Blank entries are skipped.
///
/// # Errors
///
/// Returns an error on the first entry that is not an integer.
pub fn parse_sudo_users(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                name: "SUDO_USERS",
                value: s.to_owned(),
            })
        })
        .collect()
}

fn env_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}

fn parse_env_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("MIN_DELAY ({min}) must not exceed MAX_DELAY ({max})")]
    InvalidDelayWindow { min: u64, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.command_prefix, ".");
        assert_eq!(settings.min_delay_secs, 5);
        assert_eq!(settings.max_delay_secs, 20);
        assert_eq!(settings.join_delay_secs, 30);
        assert_eq!(settings.workers, 20);
        assert_eq!(settings.store_path, PathBuf::from("sticker_packs.json"));
        assert!(settings.sudo_users.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("userbot.session"));
    }

    #[test]
    fn test_parse_sudo_users() {
        let users = parse_sudo_users("111, 222,,333 ").unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.contains(&111));
        assert!(users.contains(&333));

        assert!(parse_sudo_users("").unwrap().is_empty());
        assert!(matches!(
            parse_sudo_users("111,abc"),
            Err(ConfigError::InvalidValue { name: "SUDO_USERS", .. })
        ));
    }

    #[test]
    fn test_inverted_delay_window_rejected() {
        let settings = BotSettings {
            min_delay_secs: 30,
            max_delay_secs: 10,
            ..BotSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidDelayWindow { min: 30, max: 10 })
        ));
    }

    #[test]
    fn test_equal_delays_allowed() {
        let settings = BotSettings {
            min_delay_secs: 7,
            max_delay_secs: 7,
            ..BotSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let settings = BotSettings {
            workers: 0,
            ..BotSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_is_privileged() {
        let settings = BotSettings {
            sudo_users: [42].into_iter().collect(),
            ..BotSettings::default()
        };
        assert!(settings.is_privileged(42));
        assert!(!settings.is_privileged(7));
    }
}
