//! Configuration and settings management
//!
//! Loads settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use teloxide::types::ChatId;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token (`TELEGRAM_TOKEN`, or `BOT_TOKEN` as fallback)
    #[serde(default)]
    pub telegram_token: String,

    /// Chat that receives all forwarded messages; always allowed to use `/log`
    pub creator_chat_id: i64,

    /// Comma-separated list of additional user IDs allowed to use `/log`
    #[serde(rename = "allowed_users")]
    pub allowed_users_str: Option<String>,

    /// Debounce delay before an album is flushed, in milliseconds
    #[serde(default = "default_album_flush_delay_ms")]
    pub album_flush_delay_ms: u64,

    /// Directory holding the daily log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Bind address of the health endpoint; disabled when unset
    pub health_addr: Option<String>,
}

const fn default_album_flush_delay_ms() -> u64 {
    3000
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use relay_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or no bot token is configured.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // `APP_CREATOR_CHAT_ID=1 ./relay-bot` sets `creator_chat_id`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain variables; UPPER_SNAKE_CASE maps to snake_case, empty means unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if settings.telegram_token.is_empty() {
            if let Ok(val) = std::env::var("BOT_TOKEN") {
                if !val.is_empty() {
                    settings.telegram_token = val;
                }
            }
        }
        if settings.telegram_token.is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN (or BOT_TOKEN) is not set".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Chat receiving forwarded messages
    #[must_use]
    pub const fn creator_chat(&self) -> ChatId {
        ChatId(self.creator_chat_id)
    }

    /// Returns the set of Telegram IDs allowed to use `/log`, creator included
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        let mut allowed: HashSet<i64> = self
            .allowed_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default();
        allowed.insert(self.creator_chat_id);
        allowed
    }

    /// Debounce delay before an album is flushed
    #[must_use]
    pub const fn album_flush_delay(&self) -> Duration {
        Duration::from_millis(self.album_flush_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn settings() -> Settings {
        Settings {
            telegram_token: "dummy".to_string(),
            creator_chat_id: 100,
            allowed_users_str: None,
            album_flush_delay_ms: default_album_flush_delay_ms(),
            log_dir: default_log_dir(),
            health_addr: None,
        }
    }

    // Single test so environment variables are not raced by parallel tests
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Standard loading with defaults
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        env::set_var("CREATOR_CHAT_ID", "12345");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.creator_chat(), ChatId(12345));
        assert_eq!(settings.album_flush_delay(), Duration::from_secs(3));
        assert_eq!(settings.log_dir, PathBuf::from("."));

        // 2. BOT_TOKEN fallback
        env::remove_var("TELEGRAM_TOKEN");
        env::set_var("BOT_TOKEN", "legacy_token");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "legacy_token");

        // 3. Missing token is an error
        env::remove_var("BOT_TOKEN");
        assert!(Settings::new().is_err());

        env::remove_var("CREATOR_CHAT_ID");
        Ok(())
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = settings();

        // Creator is always allowed
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&100));
        assert_eq!(allowed.len(), 1);

        // Comma
        settings.allowed_users_str = Some("123,456".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&123));
        assert!(allowed.contains(&456));
        assert_eq!(allowed.len(), 3);

        // Semicolon and mixed
        settings.allowed_users_str = Some("333; 444 555".to_string());
        assert_eq!(settings.allowed_users().len(), 4);

        // Bad tokens are skipped
        settings.allowed_users_str = Some("abc, 777".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&777));
        assert_eq!(allowed.len(), 2);
    }
}
