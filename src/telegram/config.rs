//! Telegram client configuration.

use std::fmt;

use crate::error::EngineError;

/// Default Bot API base URL.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Settings for talking to the Bot API.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: String,
    /// Base URL of the Bot API, without a trailing slash.
    pub api_url: String,
    /// Seconds the server may hold a `getUpdates` call open. Zero means short polling.
    pub poll_timeout_secs: u64,
    /// Log every fetched batch and incoming message at debug level.
    pub log_updates: bool,
}

impl TelegramConfig {
    /// Configuration with default URL and poll timeout for `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_timeout_secs: 30,
            log_updates: false,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// - `TELEGRAM_BOT_TOKEN` (required)
    /// - `TELEGRAM_API_URL` (default `https://api.telegram.org`)
    /// - `TELEGRAM_POLL_TIMEOUT` in seconds (default 30)
    /// - `TELEGRAM_LOG_UPDATES` (`1`/`true` to enable)
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the token is missing or a value does not parse.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the token is missing or a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EngineError::Config {
                key: "TELEGRAM_BOT_TOKEN".to_string(),
                message: "must be set".to_string(),
            })?;

        let mut config = Self::new(token.trim());

        if let Some(url) = lookup("TELEGRAM_API_URL") {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("TELEGRAM_POLL_TIMEOUT") {
            config.poll_timeout_secs = raw.trim().parse().map_err(|e| EngineError::Config {
                key: "TELEGRAM_POLL_TIMEOUT".to_string(),
                message: format!("invalid number of seconds '{raw}': {e}"),
            })?;
        }

        if let Some(raw) = lookup("TELEGRAM_LOG_UPDATES") {
            config.log_updates = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(EngineError::Config {
                        key: "TELEGRAM_LOG_UPDATES".to_string(),
                        message: format!("expected a boolean, got '{other}'"),
                    })
                }
            };
        }

        Ok(config)
    }
}

fn preview(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    format!("{head}...")
}

// Keeps the token out of logs.
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &preview(&self.token))
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("log_updates", &self.log_updates)
            .finish()
    }
}
