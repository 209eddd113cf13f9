//! Error types for botloop.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! specific condition. Nothing in the engine is fatal: fetch errors are
//! reported and retried by the poll loop, store lookup errors are returned to
//! the caller.

use thiserror::Error;

/// Errors produced while fetching a batch of updates.
///
/// The poll loop treats every variant as transient.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {message}")]
    Network {
        message: String,
    },

    #[error("API error (code {code}): {description}")]
    Api {
        code: i64,
        description: String,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
    },

    #[error("I/O error: {message}")]
    Io {
        message: String,
    },
}

impl FetchError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "telegram")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Errors returned by keyed store lookups.
///
/// Every variant is a flavour of "not found".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Field '{field}' not found")]
    FieldNotFound {
        field: String,
    },

    #[error("Stored values are not records")]
    NotARecord,

    #[error("No value with field '{field}' matching the target")]
    NoMatch {
        field: String,
    },
}

impl StoreError {
    /// Always true; kept so callers can treat store errors uniformly with [`BotError::is_not_found`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        true
    }

    /// Returns true if the named field does not exist on the stored records.
    #[must_use]
    pub const fn is_field_not_found(&self) -> bool {
        matches!(self, Self::FieldNotFound { .. })
    }
}

/// Errors raised while configuring or starting the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn thread '{thread}': {message}")]
    Spawn {
        thread: String,
        message: String,
    },

    #[error("Invalid configuration for '{key}': {message}")]
    Config {
        key: String,
        message: String,
    },
}

/// Top-level error type for botloop.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl BotError {
    /// Returns true if this is a store lookup miss.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) => true,
            Self::Store(_) | Self::Engine(_) => false,
        }
    }
}

/// Result type alias for botloop operations.
pub type BotResult<T> = Result<T, BotError>;
