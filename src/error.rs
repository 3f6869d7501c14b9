//! Error types for the throttle bot

use thiserror::Error;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel error (transient Bot API failure, rate limit, network)
    #[error("channel error: {0}")]
    Channel(String),

    /// The referenced message was deleted or can no longer be edited
    #[error("message gone: {0}")]
    MessageGone(String),

    /// Downstream handler failure
    #[error("handler error: {0}")]
    Handler(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure means the target message is no longer reachable.
    ///
    /// Countdown sessions stop on these; every other notifier failure is
    /// treated as transient.
    #[must_use]
    pub const fn is_message_gone(&self) -> bool {
        matches!(self, Self::MessageGone(_))
    }
}
