//! Error types for the notification system.

use thiserror::Error;

/// A messenger could not be built because a required value was blank.
///
/// These are soft failures: the recipient is skipped and the rest of the
/// batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The recipient identifier was empty
    #[error("recipient is empty")]
    MissingRecipient,

    /// No bot display name configured
    #[error("bot name is not configured")]
    MissingBotName,

    /// No webhook URL configured
    #[error("webhook URL is not configured")]
    MissingWebhookUrl,
}

/// Errors that can occur when sending a notification to one recipient.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection, TLS or response-read failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status
    #[error("webhook returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChannelError {
    /// HTTP status of the failed response, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            Self::Serialization(_) => None,
        }
    }
}
