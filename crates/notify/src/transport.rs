//! HTTPS delivery of serialized payloads.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Timeout applied to every webhook call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT_VALUE: &str = concat!("build-notify/", env!("CARGO_PKG_VERSION"));
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Posts payloads to webhook URLs.
///
/// Cloning is cheap and clones share the underlying connection pool. No
/// per-call state is kept, so independent messengers may deliver through
/// the same transport concurrently.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Create a transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ChannelError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a specific request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ChannelError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// POST `body` to `webhook_url` and return the response body.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Http`] when the connection, TLS handshake or
    ///   response read fails
    /// - [`ChannelError::Status`] when the server answers with an error
    ///   status; the server's error text is kept in `body`
    pub async fn deliver(&self, webhook_url: &str, body: Vec<u8>) -> Result<String, ChannelError> {
        let response = self
            .client
            .post(webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            debug!(status = %status, "Webhook accepted payload");
            Ok(text)
        } else {
            let body = response.text().await.unwrap_or_default();

            warn!(
                status = %status,
                body = %body,
                "Webhook request failed"
            );

            Err(ChannelError::Status { status, body })
        }
    }
}
