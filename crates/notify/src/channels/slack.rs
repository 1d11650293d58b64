//! Slack incoming-webhook messenger.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Messenger;
use crate::config::NotifierConfig;
use crate::error::{ChannelError, ConfigError};
use crate::events::{BuildEvent, Notification, StatusColor};
use crate::transport::WebhookTransport;

/// Characters that would break out of a quoted string or a Slack link.
/// `%` is included so existing escapes survive a decode unchanged.
const QUOTE_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'|')
    .add(b'`');

const PRETEXT: &str = "Build Status";

/// Messenger bound to one Slack recipient.
#[derive(Debug, Clone)]
pub struct SlackMessenger {
    recipient: String,
    bot_name: String,
    webhook_url: String,
    pull_request_url: String,
    server_url: String,
    use_attachments: bool,
    transport: WebhookTransport,
}

impl SlackMessenger {
    /// Bind a recipient to the provider settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the recipient, the bot name or the
    /// webhook URL is blank.
    pub fn new(
        recipient: &str,
        config: &NotifierConfig,
        pull_request_url: &str,
        server_url: &str,
        transport: WebhookTransport,
    ) -> Result<Self, ConfigError> {
        let recipient = required(Some(recipient), ConfigError::MissingRecipient)?;
        let bot_name = required(config.bot_name.as_deref(), ConfigError::MissingBotName)?;
        let webhook_url = required(config.webhook_url.as_deref(), ConfigError::MissingWebhookUrl)?;

        Ok(Self {
            recipient,
            bot_name,
            webhook_url,
            pull_request_url: pull_request_url.to_string(),
            server_url: server_url.to_string(),
            use_attachments: config.use_attachments,
            transport,
        })
    }

    /// Compose the payload for a notification. Pure; no I/O.
    #[must_use]
    pub fn format_payload(&self, build: &BuildEvent, notification: &Notification) -> SlackPayload {
        let log_url = escape_url_for_quotes(&build.log_url(&self.server_url));
        let pull_request_url = escape_url_for_quotes(&self.pull_request_url);
        let branch = build.branch();
        let message = Self::format_message(build, notification, &log_url, &pull_request_url);

        let (text, attachments) = if self.use_attachments {
            let mut fields = vec![SlackField {
                title: "Status".to_string(),
                value: escape_mrkdwn(&notification.status_text),
                short: false,
            }];

            if !branch.is_empty() {
                fields.push(SlackField {
                    title: "Branch".to_string(),
                    value: escape_mrkdwn(branch),
                    short: true,
                });
            }

            if !pull_request_url.is_empty() {
                fields.push(SlackField {
                    title: "Pull Request".to_string(),
                    value: pull_request_url.clone(),
                    short: true,
                });
            }

            for (key, value) in &notification.messages {
                fields.push(SlackField {
                    title: escape_mrkdwn(key),
                    value: escape_mrkdwn(value),
                    short: true,
                });
            }

            let attachment = SlackAttachment {
                fallback: message,
                pretext: PRETEXT.to_string(),
                color: notification.color.as_str().to_string(),
                title: format!(
                    "{} #{}",
                    escape_mrkdwn(&build.project_name),
                    escape_mrkdwn(&build.build_number)
                ),
                title_link: log_url,
                fields,
            };

            (None, vec![attachment])
        } else {
            let mut text = message;
            for (key, value) in &notification.messages {
                text.push_str(&format!("\n*{}:* {}", escape_mrkdwn(key), escape_mrkdwn(value)));
            }
            (Some(text), vec![])
        };

        SlackPayload {
            channel: self.recipient.clone(),
            username: self.bot_name.clone(),
            text,
            attachments,
            use_attachments: self.use_attachments,
        }
    }

    /// One-line message used as plain text or as the attachment fallback.
    fn format_message(
        build: &BuildEvent,
        notification: &Notification,
        log_url: &str,
        pull_request_url: &str,
    ) -> String {
        let emoji = match notification.color {
            StatusColor::Danger => ":x: ",
            StatusColor::Good => ":white_check_mark: ",
            StatusColor::Warning => "",
        };

        let branch = build.branch();
        let branch = if branch.is_empty() {
            String::new()
        } else {
            format!(" [{}]", escape_mrkdwn(branch))
        };

        let mut message = format!(
            "{emoji}{}{branch} #{} <{log_url}|{}>",
            escape_mrkdwn(&build.project_name),
            escape_mrkdwn(&build.build_number),
            escape_mrkdwn(&notification.status_text),
        );

        if !pull_request_url.is_empty() {
            message.push_str(&format!(" (<{pull_request_url}|pull request>)"));
        }

        message
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    async fn send(
        &self,
        build: &BuildEvent,
        notification: &Notification,
    ) -> Result<String, ChannelError> {
        let payload = self.format_payload(build, notification);
        let body = serde_json::to_vec(&payload)?;

        debug!(
            channel = "slack",
            recipient = %self.recipient,
            payload = %String::from_utf8_lossy(&body),
            "Sending notification"
        );

        self.transport.deliver(&self.webhook_url, body).await
    }
}

fn required(value: Option<&str>, err: ConfigError) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(err),
    }
}

/// Percent-encode characters that are unsafe inside a quoted string or a
/// Slack `<url|label>` link.
#[must_use]
pub fn escape_url_for_quotes(url: &str) -> String {
    utf8_percent_encode(url, QUOTE_UNSAFE).to_string()
}

/// Escape the three characters Slack reserves in message text.
#[must_use]
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub channel: String,
    pub username: String,
    /// Plain message, set when attachments are off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
    /// Shapes the wire body; not sent itself
    #[serde(skip)]
    pub use_attachments: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAttachment {
    pub fallback: String,
    pub pretext: String,
    pub color: String,
    pub title: String,
    pub title_link: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}
