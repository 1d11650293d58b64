//! Chat notifications for CI build lifecycle events.
//!
//! When a build starts or finishes, the notifier resolves who should hear
//! about it (pull request participants plus a statically configured
//! channel), binds one messenger per recipient and posts a formatted
//! message to the chat provider's webhook.
//!
//! # Usage
//!
//! ```no_run
//! use build_notify::{BuildListener, BuildNotifier, BuildEvent};
//!
//! # async fn run(event: BuildEvent) -> Result<(), build_notify::ChannelError> {
//! let notifier = BuildNotifier::from_env("https://ci.example.com")?;
//!
//! // Called by the build server; never fails.
//! notifier.on_build_finished(&event).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Settings are read from the build's parameters, falling back to the
//! notifier's own source (the process environment for
//! [`BuildNotifier::from_env`]):
//!
//! - `system.slack.url`: webhook URL
//! - `system.slack.username`: bot display name
//! - `system.slack.channel`: channel notified on every build
//! - `system.slack.report_starting`, `system.slack.report_failure`,
//!   `system.slack.report_success`: set to "true" to enable each class
//! - `system.slack.use_attachment`: "false" switches to plain text messages
//!
//! # Architecture
//!
//! - [`recipients::resolve`] merges and deduplicates recipients
//! - [`channels::build_messengers`] binds valid recipients to [`Messenger`]s
//! - [`SlackMessenger`] formats the payload and hands it to
//!   [`WebhookTransport`]
//! - [`BuildNotifier`] runs the whole dispatch and implements
//!   [`BuildListener`]

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod config;
pub mod error;
pub mod events;
pub mod listener;
pub mod recipients;
pub mod transport;

pub use channels::{Messenger, SlackMessenger};
pub use config::{ConfigSource, EnvSource, Layered, NotifierConfig};
pub use error::{ChannelError, ConfigError};
pub use events::{
    BuildEvent, BuildStatus, Notification, NotificationKind, PullRequestInfo, StatusColor,
};
pub use listener::BuildListener;
pub use transport::WebhookTransport;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome counts of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Unique recipients after resolution
    pub resolved: usize,
    /// Recipients without a messenger because of missing configuration
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchSummary {
    /// Number of delivery attempts made.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Dispatches build notifications to every resolved recipient.
pub struct BuildNotifier {
    server_url: String,
    transport: WebhookTransport,
    fallback: Arc<dyn ConfigSource>,
    extra_recipients: Vec<String>,
}

impl BuildNotifier {
    /// Create a notifier that reads configuration from build parameters only.
    #[must_use]
    pub fn new(server_url: impl Into<String>, transport: WebhookTransport) -> Self {
        Self {
            server_url: server_url.into(),
            transport,
            fallback: Arc::new(HashMap::<String, String>::new()),
            extra_recipients: vec![],
        }
    }

    /// Create a notifier that falls back to environment variables for
    /// settings the build does not carry.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env(server_url: impl Into<String>) -> Result<Self, ChannelError> {
        Ok(Self::new(server_url, WebhookTransport::new()?).with_fallback(EnvSource))
    }

    /// Use `source` for settings missing from the build parameters.
    #[must_use]
    pub fn with_fallback(mut self, source: impl ConfigSource + 'static) -> Self {
        self.fallback = Arc::new(source);
        self
    }

    /// Recipients notified on every dispatch in addition to the build's own.
    #[must_use]
    pub fn with_extra_recipients(mut self, recipients: Vec<String>) -> Self {
        self.extra_recipients = recipients;
        self
    }

    /// Send the notification class `kind` for `build` if its flag is on.
    ///
    /// Returns `None` when the class is disabled.
    pub async fn notify(&self, kind: NotificationKind, build: &BuildEvent) -> Option<DispatchSummary> {
        let source = Layered::new(&build.parameters, self.fallback.as_ref());

        if !config::flag_enabled(&source, kind.flag_key()) {
            debug!(
                build_id = %build.build_id,
                flag = kind.flag_key(),
                "Notification class disabled, skipping"
            );
            return None;
        }

        let config = NotifierConfig::from_source(&source);
        let notification = Notification::for_build(kind, build);

        Some(
            self.dispatch(build, &config, &notification, &self.extra_recipients)
                .await,
        )
    }

    /// Resolve recipients, build messengers and deliver to each.
    ///
    /// Every messenger is attempted once, in resolution order. Failures are
    /// logged with the recipient and never stop the batch.
    pub async fn dispatch(
        &self,
        build: &BuildEvent,
        config: &NotifierConfig,
        notification: &Notification,
        extra_recipients: &[String],
    ) -> DispatchSummary {
        let extra = config
            .default_channel
            .iter()
            .chain(extra_recipients)
            .cloned();
        let recipients =
            recipients::resolve(build.pull_request.recipients.iter().cloned(), Some(extra));

        let messengers = channels::build_messengers(
            &recipients,
            config,
            &build.pull_request.url,
            &self.server_url,
            &self.transport,
        );

        let mut summary = DispatchSummary {
            resolved: recipients.len(),
            skipped: recipients.len() - messengers.len(),
            ..DispatchSummary::default()
        };

        for messenger in &messengers {
            match messenger.send(build, notification).await {
                Ok(body) => {
                    summary.delivered += 1;
                    debug!(
                        channel = messenger.name(),
                        recipient = %messenger.recipient(),
                        response = %body,
                        "Notification sent"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        channel = messenger.name(),
                        recipient = %messenger.recipient(),
                        status = ?e.status(),
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }

        info!(
            build_id = %build.build_id,
            status = ?build.status,
            resolved = summary.resolved,
            skipped = summary.skipped,
            delivered = summary.delivered,
            failed = summary.failed,
            "Build notification dispatched"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(recipients: &[&str], parameters: &[(&str, &str)]) -> BuildEvent {
        BuildEvent {
            project_name: "core".to_string(),
            build_number: "1".to_string(),
            build_id: "10".to_string(),
            build_type_id: "Core_Build".to_string(),
            status: BuildStatus::Failure,
            status_description: "Compile error".to_string(),
            pull_request: PullRequestInfo {
                url: String::new(),
                branch: "main".to_string(),
                recipients: recipients.iter().map(|r| (*r).to_string()).collect(),
            },
            parameters: parameters
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_disabled_class_is_not_dispatched() {
        let notifier = BuildNotifier::new("https://ci.example.com", WebhookTransport::new().unwrap());
        let event = build(&["@alice"], &[(config::keys::REPORT_FAILURE, "false")]);
        assert_eq!(notifier.notify(NotificationKind::Failed, &event).await, None);

        let event = build(&["@alice"], &[]);
        assert_eq!(notifier.notify(NotificationKind::Failed, &event).await, None);
    }

    #[tokio::test]
    async fn test_missing_config_skips_every_recipient() {
        let notifier = BuildNotifier::new("https://ci.example.com", WebhookTransport::new().unwrap());
        let event = build(&["x", "y"], &[(config::keys::REPORT_FAILURE, "TRUE")]);

        let summary = notifier
            .notify(NotificationKind::Failed, &event)
            .await
            .unwrap();

        assert_eq!(
            summary,
            DispatchSummary {
                resolved: 2,
                skipped: 2,
                delivered: 0,
                failed: 0,
            }
        );
        assert_eq!(summary.attempted(), 0);
    }

    #[tokio::test]
    async fn test_default_channel_deduplicates_with_participants() {
        let notifier = BuildNotifier::new("https://ci.example.com", WebhookTransport::new().unwrap())
            .with_extra_recipients(vec!["#builds".to_string(), "@ops".to_string()]);
        let event = build(
            &["@alice", "#builds"],
            &[
                (config::keys::REPORT_FAILURE, "true"),
                (config::keys::CHANNEL, "#builds"),
            ],
        );

        // No bot name or webhook: nothing is sent, but resolution is visible.
        let summary = notifier
            .notify(NotificationKind::Failed, &event)
            .await
            .unwrap();
        assert_eq!(summary.resolved, 3);
        assert_eq!(summary.skipped, 3);
    }
}
