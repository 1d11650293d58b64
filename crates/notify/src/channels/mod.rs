//! Messenger implementations and the builder that binds them to recipients.

pub mod slack;

use async_trait::async_trait;
use tracing::error;

use crate::config::NotifierConfig;
use crate::error::ChannelError;
use crate::events::{BuildEvent, Notification};
use crate::transport::WebhookTransport;

pub use slack::SlackMessenger;

/// A fully configured unit that delivers one notification to one recipient.
///
/// New chat providers add new implementations of this trait.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Get the name of the provider.
    fn name(&self) -> &'static str;

    /// Recipient this messenger is bound to.
    fn recipient(&self) -> &str;

    /// Deliver a notification about `build`, returning the provider's
    /// response body.
    async fn send(
        &self,
        build: &BuildEvent,
        notification: &Notification,
    ) -> Result<String, ChannelError>;
}

/// Build one messenger per valid recipient, preserving recipient order.
///
/// Recipients that cannot be bound (blank recipient, bot name or webhook
/// URL) are skipped with an error log.
#[must_use]
pub fn build_messengers(
    recipients: &[String],
    config: &NotifierConfig,
    pull_request_url: &str,
    server_url: &str,
    transport: &WebhookTransport,
) -> Vec<Box<dyn Messenger>> {
    let mut messengers: Vec<Box<dyn Messenger>> = Vec::with_capacity(recipients.len());

    for recipient in recipients {
        match SlackMessenger::new(
            recipient,
            config,
            pull_request_url,
            server_url,
            transport.clone(),
        ) {
            Ok(messenger) => messengers.push(Box::new(messenger)),
            Err(e) => {
                error!(
                    recipient = %recipient,
                    error = %e,
                    "Could not send Slack notification; check the recipient, bot name and webhook URL settings"
                );
            }
        }
    }

    messengers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(bot_name: Option<&str>, webhook_url: Option<&str>) -> NotifierConfig {
        NotifierConfig {
            webhook_url: webhook_url.map(str::to_string),
            bot_name: bot_name.map(str::to_string),
            ..NotifierConfig::default()
        }
    }

    fn recipients(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[test]
    fn test_missing_bot_name_builds_nothing() {
        let transport = WebhookTransport::new().unwrap();
        let messengers = build_messengers(
            &recipients(&["x", "y"]),
            &config(None, Some("https://hooks.example.com/T1")),
            "",
            "https://ci.example.com",
            &transport,
        );
        assert!(messengers.is_empty());
    }

    #[test]
    fn test_each_skipped_recipient_logs_an_error() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let transport = WebhookTransport::new().unwrap();
        let messengers = tracing::subscriber::with_default(subscriber, || {
            build_messengers(
                &recipients(&["x", "y"]),
                &config(None, Some("https://hooks.example.com/T1")),
                "",
                "https://ci.example.com",
                &transport,
            )
        });
        assert!(messengers.is_empty());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let errors: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("ERROR") && line.contains("Could not send Slack notification"))
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("recipient=x"));
        assert!(errors[1].contains("recipient=y"));
        assert!(errors[0].contains("bot name is not configured"));
    }

    #[test]
    fn test_missing_webhook_builds_nothing() {
        let transport = WebhookTransport::new().unwrap();
        let messengers = build_messengers(
            &recipients(&["x"]),
            &config(Some("ci-bot"), Some("")),
            "",
            "https://ci.example.com",
            &transport,
        );
        assert!(messengers.is_empty());
    }

    #[test]
    fn test_blank_recipient_is_skipped_in_order() {
        let transport = WebhookTransport::new().unwrap();
        let messengers = build_messengers(
            &recipients(&["#builds", "", "@alice"]),
            &config(Some("ci-bot"), Some("https://hooks.example.com/T1")),
            "https://git.example.com/pr/1",
            "https://ci.example.com",
            &transport,
        );
        let bound: Vec<&str> = messengers.iter().map(|m| m.recipient()).collect();
        assert_eq!(bound, vec!["#builds", "@alice"]);
        assert!(messengers.iter().all(|m| m.name() == "slack"));
    }
}
