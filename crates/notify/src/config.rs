//! Configuration lookup and the resolved per-provider settings.
//!
//! Values come from string-keyed lookups: the build's own parameters, the
//! process environment, or any map the host supplies. Blank values are
//! treated the same as absent ones.

use std::collections::{BTreeMap, HashMap};

/// Parameter keys read by the notifier.
pub mod keys {
    /// Webhook URL of the chat provider.
    pub const WEBHOOK_URL: &str = "system.slack.url";
    /// Display name the bot posts under.
    pub const BOT_NAME: &str = "system.slack.username";
    /// Channel notified on every build in addition to PR participants.
    pub const CHANNEL: &str = "system.slack.channel";
    /// Send a notification when a build starts.
    pub const REPORT_STARTING: &str = "system.slack.report_starting";
    /// Send a notification when a build fails or errors.
    pub const REPORT_FAILURE: &str = "system.slack.report_failure";
    /// Send a notification when a build succeeds (normal or warning status).
    pub const REPORT_SUCCESS: &str = "system.slack.report_success";
    /// Render messages as attachments rather than plain text. Defaults to on.
    pub const USE_ATTACHMENT: &str = "system.slack.use_attachment";
}

/// A string-keyed configuration lookup.
pub trait ConfigSource: Send + Sync {
    /// Look up a value by key.
    fn get(&self, key: &str) -> Option<String>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Reads keys from the process environment.
///
/// `system.slack.url` is looked up as `SYSTEM_SLACK_URL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Environment variable name for a parameter key.
    #[must_use]
    pub fn var_name(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// Two sources stacked: `primary` wins whenever it has a non-blank value.
#[derive(Debug, Clone)]
pub struct Layered<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> Layered<A, B> {
    pub const fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: ConfigSource, B: ConfigSource> ConfigSource for Layered<A, B> {
    fn get(&self, key: &str) -> Option<String> {
        non_blank(self.primary.get(key)).or_else(|| self.fallback.get(key))
    }
}

/// Whether a per-event-class flag is switched on.
///
/// Only a case-insensitive `"true"` enables it; absent or any other value
/// disables it.
#[must_use]
pub fn flag_enabled(source: &dyn ConfigSource, key: &str) -> bool {
    source
        .get(key)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Resolved settings for the chat provider, shared read-only by every
/// messenger of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    pub bot_name: Option<String>,
    pub default_channel: Option<String>,
    pub use_attachments: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bot_name: None,
            default_channel: None,
            use_attachments: true,
        }
    }
}

impl NotifierConfig {
    /// Read the provider settings from a configuration source.
    #[must_use]
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let use_attachments = non_blank(source.get(keys::USE_ATTACHMENT))
            .is_none_or(|v| !v.trim().eq_ignore_ascii_case("false"));

        Self {
            webhook_url: non_blank(source.get(keys::WEBHOOK_URL)),
            bot_name: non_blank(source.get(keys::BOT_NAME)),
            default_channel: non_blank(source.get(keys::CHANNEL)),
            use_attachments,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
