//! Build lifecycle events and the notifications derived from them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Status category of a build snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Build is running
    Started,
    /// Finished normally
    #[serde(alias = "normal")]
    Success,
    /// Finished with warnings
    Warning,
    /// Finished with failed tests or steps
    Failure,
    /// Finished with an internal error
    Error,
}

impl BuildStatus {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::Error)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Warning)
    }
}

/// Coarse status indicator, rendered by the chat client as a colored bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Good,
    Warning,
    Danger,
}

impl StatusColor {
    /// Slack's named attachment color for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",       // Green
            Self::Warning => "warning", // Yellow
            Self::Danger => "danger",   // Red
        }
    }
}

/// Pull request metadata attached to a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub url: String,
    pub branch: String,
    /// Users or channels owed a notification. May be empty.
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl PullRequestInfo {
    /// Build the recipient list from source-control participants.
    ///
    /// Logins become `@login` mentions, author first. Empty logins are
    /// dropped.
    #[must_use]
    pub fn from_participants<S: AsRef<str>>(
        url: impl Into<String>,
        branch: impl Into<String>,
        author: Option<&str>,
        reviewers: &[S],
    ) -> Self {
        let recipients = author
            .into_iter()
            .chain(reviewers.iter().map(AsRef::as_ref))
            .map(str::trim)
            .filter(|login| !login.is_empty())
            .map(|login| {
                if login.starts_with('@') || login.starts_with('#') {
                    login.to_string()
                } else {
                    format!("@{login}")
                }
            })
            .collect();

        Self {
            url: url.into(),
            branch: branch.into(),
            recipients,
        }
    }
}

/// Immutable snapshot of a build, supplied by the build server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    pub project_name: String,
    pub build_number: String,
    pub build_id: String,
    pub build_type_id: String,
    pub status: BuildStatus,
    /// Human-readable status, e.g. "Tests passed: 12".
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub pull_request: PullRequestInfo,
    /// Build parameters; read through [`crate::ConfigSource`].
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl BuildEvent {
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.pull_request.branch
    }

    /// Link to the build log on the build server.
    #[must_use]
    pub fn log_url(&self, server_url: &str) -> String {
        format!(
            "{}/viewLog.html?buildId={}&buildTypeId={}",
            server_url.trim_end_matches('/'),
            self.build_id,
            self.build_type_id
        )
    }
}

/// Which class of notification a lifecycle transition produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Started,
    Failed,
    Succeeded,
}

impl NotificationKind {
    /// Classify a finished build; `None` for a status that is not terminal.
    #[must_use]
    pub const fn for_finished(status: BuildStatus) -> Option<Self> {
        if status.is_failure() {
            Some(Self::Failed)
        } else if status.is_success() {
            Some(Self::Succeeded)
        } else {
            None
        }
    }

    /// Parameter key of the flag gating this class.
    #[must_use]
    pub const fn flag_key(self) -> &'static str {
        match self {
            Self::Started => crate::config::keys::REPORT_STARTING,
            Self::Failed => crate::config::keys::REPORT_FAILURE,
            Self::Succeeded => crate::config::keys::REPORT_SUCCESS,
        }
    }

    #[must_use]
    pub const fn color(self) -> StatusColor {
        match self {
            Self::Started => StatusColor::Warning,
            Self::Failed => StatusColor::Danger,
            Self::Succeeded => StatusColor::Good,
        }
    }

    /// Status line for a build with the given description.
    #[must_use]
    pub fn status_text(self, description: &str) -> String {
        match self {
            Self::Started => "started".to_string(),
            Self::Failed => format!("failed: {description}"),
            Self::Succeeded => format!("built successfully. Finished: {description}"),
        }
    }
}

/// What every messenger of one dispatch sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub status_text: String,
    pub color: StatusColor,
    /// Extra key/value fields appended to the message.
    pub messages: BTreeMap<String, String>,
}

impl Notification {
    #[must_use]
    pub fn new(status_text: impl Into<String>, color: StatusColor) -> Self {
        Self {
            status_text: status_text.into(),
            color,
            messages: BTreeMap::new(),
        }
    }

    /// Notification for a lifecycle transition of `build`.
    #[must_use]
    pub fn for_build(kind: NotificationKind, build: &BuildEvent) -> Self {
        Self::new(kind.status_text(&build.status_description), kind.color())
    }

    #[must_use]
    pub fn with_message(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.messages.insert(key.into(), value.into());
        self
    }
}
