//! Inbound port called by the build server on lifecycle transitions.

use async_trait::async_trait;
use tracing::debug;

use crate::events::{BuildEvent, NotificationKind};
use crate::BuildNotifier;

/// Lifecycle hooks the build server invokes.
///
/// Implementations must not fail: the host's event dispatch is never
/// interrupted by a notification problem.
#[async_trait]
pub trait BuildListener: Send + Sync {
    async fn on_build_started(&self, build: &BuildEvent);

    async fn on_build_finished(&self, build: &BuildEvent);
}

#[async_trait]
impl BuildListener for BuildNotifier {
    async fn on_build_started(&self, build: &BuildEvent) {
        self.notify(NotificationKind::Started, build).await;
    }

    async fn on_build_finished(&self, build: &BuildEvent) {
        match NotificationKind::for_finished(build.status) {
            Some(kind) => {
                self.notify(kind, build).await;
            }
            None => {
                debug!(
                    build_id = %build.build_id,
                    status = ?build.status,
                    "Build finished without a terminal status, nothing to report"
                );
            }
        }
    }
}
