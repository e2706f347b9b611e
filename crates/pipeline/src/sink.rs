use std::path::Path;

use async_trait::async_trait;

use {grabbot_cache::ArtifactRef, grabbot_common::MediaKind};

use crate::request::Origin;

/// Transport-side collaborator the coordinator delivers through.
///
/// Implemented by the Telegram layer; tests install a recording mock.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Signal that a fetch is underway (typing-style indicator).
    async fn notify_fetching(&self, origin: &Origin, kind: MediaKind);

    /// Upload a freshly produced file into the originating conversation.
    /// Returns the handle under which the artifact can later be re-delivered.
    async fn deliver(
        &self,
        origin: &Origin,
        file: &Path,
        kind: MediaKind,
    ) -> anyhow::Result<ArtifactRef>;

    /// Re-deliver a cached artifact to a (possibly different) conversation,
    /// then tag the requester on the result.
    async fn redeliver(&self, artifact: &ArtifactRef, origin: &Origin) -> anyhow::Result<()>;

    /// Send the single generic failure message to the requester.
    async fn report_failure(&self, origin: &Origin);
}
