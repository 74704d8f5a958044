//! Autosave: persist every document change published by the controller.
//!
//! Subscribes to the [`StateChange`] broadcast and writes the serialized
//! document to one gateway slot. Write failures are retried with backoff,
//! then logged and counted; they never reach the controller.

use std::sync::Arc;

use emoji_core::PersistenceGateway;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::config::AutosaveConfig;
use crate::controller::{DocumentSnapshot, StateChange};
use crate::error::RuntimeError;

/// Counters reported when the autosave task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutosaveStats {
    /// Successful writes.
    pub writes: u64,
    /// Changes that could not be written after all retries.
    pub failures: u64,
}

/// Handle to a running autosave task.
#[derive(Debug)]
pub struct Autosave {
    task: JoinHandle<AutosaveStats>,
}

impl Autosave {
    /// Start saving changes from `receiver` into `slot`.
    ///
    /// `saved_revision` is the document revision already present in the
    /// slot; changes carrying it are not rewritten.
    #[must_use]
    pub fn spawn<G>(
        receiver: broadcast::Receiver<StateChange>,
        gateway: Arc<G>,
        slot: impl Into<String>,
        saved_revision: u64,
        config: AutosaveConfig,
    ) -> Self
    where
        G: PersistenceGateway + ?Sized + 'static,
    {
        let slot = slot.into();
        let task = tokio::spawn(run(receiver, gateway, slot, saved_revision, config));
        Self { task }
    }

    /// Wait for the publication channel to close and the last write to finish.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Join`] if the task panicked or was aborted.
    pub async fn finish(self) -> Result<AutosaveStats, RuntimeError> {
        Ok(self.task.await?)
    }

    /// Stop immediately, dropping any pending change.
    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn run<G>(
    receiver: broadcast::Receiver<StateChange>,
    gateway: Arc<G>,
    slot: String,
    mut saved_revision: u64,
    config: AutosaveConfig,
) -> AutosaveStats
where
    G: PersistenceGateway + ?Sized + 'static,
{
    let mut stats = AutosaveStats::default();
    let mut changes = BroadcastStream::new(receiver);
    tracing::debug!(%slot, "Autosave started");

    while let Some(item) = changes.next().await {
        let snapshot = match item {
            Ok(change) => change.snapshot,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // The next snapshot already carries the skipped changes.
                tracing::debug!(%slot, skipped, "Autosave lagged behind");
                continue;
            }
        };
        if snapshot.document_revision == saved_revision {
            continue;
        }
        if save(&gateway, &slot, &snapshot, &config).await {
            stats.writes += 1;
        } else {
            stats.failures += 1;
        }
        // A failed revision is not retried again on unrelated changes.
        saved_revision = snapshot.document_revision;
    }

    tracing::debug!(%slot, writes = stats.writes, failures = stats.failures, "Autosave stopped");
    stats
}

async fn save<G>(
    gateway: &Arc<G>,
    slot: &str,
    snapshot: &DocumentSnapshot,
    config: &AutosaveConfig,
) -> bool
where
    G: PersistenceGateway + ?Sized + 'static,
{
    let bytes = match snapshot.document.to_bytes() {
        Ok(bytes) => Arc::new(bytes),
        Err(e) => {
            tracing::warn!(%slot, "Failed to serialize document: {e}");
            return false;
        }
    };

    let attempts = config.retry.max_attempts.max(1);
    for attempt in 0..attempts {
        let gateway = Arc::clone(gateway);
        let payload = Arc::clone(&bytes);
        let target = slot.to_string();
        let result = tokio::task::spawn_blocking(move || gateway.write(&target, &payload)).await;

        match result {
            Ok(Ok(())) => {
                tracing::trace!(
                    %slot,
                    revision = snapshot.document_revision,
                    bytes = bytes.len(),
                    "Autosaved"
                );
                return true;
            }
            Ok(Err(e)) => {
                tracing::debug!(%slot, attempt, "Autosave write failed: {e}");
            }
            Err(e) => {
                tracing::debug!(%slot, attempt, "Autosave write task failed: {e}");
            }
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(config.retry.delay_for_attempt(attempt)).await;
        }
    }

    tracing::warn!(
        %slot,
        revision = snapshot.document_revision,
        attempts,
        "Giving up on autosave"
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ControllerConfig, RetryConfig};
    use crate::controller::DocumentController;
    use crate::error::FetchResult;
    use crate::transport::ImageTransport;
    use async_trait::async_trait;
    use emoji_core::{CanvasDocument, MemoryGateway};
    use url::Url;

    struct NoTransport;

    #[async_trait]
    impl ImageTransport for NoTransport {
        async fn fetch(&self, uri: &Url) -> FetchResult<Vec<u8>> {
            Err(crate::error::FetchError::UnsupportedScheme(
                uri.scheme().to_string(),
            ))
        }
    }

    fn controller() -> DocumentController {
        DocumentController::new(Arc::new(NoTransport), &ControllerConfig::default()).0
    }

    fn fast_retry() -> AutosaveConfig {
        AutosaveConfig {
            retry: RetryConfig::new(2, 1, 1, 1.0),
        }
    }

    #[tokio::test]
    async fn test_writes_each_document_change() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut controller = controller();
        let autosave = Autosave::spawn(
            controller.subscribe(),
            Arc::clone(&gateway),
            "doc",
            0,
            fast_retry(),
        );

        let id = controller.add_emoji("👑", 0, 0, 40);
        controller.move_emoji(id, 3, 4);
        controller.set_zoom_scale(2.0);
        let expected = controller.to_bytes().expect("bytes");
        drop(controller);

        let stats = autosave.finish().await.expect("finish");
        assert_eq!(stats, AutosaveStats { writes: 2, failures: 0 });
        let saved = gateway.read("doc").expect("read").expect("written");
        assert_eq!(saved, expected);
        let doc = CanvasDocument::try_from_bytes(&saved).expect("decode");
        assert_eq!(doc.placement(id).map(|p| (p.x, p.y)), Some((3, 4)));
    }

    #[tokio::test]
    async fn test_failed_writes_are_counted() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.set_reject_writes(true);
        let mut controller = controller();
        let autosave = Autosave::spawn(
            controller.subscribe(),
            Arc::clone(&gateway),
            "doc",
            0,
            fast_retry(),
        );

        controller.add_emoji("👑", 0, 0, 40);
        assert_eq!(controller.document().len(), 1);
        drop(controller);

        let stats = autosave.finish().await.expect("finish");
        assert_eq!(stats, AutosaveStats { writes: 0, failures: 1 });
        assert!(gateway.read("doc").expect("read").is_none());
    }

    #[tokio::test]
    async fn test_viewport_changes_are_not_written() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut controller = controller();
        let autosave = Autosave::spawn(
            controller.subscribe(),
            Arc::clone(&gateway),
            "doc",
            0,
            fast_retry(),
        );

        controller.pan_by(10.0, 0.0);
        controller.zoom_by(2.0);
        drop(controller);

        let stats = autosave.finish().await.expect("finish");
        assert_eq!(stats, AutosaveStats::default());
        assert!(gateway.read("doc").expect("read").is_none());
    }
}
