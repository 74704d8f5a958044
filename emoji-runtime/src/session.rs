//! A document bound to its storage slot: actor plus autosave.

use std::sync::Arc;

use emoji_core::{CanvasDocument, PersistenceGateway};

use crate::actor::{DocumentHandle, DocumentTask};
use crate::autosave::{Autosave, AutosaveStats};
use crate::config::{AutosaveConfig, ControllerConfig};
use crate::controller::{DocumentController, DocumentSnapshot};
use crate::error::RuntimeError;
use crate::transport::ImageTransport;

/// An open document whose changes are saved to `slot` as they happen.
#[derive(Debug)]
pub struct DocumentSession {
    slot: String,
    handle: DocumentHandle,
    task: DocumentTask,
    autosave: Autosave,
}

/// Final state of a closed session.
#[derive(Debug)]
pub struct ClosedSession {
    /// State when the session closed.
    pub snapshot: DocumentSnapshot,
    /// Autosave counters.
    pub autosave: AutosaveStats,
}

impl DocumentSession {
    /// Load `slot` from `gateway` and start editing it.
    ///
    /// A slot that was never written, or holds malformed bytes, opens as an
    /// empty document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Core`] if the gateway cannot be read.
    pub async fn open<G>(
        gateway: Arc<G>,
        slot: impl Into<String>,
        transport: Arc<dyn ImageTransport>,
        controller_config: &ControllerConfig,
        autosave_config: AutosaveConfig,
    ) -> Result<Self, RuntimeError>
    where
        G: PersistenceGateway + ?Sized + 'static,
    {
        let slot = slot.into();
        let bytes = {
            let gateway = Arc::clone(&gateway);
            let slot = slot.clone();
            tokio::task::spawn_blocking(move || gateway.read(&slot)).await??
        };
        let document = bytes
            .map(|bytes| CanvasDocument::from_bytes_or_default(&bytes))
            .unwrap_or_default();
        tracing::info!(%slot, placements = document.len(), "Opened document");

        let (controller, completions) =
            DocumentController::with_document(document, transport, controller_config);
        let autosave = Autosave::spawn(
            controller.subscribe(),
            gateway,
            slot.clone(),
            controller.snapshot().document_revision,
            autosave_config,
        );
        let (handle, task) =
            DocumentHandle::spawn(controller, completions, controller_config.command_capacity);

        Ok(Self {
            slot,
            handle,
            task,
            autosave,
        })
    }

    /// Slot this session saves to.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Handle for issuing intents and subscribing to changes.
    #[must_use]
    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    /// Stop editing and wait for pending saves.
    ///
    /// Clones of the handle must be dropped first, or this waits for them.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Join`] if the document or autosave task failed.
    pub async fn close(self) -> Result<ClosedSession, RuntimeError> {
        let Self {
            slot,
            handle,
            task,
            autosave,
        } = self;
        drop(handle);
        let controller = task.join().await?;
        let snapshot = controller.snapshot();
        drop(controller);
        let stats = autosave.finish().await?;
        tracing::info!(
            %slot,
            writes = stats.writes,
            failures = stats.failures,
            "Closed document"
        );
        Ok(ClosedSession {
            snapshot,
            autosave: stats,
        })
    }
}
