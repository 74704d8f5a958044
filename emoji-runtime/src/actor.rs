//! Single-task host for a [`DocumentController`].
//!
//! Intents arrive over an mpsc queue and fetch completions over their own
//! channel; one loop applies both, so a completion's staleness check can
//! never race a newer `set_background_reference`.

use emoji_core::{PlacementId, Size};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::controller::{DocumentController, DocumentSnapshot, StateChange};
use crate::error::RuntimeError;
use crate::fetch::FetchCompletions;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum Command {
    AddEmoji {
        text: String,
        x: i64,
        y: i64,
        size: i64,
        reply: Reply<PlacementId>,
    },
    MoveEmoji {
        id: PlacementId,
        dx: i64,
        dy: i64,
        reply: Reply<bool>,
    },
    ScaleEmoji {
        id: PlacementId,
        factor: f64,
        reply: Reply<bool>,
    },
    SetBackground {
        reference: Option<Url>,
        reply: Reply<()>,
    },
    Load {
        bytes: Vec<u8>,
        reply: Reply<()>,
    },
    PanBy {
        dx: f64,
        dy: f64,
        reply: Reply<bool>,
    },
    SetZoomScale {
        scale: f64,
        reply: Reply<bool>,
    },
    ZoomBy {
        factor: f64,
        reply: Reply<bool>,
    },
    ZoomToBackground {
        canvas: Size,
        reply: Reply<bool>,
    },
    Snapshot {
        reply: Reply<DocumentSnapshot>,
    },
}

/// Cloneable handle to a document running on its own task.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<StateChange>,
}

/// Join handle for the task started by [`DocumentHandle::spawn`].
#[derive(Debug)]
pub struct DocumentTask {
    task: JoinHandle<DocumentController>,
}

impl DocumentTask {
    /// Wait for every [`DocumentHandle`] to be dropped and get the controller back.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Join`] if the task panicked.
    pub async fn join(self) -> Result<DocumentController, RuntimeError> {
        Ok(self.task.await?)
    }
}

impl DocumentHandle {
    /// Move `controller` onto a new task.
    #[must_use]
    pub fn spawn(
        controller: DocumentController,
        completions: FetchCompletions,
        command_capacity: usize,
    ) -> (Self, DocumentTask) {
        let (tx, rx) = mpsc::channel(command_capacity.max(1));
        let events = controller.sender();
        let task = tokio::spawn(run(controller, rx, completions));
        (
            Self {
                commands: tx,
                events,
            },
            DocumentTask { task },
        )
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Place a glyph.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn add_emoji(
        &self,
        text: impl Into<String>,
        x: i64,
        y: i64,
        size: i64,
    ) -> Result<PlacementId, RuntimeError> {
        let text = text.into();
        self.request(|reply| Command::AddEmoji {
            text,
            x,
            y,
            size,
            reply,
        })
        .await
    }

    /// Move a glyph; `false` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn move_emoji(
        &self,
        id: PlacementId,
        dx: i64,
        dy: i64,
    ) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::MoveEmoji { id, dx, dy, reply })
            .await
    }

    /// Scale a glyph; `false` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn scale_emoji(&self, id: PlacementId, factor: f64) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::ScaleEmoji { id, factor, reply })
            .await
    }

    /// Set or clear the background reference.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn set_background_reference(
        &self,
        reference: Option<Url>,
    ) -> Result<(), RuntimeError> {
        self.request(|reply| Command::SetBackground { reference, reply })
            .await
    }

    /// Replace the document with one decoded from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn load(&self, bytes: Vec<u8>) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Load { bytes, reply }).await
    }

    /// Commit a pan gesture.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn pan_by(&self, dx: f64, dy: f64) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::PanBy { dx, dy, reply }).await
    }

    /// Commit a zoom scale.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn set_zoom_scale(&self, scale: f64) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::SetZoomScale { scale, reply })
            .await
    }

    /// Commit a pinch gesture.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn zoom_by(&self, factor: f64) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::ZoomBy { factor, reply }).await
    }

    /// Fit the displayed background into `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn zoom_to_background(&self, canvas: Size) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::ZoomToBackground { canvas, reply })
            .await
    }

    /// Capture the current state.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ActorStopped`] if the document task has exited.
    pub async fn snapshot(&self) -> Result<DocumentSnapshot, RuntimeError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| RuntimeError::ActorStopped)?;
        rx.await.map_err(|_| RuntimeError::ActorStopped)
    }
}

async fn run(
    mut controller: DocumentController,
    mut commands: mpsc::Receiver<Command>,
    mut completions: FetchCompletions,
) -> DocumentController {
    tracing::debug!("Document task started");
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                apply(&mut controller, command);
            }
            Some(done) = completions.recv() => {
                let outcome = controller.apply_fetch_completion(done);
                tracing::trace!(?outcome, "Applied fetch completion");
            }
        }
    }
    tracing::debug!("Document task stopped");
    controller
}

// Reply errors mean the caller stopped waiting; the intent still applied.
fn apply(controller: &mut DocumentController, command: Command) {
    match command {
        Command::AddEmoji {
            text,
            x,
            y,
            size,
            reply,
        } => {
            let _ = reply.send(controller.add_emoji(text, x, y, size));
        }
        Command::MoveEmoji { id, dx, dy, reply } => {
            let _ = reply.send(controller.move_emoji(id, dx, dy));
        }
        Command::ScaleEmoji { id, factor, reply } => {
            let _ = reply.send(controller.scale_emoji(id, factor));
        }
        Command::SetBackground { reference, reply } => {
            controller.set_background_reference(reference);
            let _ = reply.send(());
        }
        Command::Load { bytes, reply } => {
            controller.load(&bytes);
            let _ = reply.send(());
        }
        Command::PanBy { dx, dy, reply } => {
            let _ = reply.send(controller.pan_by(dx, dy));
        }
        Command::SetZoomScale { scale, reply } => {
            let _ = reply.send(controller.set_zoom_scale(scale));
        }
        Command::ZoomBy { factor, reply } => {
            let _ = reply.send(controller.zoom_by(factor));
        }
        Command::ZoomToBackground { canvas, reply } => {
            let _ = reply.send(controller.zoom_to_background(canvas));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(controller.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::error::FetchResult;
    use crate::background::tests::png_1x1;
    use crate::transport::ImageTransport;
    use crate::ChangeKind;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticTransport(Vec<u8>);

    #[async_trait]
    impl ImageTransport for StaticTransport {
        async fn fetch(&self, _uri: &Url) -> FetchResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn spawn() -> (DocumentHandle, DocumentTask) {
        let (controller, completions) = DocumentController::new(
            Arc::new(StaticTransport(png_1x1())),
            &ControllerConfig::default(),
        );
        DocumentHandle::spawn(controller, completions, 8)
    }

    #[tokio::test]
    async fn test_intents_round_trip() {
        let (handle, task) = spawn();
        let id = handle.add_emoji("👑", 1, 2, 40).await.expect("add");
        assert!(handle.move_emoji(id, 1, 1).await.expect("move"));
        assert!(!handle.scale_emoji(PlacementId::new(99), 2.0).await.expect("scale"));

        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.document.placement(id).map(|p| (p.x, p.y)), Some((2, 3)));

        drop(handle);
        let controller = task.join().await.expect("join");
        assert_eq!(controller.document().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_completion_is_applied_by_the_task() {
        let (handle, task) = spawn();
        let mut rx = handle.subscribe();
        let uri = Url::parse("https://example.com/bg.png").expect("url");
        handle
            .set_background_reference(Some(uri))
            .await
            .expect("set");

        assert_eq!(rx.recv().await.expect("event").kind, ChangeKind::Document);
        let loaded = rx.recv().await.expect("event");
        assert_eq!(loaded.kind, ChangeKind::Background);
        assert!(loaded.snapshot.background.is_some());
        assert!(!loaded.snapshot.is_loading());

        drop(handle);
        task.join().await.expect("join");
    }

    #[tokio::test]
    async fn test_stopped_actor_reports_error() {
        let (handle, task) = spawn();
        task.task.abort();
        let _ = task.task.await;
        assert!(matches!(
            handle.snapshot().await,
            Err(RuntimeError::ActorStopped)
        ));
    }
}
