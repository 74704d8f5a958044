//! Document view-model.
//!
//! [`DocumentController`] owns one [`CanvasDocument`], applies intents to it,
//! hosts the [`BackgroundFetcher`], and publishes a [`StateChange`] after
//! every successful mutation. Autosave and any UI layer subscribe to the same
//! broadcast independently.
//!
//! The controller is not thread-safe by itself; run it on a single task
//! (see [`crate::DocumentHandle`]) so intents and fetch completions are
//! applied in one serialized order.

use std::sync::Arc;

use emoji_core::{normalize_image_url, CanvasDocument, CoreResult, PlacementId, Size, Viewport};
use tokio::sync::broadcast;
use url::Url;

use crate::config::ControllerConfig;
use crate::fetch::{BackgroundFetcher, FetchCompletion, FetchCompletions, FetchOutcome, FetchState};
use crate::background::BackgroundImage;
use crate::transport::ImageTransport;

/// What kind of mutation produced a [`StateChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Placements or background reference changed.
    Document,
    /// The whole document was replaced by a load.
    Replaced,
    /// A background fetch finished (loaded or failed).
    Background,
    /// The steady-state zoom or pan changed.
    Viewport,
}

impl ChangeKind {
    /// Whether the serialized document differs after this change.
    #[must_use]
    pub const fn affects_document(self) -> bool {
        matches!(self, Self::Document | Self::Replaced)
    }
}

/// Immutable view of the controller's published state.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    /// Increases with every published change.
    pub revision: u64,
    /// Increases only when the serialized document changes.
    pub document_revision: u64,
    /// The document.
    pub document: Arc<CanvasDocument>,
    /// The displayed background, if loaded.
    pub background: Option<Arc<BackgroundImage>>,
    /// Background acquisition state.
    pub fetch_state: FetchState,
    /// Steady-state view transform.
    pub viewport: Viewport,
}

impl DocumentSnapshot {
    /// A background is referenced but nothing is displayed yet.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.document.background_reference().is_some() && self.background.is_none()
    }
}

/// A published mutation.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// What changed.
    pub kind: ChangeKind,
    /// State after the change.
    pub snapshot: DocumentSnapshot,
}

/// Owner of a document and its transient view state.
#[derive(Debug)]
pub struct DocumentController {
    document: Arc<CanvasDocument>,
    fetcher: BackgroundFetcher,
    viewport: Viewport,
    revision: u64,
    document_revision: u64,
    events: broadcast::Sender<StateChange>,
}

impl DocumentController {
    /// Create a controller for a new, empty document.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ImageTransport>,
        config: &ControllerConfig,
    ) -> (Self, FetchCompletions) {
        Self::with_document(CanvasDocument::new(), transport, config)
    }

    /// Create a controller for an existing document.
    ///
    /// Starts fetching the background if the document references one, so it
    /// must be called from within a tokio runtime in that case.
    #[must_use]
    pub fn with_document(
        document: CanvasDocument,
        transport: Arc<dyn ImageTransport>,
        config: &ControllerConfig,
    ) -> (Self, FetchCompletions) {
        let (fetcher, completions) = BackgroundFetcher::new(transport);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let mut controller = Self {
            document: Arc::new(document),
            fetcher,
            viewport: Viewport::default(),
            revision: 0,
            document_revision: 0,
            events,
        };
        controller.refresh_background();
        (controller, completions)
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Get the broadcast sender.
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<StateChange> {
        self.events.clone()
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Place a glyph at a document-local offset from the canvas center.
    pub fn add_emoji(
        &mut self,
        text: impl Into<String>,
        x: i64,
        y: i64,
        size: i64,
    ) -> PlacementId {
        let id = Arc::make_mut(&mut self.document).add_placement(text, x, y, size);
        self.publish(ChangeKind::Document);
        id
    }

    /// Move a glyph. Unknown ids are ignored and publish nothing.
    pub fn move_emoji(&mut self, id: PlacementId, dx: i64, dy: i64) -> bool {
        // An unknown id must not clone a shared document.
        if self.document.placement(id).is_none() {
            return false;
        }
        let moved = Arc::make_mut(&mut self.document).move_placement(id, dx, dy);
        if moved {
            self.publish(ChangeKind::Document);
        }
        moved
    }

    /// Scale a glyph. Unknown ids are ignored and publish nothing.
    pub fn scale_emoji(&mut self, id: PlacementId, factor: f64) -> bool {
        if self.document.placement(id).is_none() {
            return false;
        }
        let scaled = Arc::make_mut(&mut self.document).scale_placement(id, factor);
        if scaled {
            self.publish(ChangeKind::Document);
        }
        scaled
    }

    /// Set or clear the background and restart acquisition accordingly.
    pub fn set_background_reference(&mut self, reference: Option<Url>) {
        let reference = reference.map(normalize_image_url);
        Arc::make_mut(&mut self.document).set_background_reference(reference);
        self.refresh_background();
        self.publish(ChangeKind::Document);
    }

    /// Replace the document with one decoded from `bytes`.
    ///
    /// Malformed bytes produce an empty document.
    pub fn load(&mut self, bytes: &[u8]) {
        self.document = Arc::new(CanvasDocument::from_bytes_or_default(bytes));
        self.refresh_background();
        tracing::info!(placements = self.document.len(), "Document loaded");
        self.publish(ChangeKind::Replaced);
    }

    /// Commit a pan gesture given in view units.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        self.update_viewport(|viewport| viewport.pan_by(dx, dy))
    }

    /// Commit a zoom scale.
    pub fn set_zoom_scale(&mut self, scale: f64) -> bool {
        self.update_viewport(|viewport| viewport.set_zoom_scale(scale))
    }

    /// Commit a pinch gesture's scale factor.
    pub fn zoom_by(&mut self, factor: f64) -> bool {
        self.update_viewport(|viewport| viewport.zoom_by(factor))
    }

    /// Fit the displayed background into `canvas`. No-op without an image.
    pub fn zoom_to_background(&mut self, canvas: Size) -> bool {
        let Some(image) = self.fetcher.image().map(|image| image.size()) else {
            return false;
        };
        self.update_viewport(|viewport| viewport.zoom_to_fit(image, canvas))
    }

    /// Apply a finished background fetch.
    pub fn apply_fetch_completion(&mut self, completion: FetchCompletion) -> FetchOutcome {
        let current = self.document.background_reference().cloned();
        let outcome = self.fetcher.apply(completion, current.as_ref());
        if outcome != FetchOutcome::Superseded {
            self.publish(ChangeKind::Background);
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------------

    /// The current document.
    #[must_use]
    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    /// The displayed background image.
    #[must_use]
    pub fn background_image(&self) -> Option<&Arc<BackgroundImage>> {
        self.fetcher.image()
    }

    /// Background acquisition state.
    #[must_use]
    pub fn fetch_state(&self) -> &FetchState {
        self.fetcher.state()
    }

    /// Steady-state view transform.
    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// A background is referenced but nothing is displayed yet.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.document.background_reference().is_some() && self.fetcher.image().is_none()
    }

    /// Serialize the current document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        self.document.to_bytes()
    }

    /// Capture the current state.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            revision: self.revision,
            document_revision: self.document_revision,
            document: Arc::clone(&self.document),
            background: self.fetcher.image().cloned(),
            fetch_state: self.fetcher.state().clone(),
            viewport: self.viewport,
        }
    }

    fn refresh_background(&mut self) {
        match self.document.background_reference().cloned() {
            Some(uri) => {
                self.fetcher.start(uri);
            }
            None => self.fetcher.clear(),
        }
    }

    fn update_viewport(&mut self, f: impl FnOnce(&mut Viewport) -> bool) -> bool {
        let changed = f(&mut self.viewport);
        if changed {
            self.publish(ChangeKind::Viewport);
        }
        changed
    }

    fn publish(&mut self, kind: ChangeKind) {
        self.revision += 1;
        if kind.affects_document() {
            self.document_revision += 1;
        }
        // No subscribers is fine.
        let _ = self.events.send(StateChange {
            kind,
            snapshot: self.snapshot(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchResult;
    use crate::background::tests::png_1x1;
    use async_trait::async_trait;

    struct StaticTransport(Vec<u8>);

    #[async_trait]
    impl ImageTransport for StaticTransport {
        async fn fetch(&self, _uri: &Url) -> FetchResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn controller() -> (DocumentController, FetchCompletions) {
        DocumentController::new(
            Arc::new(StaticTransport(png_1x1())),
            &ControllerConfig::default(),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[tokio::test]
    async fn test_intents_publish_changes() {
        let (mut controller, _completions) = controller();
        let mut rx = controller.subscribe();

        let id = controller.add_emoji("👑", 0, 0, 40);
        let change = rx.recv().await.expect("event");
        assert_eq!(change.kind, ChangeKind::Document);
        assert_eq!(change.snapshot.document.len(), 1);

        assert!(controller.move_emoji(id, 5, 5));
        assert!(controller.scale_emoji(id, 2.0));
        let moved = rx.recv().await.expect("event");
        let scaled = rx.recv().await.expect("event");
        assert_eq!(moved.snapshot.document.placement(id).map(|p| p.x), Some(5));
        assert_eq!(scaled.snapshot.document.placement(id).map(|p| p.size), Some(80));
        assert_eq!(scaled.snapshot.document_revision, 3);
    }

    #[tokio::test]
    async fn test_unknown_id_publishes_nothing() {
        let (mut controller, _completions) = controller();
        let mut rx = controller.subscribe();
        assert!(!controller.move_emoji(PlacementId::new(42), 1, 1));
        assert!(!controller.scale_emoji(PlacementId::new(42), 2.0));
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.snapshot().revision, 0);
    }

    #[tokio::test]
    async fn test_snapshots_are_isolated_from_later_mutations() {
        let (mut controller, _completions) = controller();
        controller.add_emoji("👑", 0, 0, 40);
        let before = controller.snapshot();
        controller.add_emoji("👙", 0, 0, 40);
        assert_eq!(before.document.len(), 1);
        assert_eq!(controller.document().len(), 2);
    }

    #[tokio::test]
    async fn test_background_load_cycle() {
        let (mut controller, mut completions) = controller();
        let a = url("https://example.com/a.png");
        controller.set_background_reference(Some(a.clone()));
        assert!(controller.is_loading());

        let done = completions.recv().await.expect("completion");
        assert_eq!(controller.apply_fetch_completion(done), FetchOutcome::Loaded);
        assert!(!controller.is_loading());
        assert_eq!(controller.fetch_state(), &FetchState::Loaded { uri: a });
    }

    #[tokio::test]
    async fn test_clearing_background_never_fetches() {
        let (mut controller, mut completions) = controller();
        controller.set_background_reference(None);
        assert!(controller.background_image().is_none());
        assert_eq!(controller.fetch_state(), &FetchState::Idle);
        assert!(!controller.is_loading());
        tokio::task::yield_now().await;
        assert!(completions.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_background_reference_is_normalized() {
        let (mut controller, _completions) = controller();
        controller.set_background_reference(Some(url(
            "https://images.example.com/imgres?imgurl=https://cdn.example.com/x.png",
        )));
        assert_eq!(
            controller.document().background_reference().map(Url::as_str),
            Some("https://cdn.example.com/x.png")
        );
    }

    #[tokio::test]
    async fn test_load_replaces_document() {
        let (mut controller, _completions) = controller();
        controller.add_emoji("👑", 0, 0, 40);

        let mut other = CanvasDocument::new();
        other.add_placement("🌂", 1, 1, 20);
        other.add_placement("👠", 2, 2, 20);
        controller.load(&other.to_bytes().expect("bytes"));
        assert_eq!(controller.document(), &other);

        let id = controller.add_emoji("👔", 0, 0, 40);
        assert_eq!(id.get(), 3);

        controller.load(b"garbage");
        assert!(controller.document().is_empty());
    }

    #[tokio::test]
    async fn test_viewport_intents() {
        let (mut controller, mut completions) = controller();
        let mut rx = controller.subscribe();
        assert!(controller.set_zoom_scale(2.0));
        assert!(!controller.set_zoom_scale(-1.0));
        assert!(controller.pan_by(10.0, 10.0));
        assert_eq!(controller.viewport().pan_offset(), (5.0, 5.0));
        assert_eq!(rx.recv().await.expect("event").kind, ChangeKind::Viewport);

        assert!(!controller.zoom_to_background(Size::new(100.0, 100.0)));
        controller.set_background_reference(Some(url("https://example.com/a.png")));
        let done = completions.recv().await.expect("completion");
        controller.apply_fetch_completion(done);
        assert!(controller.zoom_to_background(Size::new(100.0, 50.0)));
        assert!((controller.viewport().zoom_scale() - 50.0).abs() < f64::EPSILON);
        assert_eq!(controller.snapshot().document_revision, 1);
    }
}
