//! Background image acquisition state machine.
//!
//! ```text
//! Idle ──start──▶ Fetching ──completion──▶ Loaded | Failed
//!                    │
//!                    └──start/clear──▶ (old fetch Superseded, result discarded)
//! ```
//!
//! Fetches run on their own tokio task. Their completions come back through
//! [`FetchCompletions`] and are applied by the owner with
//! [`BackgroundFetcher::apply`], which performs the staleness check on the
//! owner's execution context. Only the most recent `start` can publish an
//! image.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::background::{decode_image, BackgroundImage};
use crate::transport::ImageTransport;

/// Opaque handle identifying one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken(u64);

impl std::fmt::Display for FetchToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

/// Where the background acquisition currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// No background requested.
    Idle,
    /// Waiting for the fetch identified by `token`.
    Fetching {
        /// Active fetch.
        token: FetchToken,
        /// Reference being fetched.
        uri: Url,
    },
    /// The image for `uri` is on display.
    Loaded {
        /// Reference that was loaded.
        uri: Url,
    },
    /// The fetch for `uri` failed; nothing is displayed.
    Failed {
        /// Reference that failed.
        uri: Url,
        /// Human readable cause.
        reason: String,
    },
}

/// What applying a completion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The image is now displayed.
    Loaded,
    /// The active fetch failed.
    Failed(String),
    /// The completion belonged to a superseded fetch and was discarded.
    Superseded,
}

/// Result of a finished fetch task, waiting to be applied by the owner.
#[derive(Debug)]
pub struct FetchCompletion {
    token: FetchToken,
    uri: Url,
    result: FetchResult<Arc<BackgroundImage>>,
}

impl FetchCompletion {
    /// The fetch this completion belongs to.
    #[must_use]
    pub const fn token(&self) -> FetchToken {
        self.token
    }

    /// The reference that was fetched.
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

/// Receiving end for fetch completions.
#[derive(Debug)]
pub struct FetchCompletions {
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl FetchCompletions {
    /// Wait for the next finished fetch.
    pub async fn recv(&mut self) -> Option<FetchCompletion> {
        self.rx.recv().await
    }

    /// Take a finished fetch if one is ready.
    pub fn try_recv(&mut self) -> Option<FetchCompletion> {
        self.rx.try_recv().ok()
    }
}

/// Resolves background references into decoded images.
pub struct BackgroundFetcher {
    transport: Arc<dyn ImageTransport>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    next_token: u64,
    state: FetchState,
    in_flight: Option<JoinHandle<()>>,
    image: Option<Arc<BackgroundImage>>,
}

impl std::fmt::Debug for BackgroundFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundFetcher")
            .field("state", &self.state)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

impl BackgroundFetcher {
    /// Create an idle fetcher and the receiver its completions arrive on.
    #[must_use]
    pub fn new(transport: Arc<dyn ImageTransport>) -> (Self, FetchCompletions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Self {
            transport,
            completions: tx,
            next_token: 0,
            state: FetchState::Idle,
            in_flight: None,
            image: None,
        };
        (fetcher, FetchCompletions { rx })
    }

    /// Supersede any in-flight fetch, clear the image, and fetch `uri`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, uri: Url) -> FetchToken {
        self.supersede();
        self.image = None;
        self.next_token += 1;
        let token = FetchToken(self.next_token);

        let transport = Arc::clone(&self.transport);
        let tx = self.completions.clone();
        let task_uri = uri.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetch_and_decode(transport.as_ref(), &task_uri).await;
            // A closed channel means the owner is gone; nobody wants the result.
            let _ = tx.send(FetchCompletion {
                token,
                uri: task_uri,
                result,
            });
        }));

        tracing::debug!(%token, %uri, "Background fetch started");
        self.state = FetchState::Fetching { token, uri };
        token
    }

    /// Supersede any in-flight fetch and display nothing.
    pub fn clear(&mut self) {
        self.supersede();
        self.image = None;
        self.state = FetchState::Idle;
    }

    /// Apply a finished fetch if it is still current.
    ///
    /// `current` is the document's background reference at the time of
    /// applying; a completion for any other reference is discarded.
    pub fn apply(&mut self, completion: FetchCompletion, current: Option<&Url>) -> FetchOutcome {
        let FetchCompletion { token, uri, result } = completion;

        if self.active_token() != Some(token) {
            tracing::debug!(%token, %uri, "Discarding superseded fetch result");
            return FetchOutcome::Superseded;
        }
        self.in_flight = None;

        if current != Some(&uri) {
            tracing::debug!(%token, %uri, "Discarding fetch result for stale reference");
            self.state = FetchState::Idle;
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(image) => {
                tracing::debug!(
                    %token,
                    %uri,
                    width = image.width,
                    height = image.height,
                    "Background loaded"
                );
                self.image = Some(image);
                self.state = FetchState::Loaded { uri };
                FetchOutcome::Loaded
            }
            Err(e) => {
                tracing::warn!(%token, %uri, "Background fetch failed: {e}");
                let reason = e.to_string();
                self.state = FetchState::Failed {
                    uri,
                    reason: reason.clone(),
                };
                FetchOutcome::Failed(reason)
            }
        }
    }

    /// The displayed image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&Arc<BackgroundImage>> {
        self.image.as_ref()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Token of the fetch currently in flight.
    #[must_use]
    pub fn active_token(&self) -> Option<FetchToken> {
        match self.state {
            FetchState::Fetching { token, .. } => Some(token),
            _ => None,
        }
    }

    fn supersede(&mut self) {
        if let FetchState::Fetching { token, uri } = &self.state {
            tracing::debug!(%token, %uri, "Background fetch superseded");
        }
        // The task may already be past the point of no return (e.g. decoding
        // on a blocking thread); the token check in `apply` still drops it.
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl Drop for BackgroundFetcher {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

async fn fetch_and_decode(
    transport: &dyn ImageTransport,
    uri: &Url,
) -> FetchResult<Arc<BackgroundImage>> {
    let bytes = transport.fetch(uri).await?;
    let image = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| FetchError::Decode(format!("decoder task failed: {e}")))??;
    Ok(Arc::new(image))
}
