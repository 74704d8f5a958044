//! # Emoji Art Runtime
//!
//! Async side of an emoji art document: background image acquisition,
//! the document view-model, and autosave.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐ intents ┌────────────────────┐ StateChange ┌──────────┐
//! │DocumentHandle│────────▶│ DocumentController │────────────▶│ Autosave │──▶ gateway
//! └──────────────┘         │  (single task)     │      │      └──────────┘
//!                          └────────────────────┘      └──▶ UI subscribers
//!                              ▲          │
//!                   completion │          │ start / clear
//!                              │          ▼
//!                          ┌────────────────────┐
//!                          │ BackgroundFetcher  │──▶ ImageTransport
//!                          └────────────────────┘    (http, file, data)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor;
pub mod autosave;
pub mod background;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod session;
pub mod transport;

pub use actor::{DocumentHandle, DocumentTask};
pub use autosave::{Autosave, AutosaveStats};
pub use background::{decode_image, BackgroundImage, ImageFormat};
pub use config::{AutosaveConfig, ControllerConfig, FetchConfig, RetryConfig};
pub use controller::{ChangeKind, DocumentController, DocumentSnapshot, StateChange};
pub use error::{FetchError, FetchResult, RuntimeError};
pub use fetch::{
    BackgroundFetcher, FetchCompletion, FetchCompletions, FetchOutcome, FetchState, FetchToken,
};
pub use session::{ClosedSession, DocumentSession};
pub use transport::{decode_data_uri, DefaultTransport, ImageTransport};
