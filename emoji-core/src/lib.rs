//! # Emoji Art Core
//!
//! Document model for emoji art: glyphs placed over an optional background
//! image, serialized as one JSON blob per document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 emoji-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  Layout                  │
//! │  - Placements    │  - Uniform grid solver   │
//! │  - Id allocation │  - Steady-state viewport │
//! │  - JSON schema   │  - Palettes              │
//! ├─────────────────────────────────────────────┤
//! │  Persistence                                │
//! │  - Gateways (file, memory)                  │
//! │  - Named document registry                  │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod palette;
pub mod placement;
pub mod registry;
pub mod schema;
pub mod store;
pub mod viewport;

pub use document::{normalize_image_url, CanvasDocument};
pub use error::{CoreError, CoreResult};
pub use geometry::{Point, Size};
pub use layout::GridLayout;
pub use palette::{Palette, PaletteStore};
pub use placement::{Placement, PlacementId};
pub use registry::{DocumentEntry, DocumentId, DocumentRegistry};
pub use schema::{DocumentRecord, PlacementRecord};
pub use store::{FileGateway, MemoryGateway, PersistenceGateway};
pub use viewport::Viewport;

/// Re-exported so hosts can build background references without a direct dependency.
pub use url::Url;

/// Core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
