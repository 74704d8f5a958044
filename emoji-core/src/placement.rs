//! Placements - glyph instances positioned on the canvas.

use serde::{Deserialize, Serialize};

/// Identifier of a placement, unique within its owning document.
///
/// Identifiers are allocated in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(u64);

impl PlacementId {
    /// Largest id a document accepts when decoding.
    ///
    /// Ids above it are dropped, which keeps the allocation counter far
    /// from `u64::MAX`.
    pub const MAX: Self = Self(u64::MAX >> 1);

    /// Wrap a raw identifier value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A glyph placed on the canvas.
///
/// `x` and `y` are offsets from the canvas center in document units, so
/// `(0, 0)` is the middle of the canvas. Only the document can construct a
/// placement; the id and text never change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    id: PlacementId,
    text: String,
    /// Horizontal offset from the canvas center.
    pub x: i64,
    /// Vertical offset from the canvas center.
    pub y: i64,
    /// Nominal rendering size in document units.
    pub size: i64,
}

impl Placement {
    pub(crate) fn new(id: PlacementId, text: String, x: i64, y: i64, size: i64) -> Self {
        Self {
            id,
            text,
            x,
            y,
            size,
        }
    }

    /// The placement's identifier.
    #[must_use]
    pub const fn id(&self) -> PlacementId {
        self.id
    }

    /// The glyph payload.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Location as floating point, for renderers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn location(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }

    /// Size as floating point font size, for renderers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn font_size(&self) -> f64 {
        self.size as f64
    }
}
