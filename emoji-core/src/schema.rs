//! Canonical serialized representation of a document.
//!
//! The field names here are the compatibility contract for documents
//! written by earlier sessions:
//!
//! ```json
//! {"backgroundURL": "https://...", "emojis": [{"text": "👑", "x": 0, "y": 0, "size": 40, "id": 1}]}
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Placement, PlacementId};

/// Serialized form of a single placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Glyph payload.
    pub text: String,
    /// Horizontal offset from the canvas center.
    pub x: i64,
    /// Vertical offset from the canvas center.
    pub y: i64,
    /// Nominal size.
    pub size: i64,
    /// Identifier within the document.
    pub id: PlacementId,
}

impl From<&Placement> for PlacementRecord {
    fn from(placement: &Placement) -> Self {
        Self {
            text: placement.text().to_string(),
            x: placement.x,
            y: placement.y,
            size: placement.size,
            id: placement.id(),
        }
    }
}

impl From<PlacementRecord> for Placement {
    fn from(record: PlacementRecord) -> Self {
        Placement::new(record.id, record.text, record.x, record.y, record.size)
    }
}

/// Serialized form of a whole document.
///
/// The id counter is deliberately absent; it is rebuilt from the largest
/// stored id on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Background image reference.
    #[serde(rename = "backgroundURL", default)]
    pub background_url: Option<Url>,
    /// Placements in insertion order.
    #[serde(default)]
    pub emojis: Vec<PlacementRecord>,
}
