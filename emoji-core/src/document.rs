//! The canvas document - background reference plus placed glyphs.

use url::Url;

use crate::schema::{DocumentRecord, PlacementRecord};
use crate::{CoreResult, Placement, PlacementId};

/// A serializable emoji art document.
///
/// Owns id allocation: the counter always stays strictly greater than every
/// id that has ever been present, including across a decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanvasDocument {
    background_reference: Option<Url>,
    placements: Vec<Placement>,
    next_id: u64,
}

impl CanvasDocument {
    /// Create a new empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a glyph and return its newly allocated id.
    pub fn add_placement(
        &mut self,
        text: impl Into<String>,
        x: i64,
        y: i64,
        size: i64,
    ) -> PlacementId {
        // Starts at or below `PlacementId::MAX`, so this cannot overflow.
        self.next_id += 1;
        let id = PlacementId::new(self.next_id);
        self.placements.push(Placement::new(id, text.into(), x, y, size));
        id
    }

    /// Offset a placement by `(dx, dy)`.
    ///
    /// Returns `false` without changing anything if the id is unknown.
    pub fn move_placement(&mut self, id: PlacementId, dx: i64, dy: i64) -> bool {
        let Some(placement) = self.placement_mut(id) else {
            tracing::debug!(%id, "move ignored, no such placement");
            return false;
        };
        placement.x = placement.x.saturating_add(dx);
        placement.y = placement.y.saturating_add(dy);
        true
    }

    /// Multiply a placement's size by `factor`, rounding half to even.
    ///
    /// Returns `false` without changing anything if the id is unknown or the
    /// factor is negative or not finite.
    pub fn scale_placement(&mut self, id: PlacementId, factor: f64) -> bool {
        if !factor.is_finite() || factor < 0.0 {
            tracing::debug!(%id, factor, "scale ignored, invalid factor");
            return false;
        }
        let Some(placement) = self.placement_mut(id) else {
            tracing::debug!(%id, "scale ignored, no such placement");
            return false;
        };
        placement.size = scaled_size(placement.size, factor);
        true
    }

    /// Replace the background reference. Fetching is the controller's job.
    pub fn set_background_reference(&mut self, reference: Option<Url>) {
        self.background_reference = reference;
    }

    /// The current background reference.
    #[must_use]
    pub fn background_reference(&self) -> Option<&Url> {
        self.background_reference.as_ref()
    }

    /// All placements in insertion order.
    #[must_use]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Look up a placement by id.
    #[must_use]
    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id() == id)
    }

    fn placement_mut(&mut self, id: PlacementId) -> Option<&mut Placement> {
        self.placements.iter_mut().find(|p| p.id() == id)
    }

    /// Number of placements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether the document has no placements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Convert to the serialized record form.
    #[must_use]
    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord {
            background_url: self.background_reference.clone(),
            emojis: self.placements.iter().map(PlacementRecord::from).collect(),
        }
    }

    /// Rebuild a document from its record form.
    ///
    /// Records repeating an earlier id are dropped, first occurrence wins.
    /// Records with an id above [`PlacementId::MAX`] are dropped too.
    #[must_use]
    pub fn from_record(record: DocumentRecord) -> Self {
        let mut placements: Vec<Placement> = Vec::with_capacity(record.emojis.len());
        for emoji in record.emojis {
            if emoji.id > PlacementId::MAX {
                tracing::warn!(id = %emoji.id, "dropping placement with out-of-range id");
                continue;
            }
            if placements.iter().any(|p| p.id() == emoji.id) {
                tracing::warn!(id = %emoji.id, "dropping placement with duplicate id");
                continue;
            }
            placements.push(Placement::from(emoji));
        }
        let next_id = placements.iter().map(|p| p.id().get()).max().unwrap_or(0);
        Self {
            background_reference: record.background_url,
            placements,
            next_id,
        }
    }

    /// Serialize to the canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_record())?)
    }

    /// Deserialize from canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid document.
    pub fn try_from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let record: DocumentRecord = serde_json::from_slice(bytes)?;
        Ok(Self::from_record(record))
    }

    /// Deserialize, falling back to an empty document for empty or malformed input.
    #[must_use]
    pub fn from_bytes_or_default(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::new();
        }
        match Self::try_from_bytes(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Discarding malformed document ({} bytes): {e}", bytes.len());
                Self::new()
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn scaled_size(size: i64, factor: f64) -> i64 {
    // `as` saturates at the i64 bounds
    (size as f64 * factor).round_ties_even() as i64
}

/// Resolve the image a dropped link actually points at.
///
/// Image search result links carry the real image in an `imgurl` query
/// parameter; anything else is returned unchanged.
#[must_use]
pub fn normalize_image_url(url: Url) -> Url {
    let inner = url
        .query_pairs()
        .find(|(key, _)| key == "imgurl")
        .and_then(|(_, value)| Url::parse(&value).ok());
    inner.unwrap_or(url)
}
