//! Named glyph palettes for picking emoji.
//!
//! A palette is identified by its glyph string, the same key the palette
//! chooser steps through. Keys are unique within a store and never empty.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::geometry::Size;
use crate::layout::GridLayout;
use crate::{CoreError, CoreResult};

/// Glyphs of the palette every store starts with.
pub const DEFAULT_PALETTE: &str = "👙🌂👑👘👔👠";

/// Name of the default palette.
pub const DEFAULT_PALETTE_NAME: &str = "Wardrobe";

/// A named run of glyphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// The glyphs, concatenated.
    pub glyphs: String,
    /// Display name.
    pub name: String,
}

impl Palette {
    /// Individual glyphs (extended grapheme clusters).
    pub fn glyphs(&self) -> impl Iterator<Item = &str> {
        self.glyphs.graphemes(true)
    }
}

/// Ordered collection of palettes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteStore {
    palettes: Vec<Palette>,
}

impl Default for PaletteStore {
    fn default() -> Self {
        Self {
            palettes: vec![Palette {
                glyphs: DEFAULT_PALETTE.to_string(),
                name: DEFAULT_PALETTE_NAME.to_string(),
            }],
        }
    }
}

impl PaletteStore {
    /// Create a store holding only the default palette.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All palettes in order.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// The first palette's glyphs.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.palettes.first().map(|p| p.glyphs.as_str())
    }

    /// Name of the palette with these glyphs.
    #[must_use]
    pub fn name_of(&self, glyphs: &str) -> Option<&str> {
        self.index_of(glyphs).map(|i| self.palettes[i].name.as_str())
    }

    /// The palette following `glyphs`, wrapping around.
    ///
    /// An unknown palette steps to the first one.
    #[must_use]
    pub fn palette_after(&self, glyphs: &str) -> Option<&str> {
        let len = self.palettes.len();
        let next = self.index_of(glyphs).map_or(0, |i| (i + 1) % len.max(1));
        self.palettes.get(next).map(|p| p.glyphs.as_str())
    }

    /// The palette preceding `glyphs`, wrapping around.
    ///
    /// An unknown palette steps to the first one.
    #[must_use]
    pub fn palette_before(&self, glyphs: &str) -> Option<&str> {
        let len = self.palettes.len();
        let prev = self
            .index_of(glyphs)
            .map_or(0, |i| (i + len.max(1) - 1) % len.max(1));
        self.palettes.get(prev).map(|p| p.glyphs.as_str())
    }

    /// Append a new palette, or rename it if the glyphs already exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyPalette`] if `glyphs` is empty.
    pub fn add_palette(
        &mut self,
        glyphs: impl Into<String>,
        name: impl Into<String>,
    ) -> CoreResult<()> {
        let glyphs = dedup_glyphs(&glyphs.into());
        let name = name.into();
        if glyphs.is_empty() {
            return Err(CoreError::EmptyPalette(name));
        }
        if let Some(i) = self.index_of(&glyphs) {
            self.palettes[i].name = name;
        } else {
            self.palettes.push(Palette { glyphs, name });
        }
        Ok(())
    }

    /// Rename a palette.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PaletteNotFound`] for an unknown palette.
    pub fn rename(&mut self, glyphs: &str, name: impl Into<String>) -> CoreResult<()> {
        let i = self.require(glyphs)?;
        self.palettes[i].name = name.into();
        Ok(())
    }

    /// Append glyphs not already in the palette. Returns the new palette key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PaletteNotFound`] for an unknown palette and
    /// [`CoreError::PaletteExists`] if another palette already has the
    /// resulting glyphs.
    pub fn add_glyphs(&mut self, glyphs: &str, additions: &str) -> CoreResult<String> {
        let i = self.require(glyphs)?;
        let combined = dedup_glyphs(&format!("{}{additions}", self.palettes[i].glyphs));
        self.replace_key(i, combined)
    }

    /// Remove one glyph from a palette. Returns the new palette key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PaletteNotFound`] for an unknown palette,
    /// [`CoreError::EmptyPalette`] when removing its last glyph, and
    /// [`CoreError::PaletteExists`] if another palette already has the
    /// remaining glyphs.
    pub fn remove_glyph(&mut self, glyphs: &str, glyph: &str) -> CoreResult<String> {
        let i = self.require(glyphs)?;
        let remaining: String = self.palettes[i]
            .glyphs()
            .filter(|g| *g != glyph)
            .collect();
        if remaining.is_empty() {
            return Err(CoreError::EmptyPalette(self.palettes[i].name.clone()));
        }
        self.replace_key(i, remaining)
    }

    /// Grid layout for showing a palette's glyphs, e.g. for picking one to remove.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PaletteNotFound`] for an unknown palette.
    pub fn glyph_layout(&self, glyphs: &str, size: Size) -> CoreResult<GridLayout> {
        let i = self.require(glyphs)?;
        Ok(GridLayout::new(self.palettes[i].glyphs().count(), size))
    }

    fn replace_key(&mut self, i: usize, key: String) -> CoreResult<String> {
        if self.index_of(&key).is_some_and(|j| j != i) {
            return Err(CoreError::PaletteExists(key));
        }
        self.palettes[i].glyphs.clone_from(&key);
        Ok(key)
    }

    fn index_of(&self, glyphs: &str) -> Option<usize> {
        self.palettes.iter().position(|p| p.glyphs == glyphs)
    }

    fn require(&self, glyphs: &str) -> CoreResult<usize> {
        self.index_of(glyphs)
            .ok_or_else(|| CoreError::PaletteNotFound(glyphs.to_string()))
    }
}

fn dedup_glyphs(glyphs: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for glyph in glyphs.graphemes(true) {
        if !seen.contains(&glyph) {
            seen.push(glyph);
        }
    }
    seen.concat()
}
