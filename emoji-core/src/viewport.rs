//! Steady-state view transform: committed zoom and pan.
//!
//! Gesture-in-progress deltas belong to the rendering layer; only the values
//! committed at the end of a gesture are kept here.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};

/// Committed zoom and pan of a document view.
///
/// `pan_offset` is kept in document units so that it stays anchored to the
/// same content when the zoom changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    zoom_scale: f64,
    pan_offset: (f64, f64),
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom_scale: 1.0,
            pan_offset: (0.0, 0.0),
        }
    }
}

impl Viewport {
    /// Current zoom scale (always finite and positive).
    #[must_use]
    pub const fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    /// Steady-state pan in document units.
    #[must_use]
    pub const fn pan_offset(&self) -> (f64, f64) {
        self.pan_offset
    }

    /// Pan offset in view units, as applied when rendering.
    #[must_use]
    pub fn view_pan_offset(&self) -> (f64, f64) {
        (
            self.pan_offset.0 * self.zoom_scale,
            self.pan_offset.1 * self.zoom_scale,
        )
    }

    /// Set the zoom scale. Non-positive or non-finite values are ignored.
    pub fn set_zoom_scale(&mut self, scale: f64) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            return false;
        }
        self.zoom_scale = scale;
        true
    }

    /// Multiply the zoom scale by `factor`.
    pub fn zoom_by(&mut self, factor: f64) -> bool {
        self.set_zoom_scale(self.zoom_scale * factor)
    }

    /// Commit a drag translation given in view units.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        if !(dx.is_finite() && dy.is_finite()) {
            return false;
        }
        self.pan_offset.0 += dx / self.zoom_scale;
        self.pan_offset.1 += dy / self.zoom_scale;
        true
    }

    /// Zoom so the whole image fits the canvas and recenter.
    ///
    /// Does nothing unless both sizes are positive.
    pub fn zoom_to_fit(&mut self, image: Size, canvas: Size) -> bool {
        if !(image.is_positive() && canvas.is_positive()) {
            return false;
        }
        let horizontal = canvas.width / image.width;
        let vertical = canvas.height / image.height;
        self.pan_offset = (0.0, 0.0);
        self.zoom_scale = horizontal.min(vertical);
        true
    }

    /// Convert a document-local point (offset from center) to view coordinates.
    #[must_use]
    pub fn document_to_view(&self, point: Point, canvas: Size) -> Point {
        let (pan_x, pan_y) = self.view_pan_offset();
        Point::new(
            point.x * self.zoom_scale + canvas.width / 2.0 + pan_x,
            point.y * self.zoom_scale + canvas.height / 2.0 + pan_y,
        )
    }

    /// Convert a view point (e.g. a drop location) to document-local units.
    #[must_use]
    pub fn view_to_document(&self, point: Point, canvas: Size) -> Point {
        let (pan_x, pan_y) = self.view_pan_offset();
        Point::new(
            (point.x - canvas.width / 2.0 - pan_x) / self.zoom_scale,
            (point.y - canvas.height / 2.0 - pan_y) / self.zoom_scale,
        )
    }
}
