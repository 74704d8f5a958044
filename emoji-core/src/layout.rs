//! Uniform grid layout for a variable number of items.
//!
//! Picks the column count whose cells hold the largest item of the desired
//! aspect ratio, then hands out row-major cell centers. Packing area is not
//! monotonic in the column count, so every candidate from 1 to `n` is
//! evaluated.

use crate::geometry::{Point, Size};

/// Aspect ratio (width / height) of the items being laid out by default.
pub const DEFAULT_ITEM_ASPECT_RATIO: f64 = 1.0;

/// A row-major grid placing `item_count` equally sized items in a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    size: Size,
    item_count: usize,
    rows: usize,
    columns: usize,
}

impl GridLayout {
    /// Lay out `item_count` square items inside `size`.
    #[must_use]
    pub fn new(item_count: usize, size: Size) -> Self {
        Self::with_aspect_ratio(item_count, size, DEFAULT_ITEM_ASPECT_RATIO)
    }

    /// Lay out items whose content has the given width/height ratio.
    ///
    /// A non-positive or non-finite ratio falls back to square items.
    #[must_use]
    pub fn with_aspect_ratio(item_count: usize, size: Size, aspect_ratio: f64) -> Self {
        let size = size.sanitized();
        let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            DEFAULT_ITEM_ASPECT_RATIO
        };
        if item_count == 0 {
            return Self {
                size,
                item_count,
                rows: 0,
                columns: 0,
            };
        }

        let mut best_columns = 1;
        let mut best_area = fitted_area(size, item_count, 1, aspect_ratio);
        for columns in 2..=item_count {
            let area = fitted_area(size, item_count, columns, aspect_ratio);
            if area > best_area {
                best_area = area;
                best_columns = columns;
            }
        }

        Self {
            size,
            item_count,
            rows: item_count.div_ceil(best_columns),
            columns: best_columns,
        }
    }

    /// Number of items laid out.
    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    /// Number of rows in the chosen grid.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the chosen grid.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Size of one grid cell. Zero when there are no items.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn item_size(&self) -> Size {
        if self.item_count == 0 {
            return Size::ZERO;
        }
        Size::new(
            self.size.width / self.columns as f64,
            self.size.height / self.rows as f64,
        )
    }

    /// Center of the cell holding the item at `index`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn location(&self, index: usize) -> Option<Point> {
        if index >= self.item_count {
            return None;
        }
        let item = self.item_size();
        let row = index / self.columns;
        let column = index % self.columns;
        Some(Point::new(
            (column as f64 + 0.5) * item.width,
            (row as f64 + 0.5) * item.height,
        ))
    }

    /// Centers of all items, in index order.
    pub fn locations(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.item_count).filter_map(|index| self.location(index))
    }
}

#[allow(clippy::cast_precision_loss)]
fn fitted_area(size: Size, item_count: usize, columns: usize, aspect_ratio: f64) -> f64 {
    let rows = item_count.div_ceil(columns);
    let cell_width = size.width / columns as f64;
    let cell_height = size.height / rows as f64;
    let width = cell_width.min(cell_height * aspect_ratio);
    width * (width / aspect_ratio)
}
