//! Domain types for representing an extracted image map.

use crate::units::checked_px_to_emu;
use serde::{Deserialize, Serialize};

/// Everything extracted from one HTML export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMap {
    /// Clickable regions in document order of their `<area>` elements.
    pub clickables: Vec<Clickable>,

    /// `src` of the `<img>` that uses the map, if any.
    pub background: Option<String>,
}

impl ImageMap {
    /// Create an empty image map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clickable region.
    pub fn add_clickable(&mut self, clickable: Clickable) {
        self.clickables.push(clickable);
    }

    /// True when no region resolved to an external link.
    pub fn is_empty(&self) -> bool {
        self.clickables.is_empty()
    }
}

/// A rectangle on the source image, in pixels.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right one.
/// Ordering is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Rect {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from an `[x1, y1, x2, y2]` array.
    pub fn from_array(coords: [i64; 4]) -> Self {
        let [x1, y1, x2, y2] = coords;
        Self::new(x1, y1, x2, y2)
    }

    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    /// Position and size in EMU, or `None` when a value does not fit in `i64`.
    pub fn to_emu(&self) -> Option<EmuRect> {
        let width = self.x2.checked_sub(self.x1)?;
        let height = self.y2.checked_sub(self.y1)?;
        Some(EmuRect {
            left: checked_px_to_emu(self.x1)?,
            top: checked_px_to_emu(self.y1)?,
            width: checked_px_to_emu(width)?,
            height: checked_px_to_emu(height)?,
        })
    }
}

/// Position and size of a shape in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmuRect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// A rectangle paired with the external URL it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clickable {
    pub rect: Rect,
    pub url: String,
}

impl Clickable {
    pub fn new(rect: Rect, url: impl Into<String>) -> Self {
        Self {
            rect,
            url: url.into(),
        }
    }
}
