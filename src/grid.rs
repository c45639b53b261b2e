//! Panel grid transform: address a flat logical canvas while the pixels
//! land on chained, reordered and rotated physical panels.
//!
//! The logical canvas is cut into a `rows × cols` grid of panel-sized
//! cells. Cell `(row, col)` is described by `panels[row * cols + col]`
//! (row-major). Each descriptor says where that panel really sits on the
//! driver canvas:
//!
//! - `order` picks the panel slot along the chain, so the panel occupies
//!   driver columns `order * panel_width ..`.
//! - `parallel` picks the output line, so the panel occupies driver rows
//!   `parallel * panel_height ..`.
//! - `rotate` turns the panel's content by a multiple of 90° to account for
//!   how it is mounted.
//!
//! ## Rust concepts
//! - `Arc<[T]>` for an immutable table shared without copying
//! - `TryFrom` plus `#[serde(try_from)]` to reject invalid values at parse time
//! - A borrowed `Option<&'a mut S>` instead of a raw pointer

use crate::Color;
use crate::surface::{DrawSurface, SurfaceTransform};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ── Errors ───────────────────────────────────────────────────────────

/// Why a panel layout was rejected at construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error(
        "grid dimensions must be positive: display {width}x{height}, panel {panel_width}x{panel_height}, chain {chain_length}"
    )]
    NonPositive {
        width: i32,
        height: i32,
        panel_width: i32,
        panel_height: i32,
        chain_length: usize,
    },

    #[error("expected one panel descriptor per chained panel ({expected}), got {actual}")]
    PanelCount { expected: usize, actual: usize },

    #[error(
        "display {width}x{height} is not a whole number of {panel_width}x{panel_height} panels"
    )]
    Uneven {
        width: i32,
        height: i32,
        panel_width: i32,
        panel_height: i32,
    },

    #[error("a {rows}x{cols} grid needs {} panels, but the chain has {chain_length}", .rows * .cols)]
    Factorization {
        rows: i32,
        cols: i32,
        chain_length: usize,
    },

    #[error("unsupported panel rotation {0}°, expected 0, 90, 180 or 270")]
    InvalidRotation(u16),
}

// ── Panel descriptors ────────────────────────────────────────────────

/// Clockwise rotation of a mounted panel.
///
/// Serialized as the number of degrees, so a config file says
/// `"rotate": 180`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether this rotation swaps the panel's axes.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Rotate a pixel offset inside a `panel_width × panel_height` cell.
    ///
    /// Quarter turns land in the swapped `panel_height × panel_width` frame.
    #[inline]
    pub fn apply(self, x: i32, y: i32, panel_width: i32, panel_height: i32) -> (i32, i32) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (panel_height - 1 - y, x),
            Rotation::Deg180 => (panel_width - 1 - x, panel_height - 1 - y),
            Rotation::Deg270 => (y, panel_width - 1 - x),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = GridError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(GridError::InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Where one grid cell's panel physically sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Panel {
    /// Slot along the chain (0 is the first panel the data reaches)
    pub order: u32,
    /// Rotation the panel is mounted with
    #[serde(default)]
    pub rotate: Rotation,
    /// Output line feeding the panel
    #[serde(default)]
    pub parallel: u32,
}

impl Panel {
    pub fn new(order: u32, rotate: Rotation, parallel: u32) -> Self {
        Self {
            order,
            rotate,
            parallel,
        }
    }
}

// ── Transformer ──────────────────────────────────────────────────────

/// A logical drawing surface laid over a grid of physical panels.
///
/// The physical surface (`source`) is borrowed, never owned: the caller
/// creates it, keeps it alive for `'a`, and gets it back when the
/// transformer is dropped or [`detach`](SurfaceTransform::detach)ed.
/// Drawing before a source is attached is a programming error and panics.
pub struct GridTransformer<'a, S: ?Sized> {
    width: i32,
    height: i32,
    panel_width: i32,
    panel_height: i32,
    chain_length: usize,
    rows: i32,
    cols: i32,
    panels: Arc<[Panel]>,
    source: Option<&'a mut S>,
}

impl<'a, S: ?Sized> GridTransformer<'a, S> {
    /// Validate a panel layout and build an unattached transformer.
    ///
    /// `chain_length` is the total number of panels and must equal
    /// `panels.len()`. The display must be an exact `rows × cols` tiling of
    /// panels with `rows * cols == chain_length`.
    pub fn new(
        width: i32,
        height: i32,
        panel_width: i32,
        panel_height: i32,
        chain_length: usize,
        panels: Vec<Panel>,
    ) -> Result<Self, GridError> {
        if width <= 0 || height <= 0 || panel_width <= 0 || panel_height <= 0 || chain_length == 0
        {
            return Err(GridError::NonPositive {
                width,
                height,
                panel_width,
                panel_height,
                chain_length,
            });
        }

        if panels.len() != chain_length {
            return Err(GridError::PanelCount {
                expected: chain_length,
                actual: panels.len(),
            });
        }

        if width % panel_width != 0 || height % panel_height != 0 {
            return Err(GridError::Uneven {
                width,
                height,
                panel_width,
                panel_height,
            });
        }

        let rows = height / panel_height;
        let cols = width / panel_width;
        if (rows as usize) * (cols as usize) != chain_length {
            return Err(GridError::Factorization {
                rows,
                cols,
                chain_length,
            });
        }

        tracing::debug!(
            "Panel grid {}x{} ({} panels of {}x{}) over a {}x{} display",
            cols,
            rows,
            chain_length,
            panel_width,
            panel_height,
            width,
            height
        );

        Ok(Self {
            width,
            height,
            panel_width,
            panel_height,
            chain_length,
            rows,
            cols,
            panels: panels.into(),
            source: None,
        })
    }

    /// Number of panel rows in the grid.
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of panel columns in the grid.
    pub fn columns(&self) -> i32 {
        self.cols
    }

    pub fn panel_width(&self) -> i32 {
        self.panel_width
    }

    pub fn panel_height(&self) -> i32 {
        self.panel_height
    }

    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    /// The panel table in row-major grid order.
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// A copy of this layout with no surface attached.
    ///
    /// The panel table is shared, so this does not allocate. Render loops
    /// use it to bind a fresh transformer to each frame's canvas.
    pub fn unattached<'b>(&self) -> GridTransformer<'b, S> {
        GridTransformer {
            width: self.width,
            height: self.height,
            panel_width: self.panel_width,
            panel_height: self.panel_height,
            chain_length: self.chain_length,
            rows: self.rows,
            cols: self.cols,
            panels: Arc::clone(&self.panels),
            source: None,
        }
    }

    /// Map a logical pixel to its physical address on the driver canvas.
    ///
    /// Returns `None` for pixels outside the logical display, and for panels
    /// whose `order` or `parallel` puts them beyond any addressable canvas.
    #[inline]
    pub fn map(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }

        let cell_row = y / self.panel_height;
        let cell_col = x / self.panel_width;
        let panel = &self.panels[(cell_row * self.cols + cell_col) as usize];

        let (local_x, local_y) = panel.rotate.apply(
            x % self.panel_width,
            y % self.panel_height,
            self.panel_width,
            self.panel_height,
        );

        // A quarter-turned panel is mounted with its axes swapped.
        let (frame_width, frame_height) = if panel.rotate.is_quarter_turn() {
            (self.panel_height, self.panel_width)
        } else {
            (self.panel_width, self.panel_height)
        };

        let chain_x = i32::try_from(panel.order).ok()?.checked_mul(frame_width)?;
        let band_y = i32::try_from(panel.parallel).ok()?.checked_mul(frame_height)?;
        Some((chain_x.checked_add(local_x)?, band_y.checked_add(local_y)?))
    }

    fn source(&mut self, operation: &str) -> &mut S {
        match self.source.as_deref_mut() {
            Some(source) => source,
            None => panic!(
                "GridTransformer::{operation} called before a physical surface was attached"
            ),
        }
    }
}

impl<S: DrawSurface + ?Sized> DrawSurface for GridTransformer<'_, S> {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn clear(&mut self) {
        self.source("clear").clear();
    }

    fn fill(&mut self, color: Color) {
        self.source("fill").fill(color);
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some((physical_x, physical_y)) = self.map(x, y) {
            self.source("set_pixel")
                .set_pixel(physical_x, physical_y, color);
        }
    }
}

impl<'a, S: DrawSurface + ?Sized> SurfaceTransform<'a, S> for GridTransformer<'a, S> {
    fn transform(&mut self, source: &'a mut S) -> &mut Self {
        self.source = Some(source);
        self
    }

    fn detach(&mut self) -> Option<&'a mut S> {
        self.source.take()
    }
}
