//! Tile lattice generation for repeated, rotated watermarks.
//!
//! Both renderers (raster images and PDF pages) lay out their watermark on
//! the same lattice: a regular grid of tile centers, spaced by the measured
//! glyph box plus a margin, rotated about the canvas center and culled
//! against the canvas.
//!
//! # Geometry
//!
//! The lattice is built in an un-rotated local frame centered on the canvas.
//! Its half-extent on each axis is the canvas diagonal, which is the longest
//! projection of the canvas onto any direction, so rotating the lattice by
//! any angle still covers every corner.
//!
//! A lattice point is kept only if it falls inside the canvas expanded by
//! the glyph box width (horizontally) and height (vertically). The test uses
//! the un-rotated glyph box even though the glyph is drawn rotated; it never
//! drops a visible tile but may keep a few that end up just off the canvas.
//!
//! # Example
//!
//! ```
//! use imageseal::watermark::lattice::{CanvasExtent, GlyphBox, TileLattice, TileSpec};
//!
//! let canvas = CanvasExtent::new(100.0, 100.0);
//! let glyph = GlyphBox::new(200.0, 200.0);
//! let spec = TileSpec { spacing_margin: 100.0, angle_degrees: 0.0 };
//!
//! let lattice = TileLattice::new(canvas, glyph, spec).unwrap();
//! let placements: Vec<_> = lattice.placements().collect();
//! assert_eq!(placements.len(), 1);
//! assert_eq!((placements[0].center_x, placements[0].center_y), (50.0, 50.0));
//! ```

use crate::constants::{DEFAULT_ANGLE, DEFAULT_SPACING_MARGIN, MAX_LATTICE_POINTS};
use thiserror::Error;

/// Dimensions of the page or image being watermarked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasExtent {
    pub width: f32,
    pub height: f32,
}

impl CanvasExtent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Measured bounding box of the watermark string, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBox {
    pub width: f32,
    pub height: f32,
}

impl GlyphBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Layout parameters for the tiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpec {
    /// Gap added to the glyph box on both axes. Values <= 0 use the default.
    pub spacing_margin: f32,
    /// Rotation of the whole lattice and of every glyph, in degrees.
    pub angle_degrees: f32,
}

impl Default for TileSpec {
    fn default() -> Self {
        Self {
            spacing_margin: DEFAULT_SPACING_MARGIN,
            angle_degrees: DEFAULT_ANGLE,
        }
    }
}

impl TileSpec {
    /// Margin actually applied between tiles.
    pub fn effective_margin(&self) -> f32 {
        if self.spacing_margin > 0.0 {
            self.spacing_margin
        } else {
            DEFAULT_SPACING_MARGIN
        }
    }
}

/// One draw instruction: render the watermark centered here, rotated by
/// `angle_degrees` about this same point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub center_x: f32,
    pub center_y: f32,
    pub angle_degrees: f32,
}

/// Errors raised before any placement is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    #[error("invalid canvas {width}x{height}: {reason}")]
    InvalidCanvas {
        width: f32,
        height: f32,
        reason: &'static str,
    },

    #[error("invalid lattice parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// A validated tiling of one canvas.
///
/// Construction does all validation; iterating [`TileLattice::placements`]
/// cannot fail and always terminates.
#[derive(Debug, Clone)]
pub struct TileLattice {
    canvas: CanvasExtent,
    glyph: GlyphBox,
    angle_degrees: f32,
    sin: f32,
    cos: f32,
    horizontal_spacing: f32,
    vertical_spacing: f32,
    columns: i64,
    rows: i64,
}

impl TileLattice {
    /// Validate the inputs and compute the lattice dimensions.
    pub fn new(
        canvas: CanvasExtent,
        glyph: GlyphBox,
        spec: TileSpec,
    ) -> Result<Self, LatticeError> {
        validate_canvas(&canvas)?;
        require_non_negative("glyph_box.width", glyph.width)?;
        require_non_negative("glyph_box.height", glyph.height)?;
        require_finite("spacing_margin", spec.spacing_margin)?;
        require_finite("angle_degrees", spec.angle_degrees)?;

        let margin = spec.effective_margin();
        let horizontal_spacing = glyph.width + margin;
        let vertical_spacing = glyph.height + margin;

        if !horizontal_spacing.is_finite() || !vertical_spacing.is_finite() {
            return Err(LatticeError::InvalidParameter {
                name: "spacing_margin",
                reason: format!("{} overflows the tile spacing", margin),
            });
        }

        // Counted in f64 so that no finite canvas can overflow the cast.
        let diagonal = f64::from(canvas.width).hypot(f64::from(canvas.height));
        let (Some(columns), Some(rows)) = (
            axis_count(diagonal, horizontal_spacing),
            axis_count(diagonal, vertical_spacing),
        ) else {
            return Err(LatticeError::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
                reason: "canvas is too large to tile",
            });
        };

        let points = span(columns) as u64 * span(rows) as u64;
        if points > MAX_LATTICE_POINTS {
            return Err(LatticeError::InvalidParameter {
                name: "spacing_margin",
                reason: format!(
                    "spacing {} needs {} lattice positions on a {}x{} canvas, more than {}",
                    margin, points, canvas.width, canvas.height, MAX_LATTICE_POINTS
                ),
            });
        }

        let (sin, cos) = spec.angle_degrees.to_radians().sin_cos();

        Ok(Self {
            canvas,
            glyph,
            angle_degrees: spec.angle_degrees,
            sin,
            cos,
            horizontal_spacing,
            vertical_spacing,
            columns,
            rows,
        })
    }

    /// Distance between neighbouring columns, before rotation.
    pub fn horizontal_spacing(&self) -> f32 {
        self.horizontal_spacing
    }

    /// Distance between neighbouring rows, before rotation.
    pub fn vertical_spacing(&self) -> f32 {
        self.vertical_spacing
    }

    /// Column count derived from the canvas diagonal (`ceil(2d / h) + 2`).
    pub fn columns(&self) -> i64 {
        self.columns
    }

    /// Row count derived from the canvas diagonal (`ceil(2d / v) + 2`).
    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// Number of lattice positions visited, which bounds the placement count.
    pub fn upper_bound(&self) -> usize {
        span(self.columns) * span(self.rows)
    }

    /// Lazily yield the visible placements, row-major, rows and columns
    /// ascending from the most negative index.
    pub fn placements(&self) -> Placements<'_> {
        Placements {
            lattice: self,
            row: -(self.rows / 2),
            col: -(self.columns / 2),
        }
    }

    /// Canvas position of a lattice point after rotation about the center.
    fn position(&self, row: i64, col: i64) -> (f32, f32) {
        let x = col as f32 * self.horizontal_spacing;
        let y = row as f32 * self.vertical_spacing;

        let rotated_x = x * self.cos - y * self.sin;
        let rotated_y = x * self.sin + y * self.cos;

        (
            self.canvas.width / 2.0 + rotated_x,
            self.canvas.height / 2.0 + rotated_y,
        )
    }

    /// Conservative visibility test against the canvas grown by the glyph box.
    fn is_visible(&self, x: f32, y: f32) -> bool {
        x > -self.glyph.width
            && x < self.canvas.width + self.glyph.width
            && y > -self.glyph.height
            && y < self.canvas.height + self.glyph.height
    }
}

/// Iterator over the visible placements of a [`TileLattice`].
#[derive(Debug, Clone)]
pub struct Placements<'a> {
    lattice: &'a TileLattice,
    row: i64,
    col: i64,
}

impl Iterator for Placements<'_> {
    type Item = TilePlacement;

    fn next(&mut self) -> Option<TilePlacement> {
        let last_row = self.lattice.rows / 2;
        let last_col = self.lattice.columns / 2;

        while self.row <= last_row {
            let (row, col) = (self.row, self.col);
            if col < last_col {
                self.col += 1;
            } else {
                self.col = -last_col;
                self.row += 1;
            }

            let (x, y) = self.lattice.position(row, col);
            if self.lattice.is_visible(x, y) {
                return Some(TilePlacement {
                    center_x: x,
                    center_y: y,
                    angle_degrees: self.lattice.angle_degrees,
                });
            }
        }

        None
    }
}

/// Generate every visible placement for one canvas.
pub fn generate(
    canvas: CanvasExtent,
    glyph: GlyphBox,
    spec: TileSpec,
) -> Result<Vec<TilePlacement>, LatticeError> {
    let lattice = TileLattice::new(canvas, glyph, spec)?;
    Ok(lattice.placements().collect())
}

/// `ceil(2d / spacing) + 2`, or `None` when a single axis alone would
/// exceed the lattice limit.
fn axis_count(diagonal: f64, spacing: f32) -> Option<i64> {
    let count = (2.0 * diagonal / f64::from(spacing)).ceil() + 2.0;
    if count.is_finite() && count <= MAX_LATTICE_POINTS as f64 {
        Some(count as i64)
    } else {
        None
    }
}

/// Inclusive index count of `-(n/2)..=(n/2)`.
fn span(n: i64) -> usize {
    (2 * (n / 2) + 1) as usize
}

fn validate_canvas(canvas: &CanvasExtent) -> Result<(), LatticeError> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if valid(canvas.width) && valid(canvas.height) {
        Ok(())
    } else {
        Err(LatticeError::InvalidCanvas {
            width: canvas.width,
            height: canvas.height,
            reason: "dimensions must be finite and positive",
        })
    }
}

fn require_finite(name: &'static str, value: f32) -> Result<(), LatticeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LatticeError::InvalidParameter {
            name,
            reason: format!("{} is not a finite value", value),
        })
    }
}

fn require_non_negative(name: &'static str, value: f32) -> Result<(), LatticeError> {
    require_finite(name, value)?;
    if value < 0.0 {
        return Err(LatticeError::InvalidParameter {
            name,
            reason: format!("{} must not be negative", value),
        });
    }
    Ok(())
}
