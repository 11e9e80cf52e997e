//! Tiled text watermarks for raster images and PDF documents.
//!
//! The same text is repeated across the whole surface on a rotated grid so
//! that cropping any region still leaves a readable copy.
//!
//! # Layout
//!
//! - [`lattice`] computes where tiles go. It is pure geometry and knows
//!   nothing about pixels or pages.
//! - [`raster`] stamps tiles onto decoded images and re-encodes them as PNG.
//! - [`pdf`] appends tiles to every page of a PDF as text drawing operators.
//! - [`service`] validates uploads and picks the renderer.
//!
//! # Example
//!
//! ```ignore
//! use imageseal::watermark::{WatermarkOptions, WatermarkService};
//! use imageseal::watermark::font::SystemFonts;
//!
//! let service = WatermarkService::from_font_provider(&SystemFonts::default());
//! let mut options = WatermarkOptions::with_text("CONFIDENTIAL");
//! options.angle = -45.0;
//!
//! let result = service.watermark_image(&bytes, "scan.jpg", &options)?;
//! assert_eq!(result.file_name, "scan_watermarked.png");
//! ```

pub mod error;
pub mod font;
pub mod lattice;
pub mod pdf;
pub mod raster;
pub mod service;
pub mod style;
pub mod text;

// Re-export main types for convenience
pub use error::WatermarkError;
pub use font::{font_provider_from_config, FontProvider, FontSource};
pub use lattice::{
    generate, CanvasExtent, GlyphBox, LatticeError, TileLattice, TilePlacement, TileSpec,
};
pub use pdf::{DocumentPageRenderer, PdfOutput};
pub use raster::{stamp, RasterRenderer, TileTransform};
pub use service::{
    output_file_name, WatermarkService, WatermarkedDocument, PDF_MIME_TYPE, PNG_MIME_TYPE,
};
pub use style::{TextColor, WatermarkOptions};
pub use text::{GlyphMask, OutlineRasterizer, TextRasterizer};
