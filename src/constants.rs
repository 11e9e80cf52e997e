// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Request defaults match what the web frontend sends when a field is left
// untouched, so omitting a form field and sending its default are equivalent.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_PORT: u16 = 30032;

/// Default maximum upload size in megabytes (50 MB)
pub const DEFAULT_MAX_BODY_SIZE_MB: usize = 50;

/// Default per-request processing timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Watermark request defaults
// =============================================================================

/// Default font size (pixels for images, points for PDF pages)
pub const DEFAULT_FONT_SIZE: i32 = 30;

/// Largest accepted font size
pub const MAX_FONT_SIZE: i32 = 1000;

/// Default watermark color
pub const DEFAULT_COLOR: &str = "#888888";

/// Default opacity percentage (0-100)
pub const DEFAULT_OPACITY: i32 = 30;

/// Default rotation angle in degrees
pub const DEFAULT_ANGLE: f32 = -30.0;

/// Default spacing between tiles, in addition to the glyph box
pub const DEFAULT_SPACING: i32 = 100;

/// Margin used when the requested spacing is zero or negative
pub const DEFAULT_SPACING_MARGIN: f32 = 100.0;

/// Neutral gray used when a color string cannot be parsed
pub const FALLBACK_GRAY: (u8, u8, u8) = (128, 128, 128);

// =============================================================================
// Lattice limits
// =============================================================================

/// Upper limit on lattice positions enumerated for a single canvas
pub const MAX_LATTICE_POINTS: u64 = 4_000_000;

/// Upper limit on the pixels of one rasterized watermark string (64 MiB mask)
pub const MAX_MASK_PIXELS: f32 = 64.0 * 1024.0 * 1024.0;

// =============================================================================
// Input validation
// =============================================================================

/// Raster extensions accepted by the image endpoint
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Extension accepted by the PDF endpoint
pub const PDF_EXTENSION: &str = "pdf";

/// Suffix appended to the original file stem for output documents
pub const OUTPUT_SUFFIX: &str = "_watermarked";

// =============================================================================
// PDF defaults
// =============================================================================

/// US Letter media box used when a page has none
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Resource name of the watermark font on each page
pub const PDF_FONT_RESOURCE: &str = "WmF1";

/// Resource name of the watermark graphics state on each page
pub const PDF_GSTATE_RESOURCE: &str = "WmGS1";
