//! Raster image watermarking.
//!
//! The text is rasterized once into a coverage mask. Each tile placement is
//! then stamped with [`stamp`], a stateless primitive that takes the tile's
//! center and rotation as a plain [`TileTransform`]. Every canvas pixel in
//! the rotated footprint is mapped back into mask space (rotation about the
//! tile's own center), sampled bilinearly, and blended with the Porter-Duff
//! "over" operator.
//!
//! Output is always PNG, whatever the input format.

use super::lattice::{CanvasExtent, TileLattice, TilePlacement};
use super::style::{TextColor, WatermarkOptions};
use super::text::{GlyphMask, TextRasterizer};
use super::WatermarkError;
use crate::constants::MAX_MASK_PIXELS;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Where and how one tile is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileTransform {
    pub center_x: f32,
    pub center_y: f32,
    pub angle_degrees: f32,
}

impl From<TilePlacement> for TileTransform {
    fn from(p: TilePlacement) -> Self {
        Self {
            center_x: p.center_x,
            center_y: p.center_y,
            angle_degrees: p.angle_degrees,
        }
    }
}

/// Solid fill applied through the coverage mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub color: TextColor,
    pub alpha: u8,
}

/// Watermarks decoded images with text from a [`TextRasterizer`].
#[derive(Clone)]
pub struct RasterRenderer {
    text: Arc<dyn TextRasterizer>,
}

impl std::fmt::Debug for RasterRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterRenderer").finish_non_exhaustive()
    }
}

impl RasterRenderer {
    pub fn new(text: Arc<dyn TextRasterizer>) -> Self {
        Self { text }
    }

    /// Decode, watermark and return the RGBA result.
    pub fn render(&self, data: &[u8], options: &WatermarkOptions) -> Result<RgbaImage, WatermarkError> {
        let image = decode_image(data)?;
        self.render_image(image.to_rgba8(), options)
    }

    /// Decode, watermark and re-encode as PNG.
    pub fn render_png(&self, data: &[u8], options: &WatermarkOptions) -> Result<Vec<u8>, WatermarkError> {
        let image = self.render(data, options)?;
        encode_png(image)
    }

    /// Watermark an already decoded image in place and return it.
    pub fn render_image(
        &self,
        mut image: RgbaImage,
        options: &WatermarkOptions,
    ) -> Result<RgbaImage, WatermarkError> {
        options.validate()?;

        let font_size = options.effective_font_size();
        let glyph_box = self.text.measure(&options.text, font_size);
        let canvas = CanvasExtent::new(image.width() as f32, image.height() as f32);
        let lattice = TileLattice::new(canvas, glyph_box, options.tile_spec())?;

        let fill = Fill {
            color: options.text_color(),
            alpha: options.fill_alpha(),
        };
        if fill.alpha == 0 {
            tracing::debug!("Opacity is zero, leaving image untouched");
            return Ok(image);
        }

        if glyph_box.width * glyph_box.height > MAX_MASK_PIXELS {
            return Err(WatermarkError::invalid_parameter(
                "watermarkText",
                format!(
                    "text is too large to render ({}x{} pixels at size {})",
                    glyph_box.width.ceil(),
                    glyph_box.height.ceil(),
                    font_size
                ),
            ));
        }

        let mask = self.text.rasterize(&options.text, font_size);

        let mut tiles = 0usize;
        for placement in lattice.placements() {
            stamp(&mut image, &mask, placement.into(), fill);
            tiles += 1;
        }

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            glyph_width = glyph_box.width,
            glyph_height = glyph_box.height,
            tiles,
            "Stamped raster watermark"
        );

        Ok(image)
    }
}

/// Decode image bytes, guessing the format from the content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, WatermarkError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::UnsupportedFormat(e.to_string()))?
        .decode()
        .map_err(|e| WatermarkError::UnsupportedFormat(format!("cannot decode image: {}", e)))
}

/// Encode an RGBA image as PNG.
pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| WatermarkError::render_failure(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Draw `mask` centered at the transform's center, rotated about that
/// center by the transform's angle.
pub fn stamp(canvas: &mut RgbaImage, mask: &GlyphMask, transform: TileTransform, fill: Fill) {
    let half_w = mask.width() as f32 / 2.0;
    let half_h = mask.height() as f32 / 2.0;
    let (sin, cos) = transform.angle_degrees.to_radians().sin_cos();

    // Axis-aligned extent of the rotated mask
    let extent_x = cos.abs() * half_w + sin.abs() * half_h;
    let extent_y = sin.abs() * half_w + cos.abs() * half_h;

    let x_start = (transform.center_x - extent_x).floor().max(0.0) as i64;
    let y_start = (transform.center_y - extent_y).floor().max(0.0) as i64;
    let x_end = ((transform.center_x + extent_x).ceil() as i64).min(canvas.width() as i64);
    let y_end = ((transform.center_y + extent_y).ceil() as i64).min(canvas.height() as i64);

    let fill_alpha = fill.alpha as f32 / 255.0;

    for py in y_start..y_end {
        for px in x_start..x_end {
            let dx = px as f32 + 0.5 - transform.center_x;
            let dy = py as f32 + 0.5 - transform.center_y;

            // Inverse rotation back into mask space
            let u = dx * cos + dy * sin + half_w;
            let v = -dx * sin + dy * cos + half_h;

            let coverage = sample_coverage(mask, u, v);
            if coverage <= 0.0 {
                continue;
            }

            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            *pixel = blend_over(*pixel, fill.color, coverage * fill_alpha);
        }
    }
}

/// Bilinear coverage (0.0-1.0) at mask coordinates `(u, v)`.
fn sample_coverage(mask: &GlyphMask, u: f32, v: f32) -> f32 {
    let x = u - 0.5;
    let y = v - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let at = |xi: i64, yi: i64| -> f32 {
        if xi < 0 || yi < 0 || xi >= mask.width() as i64 || yi >= mask.height() as i64 {
            0.0
        } else {
            mask.get_pixel(xi as u32, yi as u32)[0] as f32 / 255.0
        }
    };

    let (x0, y0) = (x0 as i64, y0 as i64);
    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Porter-Duff "over" of a solid color with the given alpha onto `background`.
fn blend_over(background: Rgba<u8>, color: TextColor, alpha: f32) -> Rgba<u8> {
    let fg_alpha = alpha.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(color.r, background[0]),
        blend_channel(color.g, background[1]),
        blend_channel(color.b, background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
