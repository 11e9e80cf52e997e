//! Text measurement and rasterization.
//!
//! The raster renderer needs two things from a font: the glyph box of the
//! watermark string and an 8-bit coverage mask of it. Both come from a
//! [`TextRasterizer`] so the renderer never touches font internals.

use super::font::FontSource;
use super::lattice::GlyphBox;
use super::WatermarkError;
use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use image::{GrayImage, Luma};

/// Coverage mask of a rendered string; 255 means fully inked.
pub type GlyphMask = GrayImage;

/// Measures and rasterizes strings with a single font.
pub trait TextRasterizer: Send + Sync {
    /// Bounding box of `text` laid out on one line at `font_size`.
    fn measure(&self, text: &str, font_size: f32) -> GlyphBox;

    /// Coverage mask sized to the ceiling of [`TextRasterizer::measure`].
    fn rasterize(&self, text: &str, font_size: f32) -> GlyphMask;
}

/// `TextRasterizer` backed by an outline font.
#[derive(Clone)]
pub struct OutlineRasterizer {
    font: FontArc,
    name: String,
}

impl std::fmt::Debug for OutlineRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineRasterizer")
            .field("name", &self.name)
            .finish()
    }
}

impl OutlineRasterizer {
    pub fn from_source(source: &FontSource) -> Result<Self, WatermarkError> {
        let font = FontVec::try_from_vec_and_index(source.data.as_ref().clone(), source.index)
            .map_err(|e| {
                WatermarkError::FontUnavailable(format!("{} is not a usable font: {}", source.name, e))
            })?;

        Ok(Self {
            font: FontArc::new(font),
            name: source.name.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Horizontal advance of every glyph, kerning included, from x = 0.
    fn layout(&self, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = self.font.as_scaled(PxScale::from(font_size));

        let mut glyphs = Vec::with_capacity(text.len());
        let mut cursor = 0.0f32;
        let mut prev: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor += scaled.kern(prev, id);
            }
            glyphs.push((id, cursor));
            cursor += scaled.h_advance(id);
            prev = Some(id);
        }

        (glyphs, cursor)
    }
}

impl TextRasterizer for OutlineRasterizer {
    fn measure(&self, text: &str, font_size: f32) -> GlyphBox {
        if text.is_empty() {
            return GlyphBox::default();
        }

        let scaled = self.font.as_scaled(PxScale::from(font_size));
        let (_, width) = self.layout(text, font_size);
        GlyphBox::new(width.max(0.0), scaled.ascent() - scaled.descent())
    }

    fn rasterize(&self, text: &str, font_size: f32) -> GlyphMask {
        let glyph_box = self.measure(text, font_size);
        let width = (glyph_box.width.ceil() as u32).max(1);
        let height = (glyph_box.height.ceil() as u32).max(1);
        let mut mask = GrayImage::new(width, height);

        let scale = PxScale::from(font_size);
        let baseline = self.font.as_scaled(scale).ascent();
        let (glyphs, _) = self.layout(text, font_size);

        for (id, x) in glyphs {
            let glyph = id.with_scale_and_position(scale, point(x, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                    return;
                }

                // Overlapping glyph edges keep the stronger coverage
                let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                let pixel = mask.get_pixel_mut(x as u32, y as u32);
                if value > pixel[0] {
                    *pixel = Luma([value]);
                }
            });
        }

        mask
    }
}
