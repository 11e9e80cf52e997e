//! Per-page geometry and watermark overlay streams.

use super::font::{EncodedText, PdfFont};
use crate::constants::{DEFAULT_PAGE_SIZE, PDF_FONT_RESOURCE, PDF_GSTATE_RESOURCE};
use crate::watermark::lattice::{CanvasExtent, GlyphBox, TileLattice};
use crate::watermark::style::WatermarkOptions;
use crate::watermark::WatermarkError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page tree levels walked when resolving inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Page box and rotation, as needed to lay out a watermark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub llx: f32,
    pub lly: f32,
    pub width: f32,
    pub height: f32,
    /// Normalised `/Rotate`: 0, 90, 180 or 270
    pub rotation: u16,
}

impl PageGeometry {
    pub fn new(llx: f32, lly: f32, width: f32, height: f32, rotation: u16) -> Self {
        Self {
            llx,
            lly,
            width,
            height,
            rotation,
        }
    }

    /// Read the effective MediaBox and Rotate of a page.
    pub fn of_page(doc: &Document, page_id: ObjectId) -> Self {
        let media_box = inherited(doc, page_id, b"MediaBox").and_then(|o| rectangle(doc, o));

        let [x0, y0, x1, y1] = media_box.unwrap_or_else(|| {
            tracing::debug!(page = ?page_id, "No usable MediaBox, assuming US Letter");
            let (w, h) = DEFAULT_PAGE_SIZE;
            [0.0, 0.0, w, h]
        });

        let rotation = inherited(doc, page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .map(normalize_rotation)
            .unwrap_or(0);

        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs(), rotation)
    }

    /// Extent in the page's displayed orientation.
    pub fn displayed_extent(&self) -> CanvasExtent {
        match self.rotation {
            90 | 270 => CanvasExtent::new(self.height, self.width),
            _ => CanvasExtent::new(self.width, self.height),
        }
    }

    /// `cm` operands mapping displayed space into user space, or `None`
    /// when the two coincide.
    pub fn user_space_matrix(&self) -> Option<[f32; 6]> {
        let (w, h) = (self.width, self.height);
        let (a, b, c, d, e, f) = match self.rotation {
            90 => (0.0, 1.0, -1.0, 0.0, w, 0.0),
            180 => (-1.0, 0.0, 0.0, -1.0, w, h),
            270 => (0.0, -1.0, 1.0, 0.0, 0.0, h),
            _ => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
        };
        let matrix = [a, b, c, d, e + self.llx, f + self.lly];

        if matrix == [1.0, 0.0, 0.0, 1.0, 0.0, 0.0] {
            None
        } else {
            Some(matrix)
        }
    }
}

/// Snap `/Rotate` to a quarter turn; anything else is treated as 0.
fn normalize_rotation(value: i64) -> u16 {
    match value.rem_euclid(360) {
        r @ (0 | 90 | 180 | 270) => r as u16,
        _ => 0,
    }
}

/// Look `key` up on the page, then on its ancestors.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return doc.dereference(value).ok().map(|(_, object)| object);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn rectangle(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let items = object.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }

    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        let (_, value) = doc.dereference(item).ok()?;
        *slot = value.as_float().ok()?;
    }

    let usable = rect.iter().all(|v| v.is_finite()) && rect[0] != rect[2] && rect[1] != rect[3];
    usable.then_some(rect)
}

/// Everything a page overlay needs that is shared by all pages.
#[derive(Debug)]
pub struct OverlayStyle<'a> {
    pub font: &'a PdfFont,
    pub text: &'a EncodedText,
    pub font_size: f32,
    pub options: &'a WatermarkOptions,
}

/// Build the content stream drawn after the page's own content.
///
/// It starts with `Q` to close the `q` that precedes the original content,
/// then draws all tiles inside a fresh `q`/`Q` pair.
pub fn overlay_content(geometry: &PageGeometry, style: &OverlayStyle<'_>) -> Result<Vec<u8>, WatermarkError> {
    let text_width = style.text.width(style.font_size);
    let glyph_box = GlyphBox::new(text_width, style.font_size);
    let lattice = TileLattice::new(geometry.displayed_extent(), glyph_box, style.options.tile_spec())?;

    let (ascent, descent) = style.font.vertical_metrics();
    // Offset from the text origin to the middle of the string
    let local_x = text_width / 2.0;
    let local_y = (ascent + descent) / 2.0 * style.font_size / 1000.0;

    let (r, g, b) = style.options.text_color().to_unit_rgb();
    let mut operations = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];

    if let Some(matrix) = geometry.user_space_matrix() {
        operations.push(Operation::new("cm", reals(&matrix)));
    }

    operations.extend([
        Operation::new("gs", vec![Object::Name(PDF_GSTATE_RESOURCE.as_bytes().to_vec())]),
        Operation::new("rg", reals(&[r, g, b])),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(PDF_FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(style.font_size),
            ],
        ),
    ]);

    let text = style.text.to_object();
    for placement in lattice.placements() {
        let (sin, cos) = placement.angle_degrees.to_radians().sin_cos();
        let origin_x = placement.center_x - (local_x * cos - local_y * sin);
        let origin_y = placement.center_y - (local_x * sin + local_y * cos);

        operations.push(Operation::new("Tm", reals(&[cos, sin, -sin, cos, origin_x, origin_y])));
        operations.push(Operation::new("Tj", vec![text.clone()]));
    }

    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| WatermarkError::render_failure(format!("cannot encode content stream: {}", e)))
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

/// Existing content stream references of a page, in drawing order.
pub(crate) fn content_references(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Page resources flattened into a direct dictionary with the watermark
/// font and graphics state added.
pub(crate) fn merged_resources(
    doc: &Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> Dictionary {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    add_named_resource(doc, &mut resources, b"Font", PDF_FONT_RESOURCE, font_id);
    add_named_resource(doc, &mut resources, b"ExtGState", PDF_GSTATE_RESOURCE, gstate_id);
    resources
}

fn add_named_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    id: ObjectId,
) {
    let mut entries = resources
        .get(category)
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    entries.set(name, Object::Reference(id));
    resources.set(category.to_vec(), Object::Dictionary(entries));
}
