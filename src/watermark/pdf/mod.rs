//! PDF document watermarking.
//!
//! Every page gets the same tiled text laid out in its displayed
//! orientation. The original page content is left byte-for-byte intact and
//! wrapped in `q`/`Q`; the watermark is appended as an extra content stream
//! so it is drawn over the page.
//!
//! Overlay streams are built in parallel with rayon. Only the final
//! insertion into the document is sequential.

pub mod font;
pub mod page;

pub use font::{EncodedText, PdfFont};
pub use page::{overlay_content, OverlayStyle, PageGeometry};

use super::font::FontSource;
use super::style::WatermarkOptions;
use super::WatermarkError;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rayon::prelude::*;

/// A watermarked PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOutput {
    pub data: Vec<u8>,
    pub page_count: usize,
}

/// Stamps watermark text onto every page of a PDF.
#[derive(Debug, Clone)]
pub struct DocumentPageRenderer {
    font: PdfFont,
}

impl DocumentPageRenderer {
    /// Embed `font` when it is a single-face TrueType font, otherwise draw
    /// with standard Helvetica.
    pub fn new(font: Option<FontSource>) -> Self {
        Self {
            font: PdfFont::select(font),
        }
    }

    pub fn font(&self) -> &PdfFont {
        &self.font
    }

    pub fn render(&self, data: &[u8], options: &WatermarkOptions) -> Result<PdfOutput, WatermarkError> {
        options.validate()?;

        let mut doc = Document::load_mem(data)
            .map_err(|e| WatermarkError::UnsupportedFormat(format!("cannot parse PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(WatermarkError::UnsupportedFormat(
                "encrypted PDF documents are not supported".to_string(),
            ));
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(WatermarkError::UnsupportedFormat(
                "PDF document has no pages".to_string(),
            ));
        }

        let font_size = options.effective_font_size();
        let text = self.font.encode(&options.text);
        let style = OverlayStyle {
            font: &self.font,
            text: &text,
            font_size,
            options,
        };

        let geometries: Vec<PageGeometry> = pages
            .iter()
            .map(|page_id| PageGeometry::of_page(&doc, *page_id))
            .collect();

        let overlays = geometries
            .par_iter()
            .map(|geometry| overlay_content(geometry, &style))
            .collect::<Result<Vec<_>, _>>()?;

        let font_id = self.font.add_to_document(&mut doc, &text)?;
        let opacity = options.fill_opacity();
        let gstate_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "CA" => Object::Real(opacity),
            "ca" => Object::Real(opacity),
        });
        let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));

        for (page_id, overlay) in pages.iter().zip(overlays) {
            attach_overlay(&mut doc, *page_id, open_id, overlay, font_id, gstate_id)?;
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| WatermarkError::render_failure(format!("cannot save PDF: {}", e)))?;

        tracing::debug!(
            pages = pages.len(),
            embedded_font = self.font.is_embedded(),
            bytes = output.len(),
            "Stamped PDF watermark"
        );

        Ok(PdfOutput {
            data: output,
            page_count: pages.len(),
        })
    }
}

fn attach_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    open_id: ObjectId,
    overlay: Vec<u8>,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> Result<(), WatermarkError> {
    let mut contents = vec![Object::Reference(open_id)];
    contents.extend(page::content_references(doc, page_id));
    let resources = page::merged_resources(doc, page_id, font_id, gstate_id);

    let overlay_id = doc.add_object(Stream::new(dictionary! {}, overlay));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| WatermarkError::render_failure(format!("page {:?} is not a dictionary: {}", page_id, e)))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}
