//! Shared fixtures: a font-free rasterizer and small in-memory documents.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageseal::watermark::raster::encode_png;
use imageseal::watermark::{GlyphBox, GlyphMask, TextRasterizer};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Draws every character as a solid `0.6 * size` by `size` block.
#[derive(Debug, Default)]
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn measure(&self, text: &str, font_size: f32) -> GlyphBox {
        GlyphBox::new(text.chars().count() as f32 * font_size * 0.6, font_size)
    }

    fn rasterize(&self, text: &str, font_size: f32) -> GlyphMask {
        let glyph_box = self.measure(text, font_size);
        GrayImage::from_pixel(
            (glyph_box.width.ceil() as u32).max(1),
            (glyph_box.height.ceil() as u32).max(1),
            Luma([255]),
        )
    }
}

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub fn white_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, WHITE)).unwrap()
}

/// A PDF whose pages have the given media boxes and rotations.
pub fn pdf_with_pages(pages: &[([i64; 4], i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for (media_box, rotate) in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(14)]),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(50)]),
                Operation::new("Tj", vec![Object::string_literal("Quarterly report")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            "Rotate" => Object::Integer(*rotate),
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(kids.len() as i64),
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn letter_pdf(page_count: usize) -> Vec<u8> {
    pdf_with_pages(&vec![([0, 0, 612, 792], 0); page_count])
}
