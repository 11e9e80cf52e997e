// PDF watermarking through the public service API

use super::support::{letter_pdf, pdf_with_pages, BlockRasterizer};
use imageseal::watermark::{WatermarkError, WatermarkOptions, WatermarkService, PDF_MIME_TYPE};
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::sync::Arc;

fn service() -> WatermarkService {
    WatermarkService::new(Some(Arc::new(BlockRasterizer)), None)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a lopdf::Dictionary {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("expected a dictionary, got {:?}", other),
    }
}

fn page_resources(doc: &Document, page_id: lopdf::ObjectId) -> &lopdf::Dictionary {
    let page = doc.get_dictionary(page_id).unwrap();
    resolve(doc, page.get(b"Resources").unwrap())
}

fn operators(doc: &Document, page_id: lopdf::ObjectId) -> Vec<String> {
    let content = doc.get_page_content(page_id).unwrap();
    Content::decode(&content)
        .unwrap()
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}

#[test]
fn test_every_page_is_watermarked() {
    let options = WatermarkOptions::with_text("DRAFT");
    let result = service()
        .watermark_pdf(&letter_pdf(3), "minutes.pdf", &options)
        .unwrap();

    assert_eq!(result.mime_type, PDF_MIME_TYPE);
    assert_eq!(result.file_name, "minutes_watermarked.pdf");
    assert_eq!(result.page_count, Some(3));

    let doc = Document::load_mem(&result.data).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);

    for page_id in pages.values() {
        let ops = operators(&doc, *page_id);
        // The original drawing is still there, followed by the overlay.
        let original_tj = ops.iter().position(|op| op == "Tj").unwrap();
        let overlay_gs = ops.iter().position(|op| op == "gs").unwrap();
        assert!(original_tj < overlay_gs);
        assert!(ops.iter().filter(|op| *op == "Tj").count() > 1);
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        assert_eq!(ops.last().map(String::as_str), Some("Q"));
    }
}

#[test]
fn test_original_font_resources_survive() {
    let result = service()
        .watermark_pdf(&letter_pdf(1), "a.pdf", &WatermarkOptions::with_text("X"))
        .unwrap();
    let doc = Document::load_mem(&result.data).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();

    let fonts = resolve(&doc, page_resources(&doc, page_id).get(b"Font").unwrap());
    assert!(fonts.has(b"F1"));
    assert!(fonts.has(b"WmF1"));
}

#[test]
fn test_opacity_is_written_to_graphics_state() {
    let mut options = WatermarkOptions::with_text("X");
    options.opacity = 45;
    let result = service()
        .watermark_pdf(&letter_pdf(1), "a.pdf", &options)
        .unwrap();

    let doc = Document::load_mem(&result.data).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let states = resolve(&doc, page_resources(&doc, page_id).get(b"ExtGState").unwrap());
    let state = resolve(&doc, states.get(b"WmGS1").unwrap());

    let ca = state.get(b"ca").unwrap().as_float().unwrap();
    assert!((ca - 0.45).abs() < 1e-4);
}

#[test]
fn test_mixed_page_sizes_and_rotations() {
    let pdf = pdf_with_pages(&[
        ([0, 0, 612, 792], 0),
        ([0, 0, 842, 595], 90),
        ([0, 0, 200, 200], 180),
    ]);
    let result = service()
        .watermark_pdf(&pdf, "mixed.pdf", &WatermarkOptions::with_text("MIXED"))
        .unwrap();

    assert_eq!(result.page_count, Some(3));
    let doc = Document::load_mem(&result.data).unwrap();
    let cm_counts: Vec<usize> = doc
        .get_pages()
        .values()
        .map(|id| operators(&doc, *id).iter().filter(|op| *op == "cm").count())
        .collect();

    // Only rotated pages need their overlay mapped back into user space.
    assert_eq!(cm_counts, vec![0, 1, 1]);
}

#[test]
fn test_rejects_non_pdf_names() {
    let err = service()
        .watermark_pdf(&letter_pdf(1), "report.docx", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFormat(_)));
}

#[test]
fn test_corrupt_pdf_is_unsupported() {
    let err = service()
        .watermark_pdf(b"%PDF-1.4\nthis is not a document", "a.pdf", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFormat(_)));
}

#[test]
fn test_pdf_does_not_need_a_raster_font() {
    let service = WatermarkService::new(None, None);
    let result = service
        .watermark_pdf(&letter_pdf(2), "a.pdf", &WatermarkOptions::with_text("X"))
        .unwrap();
    assert_eq!(result.page_count, Some(2));
}

#[test]
fn test_empty_upload_is_invalid() {
    let err = service()
        .watermark_pdf(&[], "a.pdf", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::InvalidParameter { ref name, .. } if name == "file"));
}

#[tokio::test]
async fn test_async_pdf_watermark() {
    let result = service()
        .watermark_pdf_async(letter_pdf(1), "async.pdf".to_string(), WatermarkOptions::with_text("X"))
        .await
        .unwrap();
    assert_eq!(result.page_count, Some(1));
}
