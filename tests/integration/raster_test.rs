// Raster watermarking through the public service API

use super::support::{white_png, BlockRasterizer, WHITE};
use image::{Rgba, RgbaImage};
use imageseal::watermark::{
    TextColor, WatermarkError, WatermarkOptions, WatermarkService, PNG_MIME_TYPE,
};
use rstest::rstest;
use std::sync::Arc;

fn service() -> WatermarkService {
    WatermarkService::new(Some(Arc::new(BlockRasterizer)), None)
}

fn decode(data: &[u8]) -> RgbaImage {
    image::load_from_memory(data).unwrap().to_rgba8()
}

fn changed_pixels(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| **p != WHITE).count()
}

#[test]
fn test_image_is_returned_as_png_with_same_dimensions() {
    let options = WatermarkOptions::with_text("SAMPLE");
    let result = service()
        .watermark_image(&white_png(320, 240), "holiday.jpeg", &options)
        .unwrap();

    assert_eq!(result.mime_type, PNG_MIME_TYPE);
    assert_eq!(result.file_name, "holiday_watermarked.png");
    assert_eq!(result.page_count, None);
    assert!(result.data.starts_with(b"\x89PNG"));

    let image = decode(&result.data);
    assert_eq!(image.dimensions(), (320, 240));
    assert!(changed_pixels(&image) > 0);
}

#[test]
fn test_tiles_cover_every_quadrant() {
    let mut options = WatermarkOptions::with_text("TILE");
    options.font_size = 16;
    options.spacing = 20;
    options.opacity = 100;
    options.color = "#000000".to_string();

    let result = service()
        .watermark_image(&white_png(400, 400), "grid.png", &options)
        .unwrap();
    let image = decode(&result.data);

    for (x0, y0) in [(0, 0), (200, 0), (0, 200), (200, 200)] {
        let touched = (y0..y0 + 200)
            .flat_map(|y| (x0..x0 + 200).map(move |x| (x, y)))
            .any(|(x, y)| *image.get_pixel(x, y) != WHITE);
        assert!(touched, "quadrant at ({}, {}) has no watermark", x0, y0);
    }
}

#[test]
fn test_opacity_scales_ink() {
    let render = |opacity: i32| {
        let mut options = WatermarkOptions::with_text("INK");
        options.opacity = opacity;
        options.color = "#000000".to_string();
        options.angle = 0.0;
        let result = service()
            .watermark_image(&white_png(200, 100), "a.png", &options)
            .unwrap();
        let image = decode(&result.data);
        image.pixels().map(|p| 255 - p[0] as u64).sum::<u64>()
    };

    let faint = render(20);
    let strong = render(80);
    assert!(faint > 0);
    assert!(strong > faint * 2);
}

#[test]
fn test_color_is_applied() {
    let mut options = WatermarkOptions::with_text("A");
    options.font_size = 20;
    options.opacity = 100;
    options.angle = 0.0;
    options.color = "#FF0000".to_string();

    let result = service()
        .watermark_image(&white_png(200, 100), "a.png", &options)
        .unwrap();
    let image = decode(&result.data);

    assert_eq!(*image.get_pixel(100, 50), Rgba([255, 0, 0, 255]));
}

#[test]
fn test_invalid_color_falls_back_to_gray() {
    let mut options = WatermarkOptions::with_text("A");
    options.font_size = 20;
    options.opacity = 100;
    options.angle = 0.0;
    options.color = "not-a-color".to_string();

    let result = service()
        .watermark_image(&white_png(200, 100), "a.png", &options)
        .unwrap();
    let image = decode(&result.data);
    let gray = TextColor::gray();

    assert_eq!(*image.get_pixel(100, 50), Rgba([gray.r, gray.g, gray.b, 255]));
}

#[rstest]
#[case("notes.txt")]
#[case("archive.tar.gz")]
#[case("no_extension")]
#[case("scan.pdf")]
fn test_rejects_non_image_names(#[case] file_name: &str) {
    let err = service()
        .watermark_image(&white_png(10, 10), file_name, &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFormat(_)));
}

#[rstest]
#[case("photo.JPG")]
#[case("photo.Png")]
#[case("photo.bmp")]
#[case("photo.gif")]
#[case("photo.webp")]
fn test_accepts_image_extensions_case_insensitively(#[case] file_name: &str) {
    // The bytes are PNG regardless of the name; decoding sniffs the content.
    let result = service().watermark_image(&white_png(40, 40), file_name, &WatermarkOptions::with_text("X"));
    assert!(result.is_ok(), "{} rejected: {:?}", file_name, result.err());
}

#[test]
fn test_corrupt_image_is_unsupported() {
    let err = service()
        .watermark_image(b"definitely not pixels", "broken.png", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFormat(_)));
}

#[test]
fn test_missing_font_is_reported_after_format_checks() {
    let service = WatermarkService::new(None, None);
    assert!(!service.has_raster_font());

    let err = service
        .watermark_image(&white_png(10, 10), "a.png", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::FontUnavailable(_)));

    let err = service
        .watermark_image(&white_png(10, 10), "a.txt", &WatermarkOptions::with_text("X"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_async_image_watermark() {
    let result = service()
        .watermark_image_async(
            white_png(64, 64),
            "async.png".to_string(),
            WatermarkOptions::with_text("ASYNC"),
        )
        .await
        .unwrap();
    assert_eq!(result.file_name, "async_watermarked.png");
    assert_eq!(decode(&result.data).dimensions(), (64, 64));
}
