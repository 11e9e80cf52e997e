//! Request-level watermarking.
//!
//! `WatermarkService` is what the HTTP layer talks to. It checks the upload
//! (payload, extension, options), picks the renderer for the modality and
//! names the output file. The `*_async` variants move the CPU-bound work
//! onto tokio's blocking pool and bound it with a deadline.

use super::font::{FontProvider, FontSource};
use super::pdf::DocumentPageRenderer;
use super::raster::RasterRenderer;
use super::style::WatermarkOptions;
use super::text::{OutlineRasterizer, TextRasterizer};
use super::WatermarkError;
use crate::constants::{
    ALLOWED_IMAGE_EXTENSIONS, DEFAULT_REQUEST_TIMEOUT_SECS, OUTPUT_SUFFIX, PDF_EXTENSION,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const PNG_MIME_TYPE: &str = "image/png";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A finished watermarked file.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkedDocument {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: String,
    /// Pages processed, PDF only
    pub page_count: Option<usize>,
}

/// Validates uploads and dispatches them to the raster or PDF renderer.
#[derive(Clone)]
pub struct WatermarkService {
    raster: Option<RasterRenderer>,
    pdf: DocumentPageRenderer,
    timeout: Duration,
}

impl std::fmt::Debug for WatermarkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkService")
            .field("raster", &self.raster.is_some())
            .field("pdf_font_embedded", &self.pdf.font().is_embedded())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WatermarkService {
    /// Images need `raster`; PDFs fall back to Helvetica when `pdf_font`
    /// is absent or cannot be embedded.
    pub fn new(raster: Option<Arc<dyn TextRasterizer>>, pdf_font: Option<FontSource>) -> Self {
        Self {
            raster: raster.map(RasterRenderer::new),
            pdf: DocumentPageRenderer::new(pdf_font),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load the watermark font from `provider`.
    ///
    /// Images use the first font found. PDFs need a single TrueType face to
    /// embed, so when the first font is a collection or CFF-based the
    /// provider is asked again for the first embeddable one.
    ///
    /// A missing font is not fatal: the service still starts and image
    /// requests fail with `FontUnavailable`.
    pub fn from_font_provider(provider: &dyn FontProvider) -> Self {
        let source = match provider.load() {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(
                    provider = %provider.describe(),
                    error = %err,
                    "No watermark font available, image watermarking disabled"
                );
                return Self::new(None, None);
            }
        };

        let raster: Option<Arc<dyn TextRasterizer>> = match OutlineRasterizer::from_source(&source) {
            Ok(rasterizer) => Some(Arc::new(rasterizer)),
            Err(err) => {
                tracing::warn!(font = %source.name, error = %err, "Font cannot be rasterized");
                None
            }
        };

        let pdf_font = pdf_font_source(provider, source.clone());
        Self::new(raster, Some(pdf_font))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_raster_font(&self) -> bool {
        self.raster.is_some()
    }

    /// Watermark an uploaded image; the result is always PNG.
    pub fn watermark_image(
        &self,
        data: &[u8],
        file_name: &str,
        options: &WatermarkOptions,
    ) -> Result<WatermarkedDocument, WatermarkError> {
        check_upload(data, options)?;

        let extension = file_extension(file_name);
        if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(WatermarkError::UnsupportedFormat(format!(
                "'{}' is not a supported image; use JPG, PNG, GIF, BMP or WebP",
                file_name
            )));
        }

        let renderer = self.raster.as_ref().ok_or_else(|| {
            WatermarkError::FontUnavailable("no font is loaded for image watermarking".to_string())
        })?;

        let started = Instant::now();
        let data = renderer.render_png(data, options)?;

        tracing::info!(
            file = %file_name,
            bytes = data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image watermarked"
        );

        Ok(WatermarkedDocument {
            data,
            mime_type: PNG_MIME_TYPE,
            file_name: output_file_name(file_name, "png"),
            page_count: None,
        })
    }

    /// Watermark every page of an uploaded PDF.
    pub fn watermark_pdf(
        &self,
        data: &[u8],
        file_name: &str,
        options: &WatermarkOptions,
    ) -> Result<WatermarkedDocument, WatermarkError> {
        check_upload(data, options)?;

        if file_extension(file_name) != PDF_EXTENSION {
            return Err(WatermarkError::UnsupportedFormat(format!(
                "'{}' is not a PDF document",
                file_name
            )));
        }

        let started = Instant::now();
        let output = self.pdf.render(data, options)?;

        tracing::info!(
            file = %file_name,
            pages = output.page_count,
            bytes = output.data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF watermarked"
        );

        Ok(WatermarkedDocument {
            data: output.data,
            mime_type: PDF_MIME_TYPE,
            file_name: output_file_name(file_name, PDF_EXTENSION),
            page_count: Some(output.page_count),
        })
    }

    pub async fn watermark_image_async(
        &self,
        data: Vec<u8>,
        file_name: String,
        options: WatermarkOptions,
    ) -> Result<WatermarkedDocument, WatermarkError> {
        let service = self.clone();
        self.run_blocking(move || service.watermark_image(&data, &file_name, &options))
            .await
    }

    pub async fn watermark_pdf_async(
        &self,
        data: Vec<u8>,
        file_name: String,
        options: WatermarkOptions,
    ) -> Result<WatermarkedDocument, WatermarkError> {
        let service = self.clone();
        self.run_blocking(move || service.watermark_pdf(&data, &file_name, &options))
            .await
    }

    async fn run_blocking<F>(&self, work: F) -> Result<WatermarkedDocument, WatermarkError>
    where
        F: FnOnce() -> Result<WatermarkedDocument, WatermarkError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(WatermarkError::render_failure(format!(
                "watermark worker failed: {}",
                join_error
            ))),
            Err(_) => Err(WatermarkError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// `primary` when it can be embedded, else the first embeddable font the
/// provider offers. Falls back to `primary`, which the PDF renderer then
/// replaces with Helvetica.
fn pdf_font_source(provider: &dyn FontProvider, primary: FontSource) -> FontSource {
    if primary.is_embeddable() {
        return primary;
    }

    match provider.load_where(&FontSource::is_embeddable) {
        Ok(source) => {
            tracing::info!(
                image_font = %primary.name,
                pdf_font = %source.name,
                "Using a separate embeddable font for PDF watermarks"
            );
            source
        }
        Err(err) => {
            tracing::debug!(error = %err, "No embeddable PDF font found");
            primary
        }
    }
}

fn check_upload(data: &[u8], options: &WatermarkOptions) -> Result<(), WatermarkError> {
    if data.is_empty() {
        return Err(WatermarkError::invalid_parameter("file", "uploaded file is empty"));
    }
    options.validate()
}

/// Lower-cased extension without the dot, empty when there is none.
fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// `<stem>_watermarked.<extension>`.
pub fn output_file_name(original: &str, extension: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("watermark");

    format!("{}{}.{}", stem, OUTPUT_SUFFIX, extension)
}
