//! Request handlers for the watermark API.
//!
//! Every JSON body is wrapped in `{ success, message, data }`. Failures carry
//! `data: null` and an HTTP status derived from the error kind.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::str::FromStr;

use super::AppState;
use crate::watermark::{WatermarkError, WatermarkOptions};

/// JSON envelope shared by all endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWatermarkData {
    pub image_base64: String,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfWatermarkData {
    pub pdf_base64: String,
    pub mime_type: String,
    pub file_name: String,
    pub page_count: usize,
}

/// Handler error rendered as a failure envelope.
#[derive(Debug)]
pub enum ApiError {
    Watermark(WatermarkError),
    Multipart(MultipartError),
}

impl From<WatermarkError> for ApiError {
    fn from(err: WatermarkError) -> Self {
        Self::Watermark(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Watermark(err) => (status_for(&err), format!("Failed to add watermark: {}", err)),
            Self::Multipart(err) => (err.status(), format!("Invalid upload: {}", err.body_text())),
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

/// HTTP status for a watermarking failure.
pub fn status_for(err: &WatermarkError) -> StatusCode {
    match err {
        WatermarkError::InvalidCanvas { .. } | WatermarkError::InvalidParameter { .. } => {
            StatusCode::BAD_REQUEST
        }
        WatermarkError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        WatermarkError::FontUnavailable(_) | WatermarkError::RenderFailure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        WatermarkError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// A decoded multipart upload.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
    pub options: WatermarkOptions,
}

/// Collect the file and form fields. Absent fields keep their defaults;
/// unknown fields are ignored.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut options = WatermarkOptions::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((file_name, data.to_vec()));
            }
            "watermarkText" => options.text = field.text().await?,
            "fontSize" => options.font_size = number_field(field, &name, options.font_size).await?,
            "color" => {
                let color = field.text().await?;
                if !color.trim().is_empty() {
                    options.color = color;
                }
            }
            "opacity" => options.opacity = number_field(field, &name, options.opacity).await?,
            "angle" => options.angle = number_field(field, &name, options.angle).await?,
            "spacing" => options.spacing = number_field(field, &name, options.spacing).await?,
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    let (file_name, data) = file.ok_or_else(|| WatermarkError::invalid_parameter("file", "no file was uploaded"))?;

    Ok(Upload {
        file_name,
        data,
        options,
    })
}

async fn number_field<T: FromStr>(field: Field<'_>, name: &str, default: T) -> Result<T, ApiError> {
    let text = field.text().await?;
    Ok(parse_number(name, &text, default)?)
}

/// Parse a numeric form value; blank keeps `default`.
pub fn parse_number<T: FromStr>(name: &str, value: &str, default: T) -> Result<T, WatermarkError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(default);
    }

    value
        .parse()
        .map_err(|_| WatermarkError::invalid_parameter(name, format!("'{}' is not a number", value)))
}

fn log_failure(kind: &str, file_name: &str, err: &WatermarkError) {
    tracing::error!(file = %file_name, kind, error = %err, "Watermarking failed");
}

/// `POST /api/watermark/add`
pub async fn add_watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ImageWatermarkData>>, ApiError> {
    let upload = read_upload(multipart).await?;
    let file_name = upload.file_name.clone();

    let result = state
        .service
        .watermark_image_async(upload.data, upload.file_name, upload.options)
        .await
        .inspect_err(|err| log_failure("image", &file_name, err))?;

    Ok(Json(ApiResponse::success(
        "Watermark added successfully",
        ImageWatermarkData {
            image_base64: STANDARD.encode(&result.data),
            mime_type: result.mime_type.to_string(),
            file_name: result.file_name,
        },
    )))
}

/// `POST /api/watermark/add-pdf`
pub async fn add_pdf_watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<PdfWatermarkData>>, ApiError> {
    let upload = read_upload(multipart).await?;
    let file_name = upload.file_name.clone();

    let result = state
        .service
        .watermark_pdf_async(upload.data, upload.file_name, upload.options)
        .await
        .inspect_err(|err| log_failure("pdf", &file_name, err))?;

    let page_count = result.page_count.unwrap_or_default();

    Ok(Json(ApiResponse::success(
        format!("PDF watermark added successfully, {} pages processed", page_count),
        PdfWatermarkData {
            pdf_base64: STANDARD.encode(&result.data),
            mime_type: result.mime_type.to_string(),
            file_name: result.file_name,
            page_count,
        },
    )))
}

/// `GET /api/watermark/health`
pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Service is running", "OK"))
}
