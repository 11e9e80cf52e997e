//! Watermark error types.
//!
//! Lattice-level errors (`InvalidCanvas`, `InvalidParameter`) are raised
//! before any drawing happens. Codec and drawing failures surface as
//! `UnsupportedFormat` or `RenderFailure` and are reported to the caller
//! unchanged; no partial document is ever returned.

use super::lattice::LatticeError;
use thiserror::Error;

/// Errors that can occur while watermarking a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WatermarkError {
    /// Canvas with non-positive or non-finite dimensions
    #[error("Invalid canvas {width}x{height}: {reason}")]
    InvalidCanvas {
        width: f32,
        height: f32,
        reason: String,
    },

    /// A request parameter is missing, empty or not a finite number
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The input is not a document type the codecs understand
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// No usable font could be loaded
    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    /// Drawing or encoding failed in the underlying library
    #[error("Failed to render watermark: {0}")]
    RenderFailure(String),

    /// Processing did not finish within the request deadline
    #[error("Watermarking timed out after {0}s")]
    Timeout(u64),
}

impl WatermarkError {
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn render_failure(message: impl ToString) -> Self {
        Self::RenderFailure(message.to_string())
    }

    /// True for errors caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCanvas { .. } | Self::InvalidParameter { .. } | Self::UnsupportedFormat(_)
        )
    }
}

impl From<LatticeError> for WatermarkError {
    fn from(err: LatticeError) -> Self {
        match err {
            LatticeError::InvalidCanvas {
                width,
                height,
                reason,
            } => Self::InvalidCanvas {
                width,
                height,
                reason: reason.to_string(),
            },
            LatticeError::InvalidParameter { name, reason } => Self::InvalidParameter {
                name: name.to_string(),
                message: reason,
            },
        }
    }
}
