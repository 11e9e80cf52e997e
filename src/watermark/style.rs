//! Watermark styling parameters.
//!
//! `WatermarkOptions` carries what a caller may set per request: the text,
//! font size, color, opacity, rotation and spacing. Out-of-range values are
//! normalised here rather than rejected, matching what the web form sends:
//! - font size <= 0 uses the default size
//! - an unparsable color falls back to neutral gray
//! - opacity is clamped when converted to an alpha value
//! - spacing <= 0 is handled by the lattice fallback margin

use super::lattice::TileSpec;
use super::WatermarkError;
use crate::constants::{
    DEFAULT_ANGLE, DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_SPACING,
    FALLBACK_GRAY, MAX_FONT_SIZE,
};
use serde::{Deserialize, Serialize};

fn default_font_size() -> i32 {
    DEFAULT_FONT_SIZE
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_opacity() -> i32 {
    DEFAULT_OPACITY
}

fn default_angle() -> f32 {
    DEFAULT_ANGLE
}

fn default_spacing() -> i32 {
    DEFAULT_SPACING
}

/// Per-request watermark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkOptions {
    /// Text stamped on every tile
    #[serde(rename = "watermarkText")]
    pub text: String,

    /// Font size (default: 30)
    #[serde(default = "default_font_size")]
    pub font_size: i32,

    /// Fill color as hex string (default: "#888888")
    #[serde(default = "default_color")]
    pub color: String,

    /// Opacity percentage 0-100 (default: 30)
    #[serde(default = "default_opacity")]
    pub opacity: i32,

    /// Rotation in degrees (default: -30)
    #[serde(default = "default_angle")]
    pub angle: f32,

    /// Extra gap between tiles (default: 100)
    #[serde(default = "default_spacing")]
    pub spacing: i32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: default_font_size(),
            color: default_color(),
            opacity: default_opacity(),
            angle: default_angle(),
            spacing: default_spacing(),
        }
    }
}

impl WatermarkOptions {
    /// Options with the given text and every other field at its default.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Reject requests that cannot produce a watermark.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.text.trim().is_empty() {
            return Err(WatermarkError::invalid_parameter(
                "watermarkText",
                "watermark text must not be empty",
            ));
        }

        if self.font_size > MAX_FONT_SIZE {
            return Err(WatermarkError::invalid_parameter(
                "fontSize",
                format!("{} is larger than the maximum of {}", self.font_size, MAX_FONT_SIZE),
            ));
        }

        if !self.angle.is_finite() {
            return Err(WatermarkError::invalid_parameter(
                "angle",
                format!("{} is not a finite angle", self.angle),
            ));
        }

        Ok(())
    }

    /// Font size actually used for measuring and drawing.
    pub fn effective_font_size(&self) -> f32 {
        if self.font_size > 0 {
            self.font_size as f32
        } else {
            DEFAULT_FONT_SIZE as f32
        }
    }

    /// Lattice parameters for this request.
    pub fn tile_spec(&self) -> TileSpec {
        TileSpec {
            spacing_margin: self.spacing as f32,
            angle_degrees: self.angle,
        }
    }

    pub fn text_color(&self) -> TextColor {
        TextColor::parse_or_default(&self.color)
    }

    /// Raster fill alpha, 0-255.
    pub fn fill_alpha(&self) -> u8 {
        fill_alpha(self.opacity)
    }

    /// PDF fill opacity, 0.0-1.0.
    pub fn fill_opacity(&self) -> f32 {
        fill_opacity(self.opacity)
    }
}

/// RGB fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TextColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn gray() -> Self {
        let (r, g, b) = FALLBACK_GRAY;
        Self::new(r, g, b)
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn parse(hex: &str) -> Result<Self, WatermarkError> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);

        let invalid = || {
            WatermarkError::invalid_parameter(
                "color",
                format!("'{}' is not a #RGB or #RRGGBB color", hex),
            )
        };

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let component = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match digits.len() {
            3 => {
                // #RGB: each digit doubled, 0xF -> 0xFF
                let r = component(&digits[0..1])?;
                let g = component(&digits[1..2])?;
                let b = component(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            6 => Ok(Self::new(
                component(&digits[0..2])?,
                component(&digits[2..4])?,
                component(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Parse, falling back to neutral gray on malformed input.
    pub fn parse_or_default(hex: &str) -> Self {
        Self::parse(hex).unwrap_or_else(|err| {
            tracing::debug!(color = hex, error = %err, "Using fallback watermark color");
            Self::gray()
        })
    }

    /// Components scaled to 0.0-1.0 for PDF color operators.
    pub fn to_unit_rgb(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Convert an opacity percentage to an 8-bit alpha.
pub fn fill_alpha(opacity: i32) -> u8 {
    (opacity.saturating_mul(255) / 100).clamp(0, 255) as u8
}

/// Convert an opacity percentage to a 0.0-1.0 fill opacity.
pub fn fill_opacity(opacity: i32) -> f32 {
    (opacity as f32 / 100.0).clamp(0.0, 1.0)
}
