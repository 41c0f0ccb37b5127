//! # Export Boundary
//!
//! The editor never rasterizes. It assembles a `RenderTarget` (settled
//! standalone markup plus the floating images as they are at export
//! time) and hands it to a host-supplied `Exporter`.

use crate::overlay::{FloatingLayer, Point, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error("Unsupported export scale: {0}")]
    UnsupportedScale(u8),
}

/// Device pixel multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExportScale {
    #[default]
    X1,
    X2,
    X3,
}

impl ExportScale {
    pub fn factor(&self) -> u8 {
        match self {
            ExportScale::X1 => 1,
            ExportScale::X2 => 2,
            ExportScale::X3 => 3,
        }
    }
}

impl TryFrom<u8> for ExportScale {
    type Error = ExportError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ExportScale::X1),
            2 => Ok(ExportScale::X2),
            3 => Ok(ExportScale::X3),
            other => Err(ExportError::UnsupportedScale(other)),
        }
    }
}

impl From<ExportScale> for u8 {
    fn from(scale: ExportScale) -> u8 {
        scale.factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Background {
    /// Whatever the document paints
    #[default]
    Auto,
    White,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub scale: ExportScale,
    pub background: Background,
    pub quality: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: ExportScale::X2,
            background: Background::Auto,
            quality: 0.92,
        }
    }
}

impl ExportOptions {
    pub fn new(scale: ExportScale, background: Background, quality: f64) -> Self {
        Self {
            scale,
            background,
            quality,
        }
        .normalized()
    }

    /// Quality clamped to `[0, 1]`; NaN falls back to the default
    pub fn normalized(mut self) -> Self {
        self.quality = if self.quality.is_nan() {
            Self::default().quality
        } else {
            self.quality.clamp(0.0, 1.0)
        };
        self
    }
}

/// A floating image as the rasterizer should paint it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedImage {
    pub source: String,
    pub position: Point,
    pub size: Size,
    pub rotation_degrees: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTarget {
    /// Standalone document with resolved colors
    pub markup: String,
    /// Painted over the document in insertion order
    pub images: Vec<PlacedImage>,
}

impl RenderTarget {
    pub fn new(markup: String, floating: &FloatingLayer) -> Self {
        let images = floating
            .iter()
            .map(|image| PlacedImage {
                source: image.source.clone(),
                position: image.position,
                size: image.size,
                rotation_degrees: image.rotation_degrees,
            })
            .collect();
        Self { markup, images }
    }
}

/// Host rasterizer
pub trait Exporter {
    fn rasterize(&mut self, target: &RenderTarget, options: &ExportOptions) -> Result<Vec<u8>, ExportError>;

    fn rasterize_vector(&mut self, target: &RenderTarget, options: &ExportOptions) -> Result<Vec<u8>, ExportError>;

    /// False on any failure; never errors to the caller
    fn copy_to_clipboard(&mut self, target: &RenderTarget, options: &ExportOptions) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_clamped() {
        assert_eq!(ExportOptions::new(ExportScale::X1, Background::White, 1.7).quality, 1.0);
        assert_eq!(ExportOptions::new(ExportScale::X1, Background::White, -0.2).quality, 0.0);
        assert_eq!(ExportOptions::new(ExportScale::X1, Background::White, f64::NAN).quality, 0.92);
    }

    #[test]
    fn test_options_serde() {
        let options: ExportOptions =
            serde_json::from_str(r#"{"scale": 3, "background": "transparent", "quality": 0.5}"#).unwrap();
        assert_eq!(options.scale, ExportScale::X3);
        assert_eq!(options.background, Background::Transparent);

        assert!(serde_json::from_str::<ExportOptions>(r#"{"scale": 4}"#).is_err());
        assert_eq!(serde_json::to_string(&ExportScale::X2).unwrap(), "2");
    }

    #[test]
    fn test_render_target_carries_images() {
        let mut floating = FloatingLayer::new();
        let id = floating.add("logo.png", Size::new(100.0, 50.0), Point::new(5.0, 6.0));
        floating.rotate(id);

        let target = RenderTarget::new("<html></html>".into(), &floating);
        assert_eq!(
            target.images,
            vec![PlacedImage {
                source: "logo.png".into(),
                position: Point::new(5.0, 6.0),
                size: Size::new(100.0, 50.0),
                rotation_degrees: 90,
            }]
        );
    }
}
