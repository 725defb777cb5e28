//! Image format detection and the extension-to-format mapping.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};

/// Upload formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format
    Png,
    /// JPEG format
    Jpeg,
    /// WebP format
    WebP,
}

impl ImageFormat {
    /// Format implied by a filename extension (case-insensitive, dot optional).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Map a container format reported by the `image` crate.
    pub fn from_container(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::WebP => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Sniff the container format and decode its header.
    ///
    /// Returns the detected container together with the image dimensions. The
    /// container may be one this crate does not accept (e.g. GIF); callers decide.
    pub fn sniff(bytes: &[u8]) -> ForgeResult<(image::ImageFormat, (u32, u32))> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ForgeError::InvalidImage(e.to_string()))?;

        let format = reader.format().ok_or_else(|| {
            ForgeError::InvalidImage("unable to detect image format from file header".to_string())
        })?;

        let dimensions = reader
            .into_dimensions()
            .map_err(|e| ForgeError::InvalidImage(e.to_string()))?;

        Ok((format, dimensions))
    }

    /// Get the format as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::WebP => "WEBP",
        }
    }
}

/// Lower-cased extension of a filename, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
