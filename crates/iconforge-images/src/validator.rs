//! Upload validation: size, extension, decodability and format agreement.

use std::path::Path;

use tracing::debug;

use crate::config::UploadConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::formats::{extension_of, ImageFormat};

/// An upload that passed every validation check.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    /// Raw uploaded bytes
    pub bytes: Vec<u8>,
    /// Filename with any directory components stripped
    pub filename: String,
    /// Container format detected from the bytes
    pub format: ImageFormat,
    /// Dimensions read from the header
    pub dimensions: (u32, u32),
}

/// Rejects oversized, invalid or mismatched uploads before any processing.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    config: UploadConfig,
}

impl UploadValidator {
    /// Create a validator with the given limits.
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Validate an upload.
    ///
    /// Checks run in a fixed order and the first failing one is reported:
    /// size, extension, decodability, then extension/container agreement.
    pub fn validate(&self, bytes: Vec<u8>, filename: &str) -> ForgeResult<ValidatedUpload> {
        if bytes.len() > self.config.max_upload_size_bytes {
            return Err(ForgeError::FileTooLarge {
                size_bytes: bytes.len(),
                max_bytes: self.config.max_upload_size_bytes,
            });
        }

        let extension = extension_of(filename).unwrap_or_default();
        let declared = match ImageFormat::from_extension(&extension) {
            Some(format) if self.config.is_extension_allowed(&extension) => format,
            _ => {
                return Err(ForgeError::UnsupportedExtension {
                    extension: format!(".{}", extension),
                    allowed: self.config.allowed_extensions_string(),
                })
            }
        };

        let (container, dimensions) = ImageFormat::sniff(&bytes)?;

        let detected = ImageFormat::from_container(container);
        if detected != Some(declared) {
            return Err(ForgeError::FormatMismatch {
                extension: format!(".{}", extension),
                detected: detected
                    .map(|f| f.as_str().to_string())
                    .unwrap_or_else(|| format!("{:?}", container).to_uppercase()),
            });
        }

        debug!(
            "Validated upload {} ({} bytes, {}x{}, {})",
            filename,
            bytes.len(),
            dimensions.0,
            dimensions.1,
            declared.as_str()
        );

        Ok(ValidatedUpload {
            bytes,
            filename: sanitize_filename(filename),
            format: declared,
            dimensions,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }
}

/// Strip directory components so a filename can never escape its namespace.
fn sanitize_filename(filename: &str) -> String {
    Path::new(&filename.replace('\\', "/"))
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .unwrap_or("upload.png")
        .to_string()
}
