//! Error types for material and icon operations.

use thiserror::Error;

/// Result type for material and icon operations.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Coarse classification used by adapters to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied something that violates a constraint. Never retried.
    Validation,
    /// Unknown or expired material.
    NotFound,
    /// Unexpected failure inside the pipeline.
    Internal,
}

/// Errors that can occur while processing materials and packing icons.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Upload is larger than the configured limit.
    #[error("Uploaded file exceeds maximum size limit: {size_bytes} bytes > {max_bytes} bytes")]
    FileTooLarge { size_bytes: usize, max_bytes: usize },

    /// Filename extension is not in the allow-list.
    #[error("Unsupported file extension '{extension}'. Allowed extensions: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },

    /// Bytes do not decode as an image container.
    #[error("Uploaded file is not a valid image: {0}")]
    InvalidImage(String),

    /// Extension and detected container disagree.
    #[error("File extension '{extension}' does not match detected image format {detected}")]
    FormatMismatch { extension: String, detected: String },

    /// One or more required icon frames were not supplied.
    #[error("Icon sizes must include {} pixels", join_sizes(.0))]
    MissingIconSizes(Vec<u32>),

    /// Icon frame bytes could not be decoded.
    #[error("Invalid image data for {size}px icon: {reason}")]
    InvalidIconData { size: u32, reason: String },

    /// Icon frame decoded to the wrong dimensions.
    #[error(
        "Icon for {expected}px must be a square of exactly {expected}x{expected} pixels, got {width}x{height}"
    )]
    IconDimensions {
        expected: u32,
        width: u32,
        height: u32,
    },

    /// Preview size must be a positive integer.
    #[error("Preview size must be a positive number of pixels, got {0}")]
    InvalidPreviewSize(u32),

    /// Unknown resampling algorithm name.
    #[error("Unknown resample algorithm '{0}'. Expected one of LANCZOS, NEAREST, BILINEAR")]
    UnknownAlgorithm(String),

    /// Material id is unknown or expired.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// Background removal engine could not be constructed.
    #[error("Background removal engine failed to initialize: {0}")]
    EngineInit(String),

    /// Background removal engine failed on an image.
    #[error("Background removal failed: {0}")]
    BackgroundRemoval(String),

    /// Decoding, encoding or raster manipulation failed mid-pipeline.
    #[error("Image processing failed: {0}")]
    Processing(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ForgeError {
    /// Classify the error into the three kinds adapters care about.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForgeError::FileTooLarge { .. }
            | ForgeError::UnsupportedExtension { .. }
            | ForgeError::InvalidImage(_)
            | ForgeError::FormatMismatch { .. }
            | ForgeError::MissingIconSizes(_)
            | ForgeError::InvalidIconData { .. }
            | ForgeError::IconDimensions { .. }
            | ForgeError::InvalidPreviewSize(_)
            | ForgeError::UnknownAlgorithm(_) => ErrorKind::Validation,
            ForgeError::MaterialNotFound(_) => ErrorKind::NotFound,
            ForgeError::EngineInit(_)
            | ForgeError::BackgroundRemoval(_)
            | ForgeError::Processing(_)
            | ForgeError::IoError(_)
            | ForgeError::ConfigError(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Validation`.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

fn join_sizes(sizes: &[u32]) -> String {
    sizes
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_yaml::Error> for ForgeError {
    fn from(err: serde_yaml::Error) -> Self {
        ForgeError::ConfigError(err.to_string())
    }
}

impl From<image::ImageError> for ForgeError {
    fn from(err: image::ImageError) -> Self {
        ForgeError::Processing(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ForgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        ForgeError::Processing(format!("worker task failed: {}", err))
    }
}
