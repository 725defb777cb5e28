//! API request and response models

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use iconforge_images::MaterialRecord;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Prefix of every inline PNG returned by the API.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encode PNG bytes as a `data:` URI.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(bytes))
}

/// Uploaded material
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaterialResponse {
    /// Unique identifier for the uploaded material
    pub material_id: String,
    /// Material width in pixels
    pub width: u32,
    /// Material height in pixels
    pub height: u32,
    /// Crop box used during smart crop `[left, top, right, bottom]`
    #[schema(value_type = Vec<u32>)]
    pub crop_box: [u32; 4],
    /// Padding in pixels applied around the bounding box
    pub padding: u32,
    /// Base64 encoded 256px PNG ready for previews
    pub image_base64: String,
    /// Filename the upload was submitted with
    pub filename: String,
    /// Detected upload format (`PNG`, `JPEG` or `WEBP`)
    pub source_format: String,
    /// Upload time, RFC 3339 UTC
    pub uploaded_at: String,
    /// Seconds left before the material expires unless read again
    pub expires_in: u64,
}

impl MaterialResponse {
    /// Build the response from a record, its processed PNG and its remaining lifetime.
    pub fn from_record(record: &MaterialRecord, png: &[u8], expires_in: Duration) -> Self {
        Self {
            material_id: record.material_id.clone(),
            width: record.width,
            height: record.height,
            crop_box: record.crop_box.to_array(),
            padding: record.padding,
            image_base64: png_data_uri(png),
            filename: record.filename.clone(),
            source_format: record.source_format.as_str().to_string(),
            uploaded_at: record.uploaded_at.to_rfc3339(),
            expires_in: expires_in.as_secs(),
        }
    }
}

/// Resized preview of a material
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub material_id: String,
    /// Resample algorithm name (`LANCZOS`, `NEAREST` or `BILINEAR`)
    pub algorithm: String,
    pub size: u32,
    pub image_base64: String,
}

/// Preview query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Resample algorithm
    pub algo: Option<String>,
    /// Preview size, 32 or 48 (defaults to 48)
    pub size: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
    /// Uptime in seconds
    pub uptime: u64,
}

/// Ping response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
}

/// Problem details error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProblemDetails {
    /// Problem type
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short summary of the status
    pub title: String,
    /// HTTP status code
    pub status: u16,
    /// What went wrong
    pub detail: String,
    /// Id of the failed request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_data_uri() {
        assert_eq!(png_data_uri(b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_problem_details_type_field() {
        let body = ProblemDetails {
            problem_type: "not_found".into(),
            title: "Not Found".into(),
            status: 404,
            detail: "Material not found: x".into(),
            request_id: Some("r1".into()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "not_found");
        assert_eq!(json["request_id"], "r1");
    }
}
