//! Data models for materials.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::crop::CropBox;
use crate::formats::ImageFormat;

/// A processed material and the assets backing it.
#[derive(Debug, Clone)]
pub struct MaterialRecord {
    /// Opaque 32-character hex identifier
    pub material_id: String,
    /// Filename the upload was submitted with (directory components stripped)
    pub filename: String,
    /// Container format of the upload
    pub source_format: ImageFormat,
    /// Pre-crop original (after background removal), PNG
    pub original_path: PathBuf,
    /// Canonical 256x256 RGBA asset, PNG
    pub processed_path: PathBuf,
    /// Processed width in pixels
    pub width: u32,
    /// Processed height in pixels
    pub height: u32,
    /// Rectangle cut from the original during smart crop
    pub crop_box: CropBox,
    /// Padding applied around the visible content
    pub padding: u32,
    /// Monotonic creation time
    pub created_at: Instant,
    /// Monotonic time of the last successful read
    pub last_access: Instant,
    /// Wall-clock creation time, for display only
    pub uploaded_at: DateTime<Utc>,
}

impl MaterialRecord {
    /// Whether the record has gone unread for longer than `ttl` at `now`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_access) > ttl
    }

    /// Time left before expiry at `now`.
    pub fn remaining_ttl(&self, now: Instant, ttl: Duration) -> Duration {
        ttl.saturating_sub(now.saturating_duration_since(self.last_access))
    }

    /// Get the processed dimensions as a tuple.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Whether `id` looks like an identifier this crate issued.
///
/// Only well-formed ids are ever turned into filesystem paths.
pub fn is_material_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
