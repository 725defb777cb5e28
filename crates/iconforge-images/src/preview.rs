//! Preview cache: resized, PNG-encoded renditions of materials.
//!
//! Entries are keyed by (material id, algorithm, size) and never expire on
//! their own. The table itself lives inside the [`MaterialStore`] lock so that
//! deleting a material purges its previews in the same critical section.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ForgeError, ForgeResult};
use crate::raster::{decode_rgba, encode_png};
use crate::resize::ResampleAlgorithm;
use crate::store::MaterialStore;

/// Cache key for one preview.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub material_id: String,
    pub algorithm: ResampleAlgorithm,
    pub size: u32,
}

impl PreviewKey {
    pub fn new(material_id: impl Into<String>, algorithm: ResampleAlgorithm, size: u32) -> Self {
        Self {
            material_id: material_id.into(),
            algorithm,
            size,
        }
    }
}

/// Encoded previews for all live materials.
#[derive(Debug, Default)]
pub(crate) struct PreviewTable {
    entries: HashMap<PreviewKey, Vec<u8>>,
}

impl PreviewTable {
    pub(crate) fn get(&self, key: &PreviewKey) -> Option<&Vec<u8>> {
        self.entries.get(key)
    }

    /// Insert unless present; returns whatever is stored afterwards.
    pub(crate) fn insert_if_absent(&mut self, key: PreviewKey, bytes: Vec<u8>) -> Vec<u8> {
        self.entries.entry(key).or_insert(bytes).clone()
    }

    /// Drop every entry belonging to `material_id`.
    pub(crate) fn purge_material(&mut self, material_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.material_id != material_id);
        before - self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Compute-or-hit access to material previews.
#[derive(Clone)]
pub struct PreviewCache {
    store: Arc<MaterialStore>,
}

impl PreviewCache {
    pub fn new(store: Arc<MaterialStore>) -> Self {
        Self { store }
    }

    /// Return the preview for `(material_id, algorithm, size)`, computing it on a miss.
    ///
    /// Hits return the stored bytes verbatim. Misses read the processed asset
    /// through the store (refreshing the material), resize and encode on the
    /// blocking pool, and store the result. Any positive size is accepted.
    pub async fn get_or_compute(
        &self,
        material_id: &str,
        algorithm: ResampleAlgorithm,
        size: u32,
    ) -> ForgeResult<Vec<u8>> {
        if size == 0 {
            return Err(ForgeError::InvalidPreviewSize(size));
        }

        let key = PreviewKey::new(material_id, algorithm, size);
        if let Some(bytes) = self.store.lookup_preview(&key).await? {
            debug!("Preview cache hit for {} {} {}px", material_id, algorithm, size);
            return Ok(bytes);
        }

        debug!("Preview cache miss for {} {} {}px", material_id, algorithm, size);
        let processed = self.store.material_bytes(material_id).await?;
        let resizer = self.store.resizer().clone();
        let bytes = tokio::task::spawn_blocking(move || -> ForgeResult<Vec<u8>> {
            let image = decode_rgba(&processed)
                .map_err(|e| ForgeError::Processing(format!("corrupt processed asset: {}", e)))?;
            let preview = resizer.resize(&image, size, algorithm);
            encode_png(&preview)
        })
        .await??;

        Ok(self.store.insert_preview(key, bytes).await)
    }

    /// Number of cached previews.
    pub async fn len(&self) -> usize {
        self.store.preview_count().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The store backing this cache.
    pub fn store(&self) -> &Arc<MaterialStore> {
        &self.store
    }
}
