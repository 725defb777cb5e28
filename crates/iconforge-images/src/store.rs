//! Material store with sliding-TTL eviction.
//!
//! The store owns every material record and its on-disk namespace
//! (`<temp_dir>/<id>/`). The preview table lives behind the same lock so that a
//! material and its previews always disappear together.
//!
//! Expiry is checked lazily: every operation first sweeps the whole table and
//! deletes records whose last access is older than the TTL. Filesystem cleanup
//! for swept records happens after the lock is released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::background::BackgroundRemover;
use crate::clock::{Clock, SystemClock};
use crate::config::ForgeConfig;
use crate::crop::{smart_crop, CropBox};
use crate::error::{ForgeError, ForgeResult};
use crate::models::{is_material_id, MaterialRecord};
use crate::preview::{PreviewKey, PreviewTable};
use crate::raster::{decode_rgba, encode_png};
use crate::resize::{ResampleAlgorithm, Resizer, MATERIAL_SIZE};
use crate::validator::ValidatedUpload;

const ORIGINAL_FILE: &str = "original.png";
const PROCESSED_FILE: &str = "processed_256.png";

#[derive(Debug, Default)]
struct StoreState {
    materials: HashMap<String, MaterialRecord>,
    previews: PreviewTable,
}

impl StoreState {
    /// Drop expired records and their previews. Returns the evicted ids.
    fn sweep(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .materials
            .values()
            .filter(|r| r.is_expired(now, ttl))
            .map(|r| {
                debug!(
                    "Material {} expired after {}s",
                    r.material_id,
                    now.saturating_duration_since(r.created_at).as_secs()
                );
                r.material_id.clone()
            })
            .collect();

        for id in &expired {
            self.remove(id);
        }
        expired
    }

    fn remove(&mut self, id: &str) -> bool {
        let removed = self.materials.remove(id).is_some();
        let purged = self.previews.purge_material(id);
        if removed {
            debug!("Removed material {} and {} cached previews", id, purged);
        }
        removed
    }
}

/// Output of the CPU-bound part of the upload pipeline.
struct ProcessedUpload {
    original_png: Vec<u8>,
    processed_png: Vec<u8>,
    crop_box: CropBox,
    padding: u32,
    width: u32,
    height: u32,
}

/// Owns processed materials and their backing files.
pub struct MaterialStore {
    root: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    remover: Arc<BackgroundRemover>,
    resizer: Arc<Resizer>,
    state: Mutex<StoreState>,
}

impl MaterialStore {
    /// Create a store rooted at `config.storage.temp_dir`.
    pub fn new(config: &ForgeConfig, remover: Arc<BackgroundRemover>, resizer: Arc<Resizer>) -> Self {
        Self {
            root: config.storage.temp_dir.clone(),
            ttl: config.materials.ttl(),
            clock: Arc::new(SystemClock),
            remover,
            resizer,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Replace the clock used for expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Root directory holding material namespaces.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sliding TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resizer shared with the preview cache.
    pub fn resizer(&self) -> &Arc<Resizer> {
        &self.resizer
    }

    /// Background remover used by the upload pipeline.
    pub fn remover(&self) -> &Arc<BackgroundRemover> {
        &self.remover
    }

    /// Time left before `record` expires, as of now.
    pub fn remaining_ttl(&self, record: &MaterialRecord) -> Duration {
        record.remaining_ttl(self.clock.now(), self.ttl)
    }

    /// Directory holding a material's assets.
    pub fn namespace(&self, material_id: &str) -> PathBuf {
        self.root.join(material_id)
    }

    /// Run the upload pipeline and register the resulting material.
    ///
    /// Decode, background removal, smart crop, resize and encode run on the
    /// blocking pool. Both the pre-crop original and the 256px asset are
    /// written before the record becomes visible.
    pub async fn create(&self, upload: ValidatedUpload) -> ForgeResult<MaterialRecord> {
        self.evict_expired().await;

        let ValidatedUpload {
            bytes,
            filename,
            format,
            ..
        } = upload;

        let remover = self.remover.clone();
        let resizer = self.resizer.clone();
        let processed = tokio::task::spawn_blocking(move || -> ForgeResult<ProcessedUpload> {
            let decoded = decode_rgba(&bytes)?;
            let original = remover.apply(decoded)?;
            let outcome = smart_crop(&original);
            let material = resizer.resize(&outcome.image, MATERIAL_SIZE, ResampleAlgorithm::Lanczos);

            Ok(ProcessedUpload {
                original_png: encode_png(&original)?,
                processed_png: encode_png(&material)?,
                crop_box: outcome.crop_box,
                padding: outcome.padding,
                width: material.width(),
                height: material.height(),
            })
        })
        .await??;

        let material_id = Uuid::new_v4().simple().to_string();
        let namespace = self.namespace(&material_id);
        let original_path = namespace.join(ORIGINAL_FILE);
        let processed_path = namespace.join(PROCESSED_FILE);

        if let Err(e) = Self::persist(&namespace, &original_path, &processed_path, &processed).await {
            warn!("Failed to persist material {}: {}", material_id, e);
            Self::remove_namespace(&namespace).await;
            return Err(e);
        }

        let now = self.clock.now();
        let record = MaterialRecord {
            material_id: material_id.clone(),
            filename,
            source_format: format,
            original_path,
            processed_path,
            width: processed.width,
            height: processed.height,
            crop_box: processed.crop_box,
            padding: processed.padding,
            created_at: now,
            last_access: now,
            uploaded_at: Utc::now(),
        };

        self.state
            .lock()
            .await
            .materials
            .insert(material_id.clone(), record.clone());

        info!(
            "Created material {} from {} (crop {:?}, padding {})",
            material_id,
            record.filename,
            record.crop_box.to_array(),
            record.padding
        );
        Ok(record)
    }

    /// Look up a material and refresh its expiry window.
    pub async fn get(&self, material_id: &str) -> ForgeResult<MaterialRecord> {
        let now = self.clock.now();
        let (result, expired) = {
            let mut state = self.state.lock().await;
            let expired = state.sweep(now, self.ttl);
            let result = match state.materials.get_mut(material_id) {
                Some(record) => {
                    record.last_access = now;
                    Ok(record.clone())
                }
                None => Err(ForgeError::MaterialNotFound(material_id.to_string())),
            };
            (result, expired)
        };

        self.remove_namespaces(&expired).await;
        result
    }

    /// Read the processed 256px PNG of a material.
    pub async fn material_bytes(&self, material_id: &str) -> ForgeResult<Vec<u8>> {
        let record = self.get(material_id).await?;
        Self::read_asset(material_id, &record.processed_path).await
    }

    /// Read the pre-crop original PNG of a material.
    pub async fn original_bytes(&self, material_id: &str) -> ForgeResult<Vec<u8>> {
        let record = self.get(material_id).await?;
        Self::read_asset(material_id, &record.original_path).await
    }

    /// Remove a material, its previews and its namespace.
    ///
    /// Deleting an unknown id is a no-op. Filesystem errors are ignored.
    pub async fn delete(&self, material_id: &str) -> bool {
        let now = self.clock.now();
        let (removed, mut expired) = {
            let mut state = self.state.lock().await;
            let expired = state.sweep(now, self.ttl);
            (state.remove(material_id), expired)
        };

        expired.push(material_id.to_string());
        self.remove_namespaces(&expired).await;
        removed
    }

    /// Delete every expired material. Returns how many were evicted.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let expired = self.state.lock().await.sweep(now, self.ttl);
        if !expired.is_empty() {
            info!("Evicted {} expired materials", expired.len());
        }
        self.remove_namespaces(&expired).await;
        expired.len()
    }

    /// Remove every material. Used on shutdown.
    pub async fn clear(&self) {
        let ids: Vec<String> = {
            let mut state = self.state.lock().await;
            let ids = state.materials.keys().cloned().collect();
            state.materials.clear();
            state.previews.clear();
            ids
        };
        self.remove_namespaces(&ids).await;
    }

    /// Number of live materials (without sweeping).
    pub async fn len(&self) -> usize {
        self.state.lock().await.materials.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of cached previews across all materials.
    pub async fn preview_count(&self) -> usize {
        self.state.lock().await.previews.len()
    }

    /// Sweep, confirm the material is live, refresh it and return any cached preview.
    pub(crate) async fn lookup_preview(&self, key: &PreviewKey) -> ForgeResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let (result, expired) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let expired = state.sweep(now, self.ttl);
            let result = match state.materials.get_mut(&key.material_id) {
                Some(record) => {
                    record.last_access = now;
                    Ok(state.previews.get(key).cloned())
                }
                None => Err(ForgeError::MaterialNotFound(key.material_id.clone())),
            };
            (result, expired)
        };

        self.remove_namespaces(&expired).await;
        result
    }

    /// Store a computed preview if its material is still live.
    ///
    /// Returns the bytes now associated with the key: an entry stored by a
    /// concurrent task wins over `bytes`.
    pub(crate) async fn insert_preview(&self, key: PreviewKey, bytes: Vec<u8>) -> Vec<u8> {
        let mut state = self.state.lock().await;
        if !state.materials.contains_key(&key.material_id) {
            debug!("Material {} vanished before its preview was stored", key.material_id);
            return bytes;
        }
        state.previews.insert_if_absent(key, bytes)
    }

    async fn persist(
        namespace: &Path,
        original_path: &Path,
        processed_path: &Path,
        processed: &ProcessedUpload,
    ) -> ForgeResult<()> {
        tokio::fs::create_dir_all(namespace).await?;
        tokio::fs::write(original_path, &processed.original_png).await?;
        tokio::fs::write(processed_path, &processed.processed_png).await?;
        Ok(())
    }

    /// Read an asset file. A file deleted since the lookup means the material is gone.
    async fn read_asset(material_id: &str, path: &Path) -> ForgeResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ForgeError::MaterialNotFound(material_id.to_string()),
            _ => ForgeError::from(e),
        })
    }

    async fn remove_namespaces(&self, ids: &[String]) {
        for id in ids {
            if is_material_id(id) {
                Self::remove_namespace(&self.namespace(id)).await;
            }
        }
    }

    async fn remove_namespace(namespace: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(namespace).await {
            debug!("Ignoring namespace cleanup failure for {}: {}", namespace.display(), e);
        }
    }
}
