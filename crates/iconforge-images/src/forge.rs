//! `IconForge`: the entry point adapters use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::background::BackgroundRemover;
use crate::clock::Clock;
use crate::config::ForgeConfig;
use crate::error::ForgeResult;
use crate::ico::pack_ico;
use crate::models::MaterialRecord;
use crate::preview::PreviewCache;
use crate::resize::{ResampleAlgorithm, Resizer};
use crate::store::MaterialStore;
use crate::validator::UploadValidator;

/// Side of the externally supplied smallest frame.
pub const TINY_ICON_SIZE: u32 = 16;

/// Mid-size frames derived from the material.
pub const MID_ICON_SIZES: [u32; 2] = [48, 32];

/// Wires validation, the material store, the preview cache and the ICO packer.
#[derive(Clone)]
pub struct IconForge {
    validator: UploadValidator,
    store: Arc<MaterialStore>,
    previews: PreviewCache,
}

impl IconForge {
    /// Build the pipeline from configuration using the built-in background engine.
    pub fn new(config: &ForgeConfig) -> Self {
        let remover = Arc::new(BackgroundRemover::new(&config.background));
        Self::with_remover(config, remover)
    }

    /// Build the pipeline with a specific background remover.
    pub fn with_remover(config: &ForgeConfig, remover: Arc<BackgroundRemover>) -> Self {
        let store = MaterialStore::new(config, remover, Arc::new(Resizer::new()));
        Self::from_store(config, store)
    }

    /// Build the pipeline around an existing store.
    pub fn from_store(config: &ForgeConfig, store: MaterialStore) -> Self {
        let store = Arc::new(store);
        Self {
            validator: UploadValidator::new(config.upload.clone()),
            previews: PreviewCache::new(store.clone()),
            store,
        }
    }

    /// Same as [`IconForge::with_remover`] but with an injected clock.
    pub fn with_clock(
        config: &ForgeConfig,
        remover: Arc<BackgroundRemover>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = MaterialStore::new(config, remover, Arc::new(Resizer::new())).with_clock(clock);
        Self::from_store(config, store)
    }

    /// Create the storage root and initialize the background engine.
    pub async fn warm_up(&self) -> ForgeResult<()> {
        tokio::fs::create_dir_all(self.store.root()).await?;
        let remover = self.store.remover().clone();
        if remover.is_enabled() {
            tokio::task::spawn_blocking(move || remover.warm_up()).await??;
            info!("Background removal engine ready");
        }
        Ok(())
    }

    /// Validate an upload and turn it into a material.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> ForgeResult<MaterialRecord> {
        let upload = self.validator.validate(bytes, filename)?;
        self.store.create(upload).await
    }

    /// Look up a material, refreshing its expiry.
    pub async fn material(&self, material_id: &str) -> ForgeResult<MaterialRecord> {
        self.store.get(material_id).await
    }

    /// Time left before `record` expires unless it is read again.
    pub fn expires_in(&self, record: &MaterialRecord) -> Duration {
        self.store.remaining_ttl(record)
    }

    /// Processed 256px PNG of a material.
    pub async fn material_bytes(&self, material_id: &str) -> ForgeResult<Vec<u8>> {
        self.store.material_bytes(material_id).await
    }

    /// Resized PNG preview of a material.
    pub async fn preview(
        &self,
        material_id: &str,
        algorithm: ResampleAlgorithm,
        size: u32,
    ) -> ForgeResult<Vec<u8>> {
        self.previews.get_or_compute(material_id, algorithm, size).await
    }

    /// Delete a material. Unknown ids are a no-op.
    pub async fn delete(&self, material_id: &str) -> bool {
        self.store.delete(material_id).await
    }

    /// Assemble an ICO from a material plus a caller-supplied 16px frame.
    ///
    /// The 256 frame is the material itself; 48 and 32 come from the preview
    /// cache using `mid_algorithm`.
    pub async fn forge_icon(
        &self,
        source_id: &str,
        mid_algorithm: ResampleAlgorithm,
        tiny_icon: Vec<u8>,
    ) -> ForgeResult<Vec<u8>> {
        let mut frames = HashMap::new();
        frames.insert(256, self.store.material_bytes(source_id).await?);
        for size in MID_ICON_SIZES {
            frames.insert(size, self.preview(source_id, mid_algorithm, size).await?);
        }
        frames.insert(TINY_ICON_SIZE, tiny_icon);

        let ico = tokio::task::spawn_blocking(move || pack_ico(&frames)).await??;
        info!("Forged icon from {} ({} bytes)", source_id, ico.len());
        Ok(ico)
    }

    /// Remove every material. Used on shutdown.
    pub async fn shutdown(&self) {
        self.store.clear().await;
    }

    pub fn store(&self) -> &Arc<MaterialStore> {
        &self.store
    }

    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }
}
