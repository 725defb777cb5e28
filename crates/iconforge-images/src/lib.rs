//! Material pipeline for IconForge.
//!
//! This crate turns uploaded images into canonical 256px materials and packs
//! icons from them:
//! - Upload validation (size, extension, decodability, format agreement)
//! - Optional background removal behind a lazily built engine
//! - Smart crop with proportional padding and square recentering
//! - Kernel-selectable square resizing
//! - In-memory material store with sliding TTL eviction
//! - Preview cache purged together with its material
//! - Multi-resolution ICO packing

pub mod background;
pub mod clock;
pub mod config;
pub mod crop;
pub mod error;
pub mod forge;
pub mod formats;
pub mod ico;
pub mod models;
pub mod preview;
pub mod raster;
pub mod resize;
pub mod store;
pub mod validator;

pub use background::{BackgroundEngine, BackgroundRemover, BorderKeyEngine, EngineFactory};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackgroundConfig, ForgeConfig, MaterialConfig, StorageConfig, UploadConfig};
pub use crop::{smart_crop, CropBox, CropOutcome};
pub use error::{ErrorKind, ForgeError, ForgeResult};
pub use forge::IconForge;
pub use formats::ImageFormat;
pub use ico::{pack_ico, parse_icon_directory, IconDirectoryEntry, ICON_SIZES};
pub use models::MaterialRecord;
pub use preview::{PreviewCache, PreviewKey};
pub use resize::{ResampleAlgorithm, Resizer, MATERIAL_SIZE};
pub use store::MaterialStore;
pub use validator::{UploadValidator, ValidatedUpload};
