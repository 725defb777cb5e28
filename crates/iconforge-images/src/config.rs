//! Configuration for the material pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ForgeError, ForgeResult};

/// Pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Where material namespaces are written
    pub storage: StorageConfig,
    /// Upload validation limits
    pub upload: UploadConfig,
    /// Material lifetime settings
    pub materials: MaterialConfig,
    /// Background removal settings
    pub background: BackgroundConfig,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per material
    pub temp_dir: PathBuf,
}

/// Upload validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes (10 MB)
    pub max_upload_size_bytes: usize,
    /// Allowed filename extensions, without the leading dot
    pub allowed_extensions: Vec<String>,
}

/// Material lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Sliding TTL in seconds (1 hour)
    pub ttl_seconds: u64,
}

/// Background removal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Whether the background removal stage runs at all
    pub enabled: bool,
    /// Colour distance below which a border-connected pixel counts as background
    pub tolerance: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("/tmp/iconforge/temp"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self { ttl_seconds: 3600 }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 24,
        }
    }
}

impl MaterialConfig {
    /// TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl UploadConfig {
    /// Check if an extension (with or without leading dot) is allowed.
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Allowed extensions as a comma-separated string.
    pub fn allowed_extensions_string(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{}", e.trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ForgeConfig {
    /// Load configuration from a YAML file.
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn from_file(path: &Path) -> ForgeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with hierarchy support.
    ///
    /// Configuration hierarchy (highest to lowest priority):
    /// 1. `ICONFORGE_*` environment variables
    /// 2. Project-level config (`config/iconforge.yaml`)
    /// 3. User-level config (`~/.iconforge/config/iconforge.yaml`)
    /// 4. Built-in defaults
    pub fn load_with_hierarchy() -> ForgeResult<Self> {
        let mut config = Self::default();

        if let Ok(user_home) = std::env::var("HOME") {
            let user_config_path = PathBuf::from(user_home)
                .join(".iconforge")
                .join("config")
                .join("iconforge.yaml");
            match Self::from_file(&user_config_path) {
                Ok(user_config) => config = user_config,
                Err(e) => warn!("Ignoring user config {}: {}", user_config_path.display(), e),
            }
        }

        let project_config_path = PathBuf::from("config/iconforge.yaml");
        if project_config_path.exists() {
            config = Self::from_file(&project_config_path)?;
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `ICONFORGE_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ForgeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("ICONFORGE_TEMP_DIR") {
            self.storage.temp_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("ICONFORGE_MAX_UPLOAD_SIZE_BYTES") {
            self.upload.max_upload_size_bytes = parse_env("ICONFORGE_MAX_UPLOAD_SIZE_BYTES", &value)?;
        }
        if let Some(value) = lookup("ICONFORGE_ALLOWED_IMAGE_EXTENSIONS") {
            self.upload.allowed_extensions = value
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
        }
        if let Some(value) = lookup("ICONFORGE_MATERIAL_TTL_SECONDS") {
            self.materials.ttl_seconds = parse_env("ICONFORGE_MATERIAL_TTL_SECONDS", &value)?;
        }
        if let Some(value) = lookup("ICONFORGE_ENABLE_BACKGROUND_REMOVAL") {
            self.background.enabled = parse_bool("ICONFORGE_ENABLE_BACKGROUND_REMOVAL", &value)?;
        }
        Ok(())
    }
}

/// Parse an environment value, naming the variable on failure.
pub fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ForgeResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ForgeError::ConfigError(format!("{} has an invalid value '{}'", key, value)))
}

/// Parse a boolean environment value (`true/false/1/0/yes/no`).
pub fn parse_bool(key: &str, value: &str) -> ForgeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ForgeError::ConfigError(format!(
            "{} has an invalid value '{}'",
            key, value
        ))),
    }
}
