//! Server configuration

use std::path::{Path, PathBuf};

use iconforge_images::config::{parse_bool, parse_env};
use iconforge_images::{ForgeConfig, ForgeResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// HTTP adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_address: String,
    /// Prefix for the versioned routes
    pub api_prefix: String,
    /// Reject requests without a matching `X-API-Key`
    pub require_api_key: bool,
    /// Expected API key
    pub api_key: Option<String>,
    /// Enable per-client rate limiting
    pub enable_rate_limit: bool,
    /// Requests allowed per client in a 60 second window
    pub rate_limit_per_minute: u32,
    /// Header carrying the request id
    pub request_id_header: String,
    /// Tracing level for the binary
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            require_api_key: false,
            api_key: None,
            enable_rate_limit: false,
            rate_limit_per_minute: 120,
            request_id_header: "X-Request-ID".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Everything the binary needs: the server section plus the pipeline sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP adapter section
    #[serde(default)]
    pub server: ServerConfig,
    /// Pipeline sections (`storage`, `upload`, `materials`, `background`)
    #[serde(flatten)]
    pub forge: ForgeConfig,
}

impl AppConfig {
    /// Load from a YAML file, falling back to defaults when it is absent.
    pub fn from_file(path: &Path) -> ForgeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// User config, then project config, then `ICONFORGE_*` variables.
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

    /// Apply environment overrides for both sections.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ForgeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = &mut self.server;
        if let Some(value) = lookup("ICONFORGE_BIND_ADDRESS") {
            server.bind_address = value;
        }
        if let Some(value) = lookup("ICONFORGE_API_PREFIX") {
            server.api_prefix = normalize_prefix(&value);
        }
        if let Some(value) = lookup("ICONFORGE_REQUIRE_API_KEY") {
            server.require_api_key = parse_bool("ICONFORGE_REQUIRE_API_KEY", &value)?;
        }
        if let Some(value) = lookup("ICONFORGE_API_KEY") {
            server.api_key = Some(value).filter(|key| !key.is_empty());
        }
        if let Some(value) = lookup("ICONFORGE_ENABLE_RATE_LIMIT") {
            server.enable_rate_limit = parse_bool("ICONFORGE_ENABLE_RATE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("ICONFORGE_RATE_LIMIT_PER_MINUTE") {
            server.rate_limit_per_minute = parse_env("ICONFORGE_RATE_LIMIT_PER_MINUTE", &value)?;
        }
        if let Some(value) = lookup("ICONFORGE_REQUEST_ID_HEADER") {
            server.request_id_header = value;
        }
        if let Some(value) = lookup("ICONFORGE_LOG_LEVEL") {
            server.log_level = value;
        }

        self.forge.apply_env_overrides(lookup)
    }
}

/// Ensure a leading slash and no trailing slash. An empty prefix mounts at the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
