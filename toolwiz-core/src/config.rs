//! Layered configuration.
//!
//! Precedence, highest wins:
//! 1. Environment variables (`TOOLWIZ_*`)
//! 2. Config file (`<config_dir>/toolwiz/config.toml` or an explicit path)
//! 3. Built-in defaults

use crate::error::GenError;
use crate::storage::FileStore;
use crate::types::{ImageSampling, TextSampling};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_TEXT_BASE_URL: &str = "TOOLWIZ_TEXT_BASE_URL";
pub const ENV_TEXT_ACCELERATED_URL: &str = "TOOLWIZ_TEXT_ACCELERATED_URL";
pub const ENV_TEXT_MODEL: &str = "TOOLWIZ_TEXT_MODEL";
pub const ENV_IMAGE_URL: &str = "TOOLWIZ_IMAGE_URL";
pub const ENV_IMAGE_MODEL: &str = "TOOLWIZ_IMAGE_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "TOOLWIZ_TIMEOUT_SECS";

/// Local text runtime settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default = "default_text_base_url")]
    pub base_url: String,
    /// Endpoint of the hardware-accelerated runtime, tried first on bootstrap
    #[serde(default)]
    pub accelerated_url: Option<String>,
    #[serde(default = "default_text_model")]
    pub model: String,
    /// Only needed when the local runtime sits behind an auth proxy
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub sampling: TextSampling,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            base_url: default_text_base_url(),
            accelerated_url: None,
            model: default_text_model(),
            api_key: None,
            sampling: TextSampling::default(),
        }
    }
}

impl fmt::Debug for TextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextConfig")
            .field("base_url", &self.base_url)
            .field("accelerated_url", &self.accelerated_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("sampling", &self.sampling)
            .finish()
    }
}

fn default_text_base_url() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_text_model() -> String {
    "gpt2".to_string()
}

/// Remote image API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_url")]
    pub url: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default)]
    pub sampling: ImageSampling,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            url: default_image_url(),
            model: default_image_model(),
            sampling: ImageSampling::default(),
        }
    }
}

fn default_image_url() -> String {
    "https://api.runware.ai/v1".to_string()
}

fn default_image_model() -> String {
    "runware:100@1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolwizConfig {
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub image: ImageConfig,
    /// Per-request timeout applied by the timeout layer
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overrides the default credential file location
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for ToolwizConfig {
    fn default() -> Self {
        Self {
            text: TextConfig::default(),
            image: ImageConfig::default(),
            timeout_secs: default_timeout_secs(),
            credentials_path: None,
        }
    }
}

impl ToolwizConfig {
    /// `<config_dir>/toolwiz/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolwiz").join("config.toml"))
    }

    /// Load configuration with environment overrides applied.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, GenError> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(config.apply_env())
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, GenError> {
        toml::from_str(content)
            .map_err(|e| GenError::configuration(format!("Failed to parse config: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_TEXT_BASE_URL) {
            self.text.base_url = url;
        }
        if let Some(url) = var(ENV_TEXT_ACCELERATED_URL) {
            self.text.accelerated_url = Some(url);
        }
        if let Some(model) = var(ENV_TEXT_MODEL) {
            self.text.model = model;
        }
        if let Some(url) = var(ENV_IMAGE_URL) {
            self.image.url = url;
        }
        if let Some(model) = var(ENV_IMAGE_MODEL) {
            self.image.model = model;
        }
        if let Some(raw) = var(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => tracing::warn!("Ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Credential file store at the configured or default location
    pub fn credential_store(&self) -> Result<FileStore, GenError> {
        match &self.credentials_path {
            Some(path) => Ok(FileStore::new(path.clone())),
            None => FileStore::default_location(),
        }
    }

    fn load_file(path: &Path) -> Result<Self, GenError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenError::configuration(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            GenError::configuration(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }
}
