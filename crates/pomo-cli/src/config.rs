//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use pomo_core::db::DEFAULT_CAPACITY_BYTES;
use pomo_core::export::ExportFormat;
use pomo_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub capacity_bytes: Option<usize>,
    #[serde(default)]
    pub default_export_format: Option<ExportFormat>,
}

const fn default_config_version() -> u32 {
    1
}

/// Config file location, honoring `POMO_CONFIG_PATH`.
pub fn config_path() -> PathBuf {
    std::env::var_os("POMO_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pomo")
        .join(CONFIG_FILE_NAME)
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Storage budget, defaulting to a browser-style 5 MiB quota
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes.unwrap_or(DEFAULT_CAPACITY_BYTES)
    }

    pub fn export_format(&self) -> ExportFormat {
        self.default_export_format.unwrap_or(ExportFormat::Csv)
    }

    fn normalize(&mut self) {
        if self.version == 0 {
            self.version = default_config_version();
        }
        self.db_path = normalize_text_option(self.db_path.take());
        self.capacity_bytes = self.capacity_bytes.filter(|bytes| *bytes > 0);
    }
}
