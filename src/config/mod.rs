//! # Configuration
//!
//! TOML configuration for the `questlog` binary.
//!
//! ## Sections
//!
//! - [`CatalogConfig`] - where the quest catalog JSON lives
//! - [`StorageConfig`] - sled data directory and writer retry bound
//! - [`PlayerProfile`] - static player attributes used for gating
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use questlog::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Catalog: {}", config.catalog.path);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//!
//! ```toml
//! [catalog]
//! path = "data/quests.json"
//!
//! [storage]
//! data_dir = "data/progress"
//! max_write_attempts = 3
//!
//! [player]
//! level = 15
//! scav_karma = 0.5
//! editions = ["standard"]
//! prestige = 0
//! decode_count = 0
//!
//! [logging]
//! level = "info"
//! file = "questlog.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::quests::{PlayerProfile, WriterConfig};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub player: PlayerProfile,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/quests.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,
}

fn default_max_write_attempts() -> u32 {
    3
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/progress".to_string(),
            max_write_attempts: default_max_write_attempts(),
        }
    }
}

impl StorageConfig {
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            max_attempts: self.max_write_attempts,
            ..WriterConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("questlog.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        if config.storage.max_write_attempts == 0 {
            return Err(anyhow!(
                "Invalid config file {}: storage.max_write_attempts must be at least 1",
                path
            ));
        }

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
