//! Application configuration

use std::path::Path;
use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use qv_views::BrowserOptions;

/// Settings read from the optional `--config` file. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Viewport, controls and load behaviour
    pub browser: BrowserOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            browser: BrowserOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load a configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
