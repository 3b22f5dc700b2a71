use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chime_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Directory holding the sandbox backend and the device push store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Override for the change-stream debounce window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_debounce_ms: Option<u64>,

    /// Tracing filter used when CHIME_LOG is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("chime")
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("warn")
    }

    pub fn core_config(&self) -> CoreConfig {
        let config = CoreConfig::new(self.data_dir());
        match self.change_debounce_ms {
            Some(ms) => config.with_change_debounce(Duration::from_millis(ms)),
            None => config,
        }
    }
}
