use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chime_core::memory::{
    InMemoryPushService, InMemorySettingsService, PushSnapshot, RemoteSettingsSnapshot,
    StaticSystemStatus,
};
use serde::{Deserialize, Serialize};

const SANDBOX_FILE: &str = "sandbox.json";

/// Stand-in homeserver and push backend, persisted between CLI runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxBackend {
    #[serde(default)]
    pub settings: RemoteSettingsSnapshot,
    #[serde(default)]
    pub push: PushSnapshot,
    #[serde(default = "default_system_enabled")]
    pub system_notifications_enabled: bool,
}

fn default_system_enabled() -> bool {
    true
}

impl Default for SandboxBackend {
    fn default() -> Self {
        Self {
            settings: RemoteSettingsSnapshot::default(),
            push: PushSnapshot::default(),
            system_notifications_enabled: true,
        }
    }
}

/// Live collaborators built from a [`SandboxBackend`]
pub struct SandboxServices {
    pub settings: Arc<InMemorySettingsService>,
    pub push: Arc<InMemoryPushService>,
    pub system: Arc<StaticSystemStatus>,
}

impl SandboxBackend {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SANDBOX_FILE)
    }

    /// Load the sandbox, or start from defaults when none was saved yet
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sandbox: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sandbox: {}", path.display()))
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;
        let path = Self::path(data_dir);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize sandbox")?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).context("Failed to write sandbox")?;
        fs::rename(&temp_path, &path).context("Failed to move sandbox into place")?;
        Ok(())
    }

    pub fn services(&self) -> SandboxServices {
        SandboxServices {
            settings: Arc::new(InMemorySettingsService::from_snapshot(
                self.settings.clone(),
            )),
            push: Arc::new(InMemoryPushService::from_snapshot(self.push.clone())),
            system: Arc::new(StaticSystemStatus::new(self.system_notifications_enabled)),
        }
    }
}

impl SandboxServices {
    /// Capture the collaborators' current state for saving
    pub fn snapshot(&self, system_notifications_enabled: bool) -> SandboxBackend {
        SandboxBackend {
            settings: self.settings.snapshot(),
            push: self.push.snapshot(),
            system_notifications_enabled,
        }
    }
}
