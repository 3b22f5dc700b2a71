use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::constants::{DEFAULT_DEVICE_NOTIFICATIONS_ENABLED, USER_PUSH_STORE_FILE};
use crate::error::ChimeResult;
use crate::services::PerDeviceStore;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedPushPrefs {
    #[serde(default = "default_enabled")]
    notifications_enabled: bool,
}

fn default_enabled() -> bool {
    DEFAULT_DEVICE_NOTIFICATIONS_ENABLED
}

/// Per-device push preferences (persisted to JSON file)
pub struct UserPushStore {
    path: Option<PathBuf>,
    tx: watch::Sender<bool>,
}

impl UserPushStore {
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join(USER_PUSH_STORE_FILE);
        let enabled = Self::load_from_file(&path)
            .map(|prefs| prefs.notifications_enabled)
            .unwrap_or(DEFAULT_DEVICE_NOTIFICATIONS_ENABLED);
        let (tx, _rx) = watch::channel(enabled);
        Self {
            path: Some(path),
            tx,
        }
    }

    /// Store that never touches the disk
    pub fn in_memory(enabled: bool) -> Self {
        let (tx, _rx) = watch::channel(enabled);
        Self { path: None, tx }
    }

    pub fn is_enabled(&self) -> bool {
        *self.tx.borrow()
    }

    fn load_from_file(path: &Path) -> Option<PersistedPushPrefs> {
        if !path.exists() {
            return None;
        }
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read push preferences, using default"
                );
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt push preferences, using default"
                );
                None
            }
        }
    }

    fn save_to_file(path: &Path, enabled: bool) -> ChimeResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&PersistedPushPrefs {
            notifications_enabled: enabled,
        })?;
        // temp file + rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl PerDeviceStore for UserPushStore {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    fn set_enabled(&self, enabled: bool) -> ChimeResult<()> {
        if let Some(path) = &self.path {
            Self::save_to_file(path, enabled)?;
        }
        self.tx.send_replace(enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_to_enabled_without_file() {
        let dir = TempDir::new().unwrap();
        let store = UserPushStore::new(dir.path());
        assert!(store.is_enabled());
    }

    #[test]
    fn test_value_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = UserPushStore::new(dir.path());
            store.set_enabled(false).unwrap();
        }
        let reopened = UserPushStore::new(dir.path());
        assert!(!reopened.is_enabled());
        assert!(!dir.path().join("user_push_store.json.tmp").exists());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn open_with_logs(dir: &Path) -> (UserPushStore, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let store = tracing::subscriber::with_default(subscriber, || UserPushStore::new(dir));
        (store, logs.text())
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default_and_warns() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(USER_PUSH_STORE_FILE), "{not json").unwrap();

        let (store, logs) = open_with_logs(dir.path());

        assert!(store.is_enabled());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("Corrupt push preferences"));
    }

    #[test]
    fn test_missing_file_is_silent() {
        let dir = TempDir::new().unwrap();
        let (store, logs) = open_with_logs(dir.path());
        assert!(store.is_enabled());
        assert!(logs.is_empty());
    }

    #[test]
    fn test_subscribers_see_new_value() {
        let store = UserPushStore::in_memory(true);
        let mut rx = store.subscribe();
        store.set_enabled(false).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }
}
