use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::SETTINGS_CHANGE_DEBOUNCE;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// Quiet period applied to the remote change stream before re-fetching
    pub change_debounce: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            change_debounce: SETTINGS_CHANGE_DEBOUNCE,
        }
    }

    pub fn with_change_debounce(mut self, debounce: Duration) -> Self {
        self.change_debounce = debounce;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("chime_data")
    }
}
