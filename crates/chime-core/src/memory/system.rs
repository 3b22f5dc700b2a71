use std::sync::atomic::{AtomicBool, Ordering};

use crate::services::SystemNotificationStatus;

/// OS permission flag that only changes when told to
#[derive(Debug)]
pub struct StaticSystemStatus {
    enabled: AtomicBool,
}

impl StaticSystemStatus {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl SystemNotificationStatus for StaticSystemStatus {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
