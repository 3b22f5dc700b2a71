use tokio::sync::watch;

use crate::error::ChimeResult;

/// Local, per-device "notifications enabled" flag
pub trait PerDeviceStore: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<bool>;
    fn set_enabled(&self, enabled: bool) -> ChimeResult<()>;
}
