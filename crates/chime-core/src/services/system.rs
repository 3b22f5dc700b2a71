/// OS-level notification permission, polled on demand (not observable)
pub trait SystemNotificationStatus: Send + Sync {
    fn is_enabled(&self) -> bool;
}
