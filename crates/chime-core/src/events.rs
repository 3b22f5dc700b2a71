use tokio::sync::mpsc;

use crate::models::RoomNotificationMode;

/// Commands accepted by the notification settings reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSettingsEvent {
    SetAtRoomNotificationsEnabled(bool),
    SetCallNotificationsEnabled(bool),
    SetInviteForMeNotificationsEnabled(bool),
    /// Per-device flag only; the remote settings are left alone
    SetNotificationsEnabled(bool),
    SetDefaultRoomNotificationMode {
        is_one_to_one: bool,
        mode: RoomNotificationMode,
    },
    ClearConfigurationMismatchError,
    FixConfigurationMismatch,
    RefreshSystemNotificationsEnabled,
    ClearNotificationChangeError,
    ChangePushProvider,
    CancelChangePushProvider,
    /// Index into the flattened distributor catalog
    SetPushProvider(usize),
}

/// Cloneable handle used by the UI layer to send commands.
///
/// Sending after the owning reconciler was torn down is silently ignored.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<NotificationSettingsEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<NotificationSettingsEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: NotificationSettingsEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Dropping notification settings event, reconciler is gone");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for EventSink {
    fn eq(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl Eq for EventSink {}
