use serde::Serialize;
use tokio::sync::watch;

use crate::events::EventSink;
use crate::models::{AppSettings, AsyncAction, DistributorChoice, MatrixSettings};

/// Snapshot rendered by the notification settings screen.
///
/// Never mutated in place by consumers; every transition publishes a whole
/// new value through [`StateCell`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSettingsState {
    pub matrix_settings: MatrixSettings,
    pub app_settings: AppSettings,
    /// Shared slot for every remote settings write
    pub change_notification_setting_action: AsyncAction<()>,
    pub current_push_distributor: AsyncAction<String>,
    pub available_push_distributors: Vec<DistributorChoice>,
    pub show_change_push_provider_dialog: bool,
    #[serde(skip)]
    pub event_sink: EventSink,
}

impl NotificationSettingsState {
    pub(crate) fn initial(
        app_settings: AppSettings,
        available_push_distributors: Vec<DistributorChoice>,
        event_sink: EventSink,
    ) -> Self {
        Self {
            matrix_settings: MatrixSettings::Uninitialized,
            app_settings,
            change_notification_setting_action: AsyncAction::Uninitialized,
            current_push_distributor: AsyncAction::Uninitialized,
            available_push_distributors,
            show_change_push_provider_dialog: false,
            event_sink,
        }
    }
}

/// Observable holder of the current [`NotificationSettingsState`]
pub struct StateCell {
    tx: watch::Sender<NotificationSettingsState>,
}

impl StateCell {
    pub fn new(initial: NotificationSettingsState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> NotificationSettingsState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSettingsState> {
        self.tx.subscribe()
    }

    /// Apply `f` and publish the result as one step. Subscribers are only
    /// woken when the snapshot actually changed.
    pub fn update(&self, f: impl FnOnce(&mut NotificationSettingsState)) {
        self.tx.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }
}
