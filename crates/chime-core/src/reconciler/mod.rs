//! Notification settings reconciler.
//!
//! Composes the remote settings service, the per-device push store, the push
//! registration service and the OS permission check into one
//! [`NotificationSettingsState`] snapshot, and executes the commands the
//! settings screen sends back.
//!
//! # Lifecycle
//! [`NotificationSettingsReconciler::start`] spawns the long-lived tasks of
//! an activation (initial fetch, debounced change observer, device flag
//! mirror, distributor lookup, event loop). Every task, including the ones
//! launched for individual events, is tied to one cancellation token that
//! fires on [`NotificationSettingsReconciler::shutdown`] or on drop.

mod debounce;
mod distributors;
mod matrix_settings;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use debounce::debounce;
use distributors::DistributorCatalog;

use crate::config::CoreConfig;
use crate::error::ChimeResult;
use crate::events::{EventSink, NotificationSettingsEvent};
use crate::models::{
    AppSettings, AsyncAction, DistributorChoice, MatrixSettings, RoomNotificationMode,
};
use crate::services::{
    NotificationSettingsService, PerDeviceStore, PushService, SystemNotificationStatus,
};
use crate::store::{NotificationSettingsState, StateCell};

/// State and collaborators shared by every task of one activation
pub(crate) struct ReconcilerCore {
    config: CoreConfig,
    settings: Arc<dyn NotificationSettingsService>,
    push: Arc<dyn PushService>,
    device_store: Arc<dyn PerDeviceStore>,
    system: Arc<dyn SystemNotificationStatus>,
    state: StateCell,
    catalog: DistributorCatalog,
    /// Bumped whenever the current distributor must be re-derived
    refresh_token: AtomicU64,
    cancel: CancellationToken,
}

pub struct NotificationSettingsReconciler {
    core: Arc<ReconcilerCore>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<NotificationSettingsEvent>>>,
}

impl NotificationSettingsReconciler {
    pub fn new(
        config: CoreConfig,
        settings: Arc<dyn NotificationSettingsService>,
        push: Arc<dyn PushService>,
        device_store: Arc<dyn PerDeviceStore>,
        system: Arc<dyn SystemNotificationStatus>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let catalog = DistributorCatalog::default();
        let app_settings = AppSettings {
            system_notifications_enabled: system.is_enabled(),
            app_notifications_enabled: *device_store.subscribe().borrow(),
        };
        let initial = NotificationSettingsState::initial(
            app_settings,
            catalog.get(push.as_ref()),
            EventSink::new(event_tx),
        );

        Self {
            core: Arc::new(ReconcilerCore {
                config,
                settings,
                push,
                device_store,
                system,
                state: StateCell::new(initial),
                catalog,
                refresh_token: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Spawn the activation's background tasks. Must run inside a tokio
    /// runtime; calling it a second time is a no-op.
    pub fn start(&self) {
        let Some(event_rx) = self.event_rx.lock().take() else {
            warn!("Notification settings reconciler already started");
            return;
        };
        let core = &self.core;

        core.launch("event_loop", core.clone().run_event_loop(event_rx));
        core.launch("observe_changes", core.clone().observe_changes());
        core.launch("mirror_device_flag", core.clone().mirror_device_flag());

        let this = core.clone();
        core.launch("initial_fetch", async move {
            let _ = this.fetch_settings().await;
        });

        let this = core.clone();
        core.launch("current_distributor", async move {
            this.refresh_current_distributor().await;
        });
    }

    /// Cancel every task of this activation
    pub fn shutdown(&self) {
        if !self.core.cancel.is_cancelled() {
            debug!("Tearing down notification settings reconciler");
            self.core.cancel.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.core.cancel.is_cancelled()
    }

    pub fn state(&self) -> NotificationSettingsState {
        self.core.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSettingsState> {
        self.core.state.subscribe()
    }

    pub fn event_sink(&self) -> EventSink {
        self.core.state.snapshot().event_sink
    }

    /// Dispatch a command; async work is launched on the activation scope
    pub fn handle_event(&self, event: NotificationSettingsEvent) {
        self.core.handle_event(event);
    }

    pub async fn fetch_settings(&self) -> ChimeResult<()> {
        self.core.fetch_settings().await
    }

    pub async fn fix_configuration_mismatch(&self) -> ChimeResult<()> {
        self.core.fix_configuration_mismatch().await
    }

    pub async fn set_at_room_notifications_enabled(&self, enabled: bool) {
        self.core.set_at_room_notifications_enabled(enabled).await;
    }

    pub async fn set_call_notifications_enabled(&self, enabled: bool) {
        self.core.set_call_notifications_enabled(enabled).await;
    }

    pub async fn set_invite_for_me_notifications_enabled(&self, enabled: bool) {
        self.core.set_invite_for_me_notifications_enabled(enabled).await;
    }

    pub async fn set_default_room_notification_mode(
        &self,
        is_one_to_one: bool,
        mode: RoomNotificationMode,
    ) {
        self.core
            .set_default_room_notification_mode(is_one_to_one, mode)
            .await;
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.core.set_notifications_enabled(enabled);
    }

    pub fn refresh_system_notifications_enabled(&self) {
        self.core.refresh_system_notifications_enabled();
    }

    /// Copy the per-device flag into the snapshot without a running mirror
    pub fn refresh_app_notifications_enabled(&self) {
        self.core.refresh_app_notifications_enabled();
    }

    pub fn list_available_distributors(&self) -> Vec<DistributorChoice> {
        self.core.list_available()
    }

    pub fn refresh_distributors(&self) {
        self.core.refresh_distributors();
    }

    pub async fn current_distributor(&self) -> AsyncAction<String> {
        self.core.current_distributor().await
    }

    pub async fn refresh_current_distributor(&self) {
        self.core.refresh_current_distributor().await;
    }

    pub async fn change_distributor(&self, choice: Option<DistributorChoice>) {
        self.core.change_distributor(choice).await;
    }

    pub async fn select_distributor(&self, index: usize) {
        self.core.select_distributor(index).await;
    }
}

impl Drop for NotificationSettingsReconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ReconcilerCore {
    /// Spawn `task` so that it stops when the activation is torn down
    fn launch<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!(task = name, "Task cancelled"),
                _ = task => {}
            }
        });
    }

    fn handle_event(self: &Arc<Self>, event: NotificationSettingsEvent) {
        debug!(?event, "Handling notification settings event");
        let this = self.clone();
        match event {
            NotificationSettingsEvent::SetAtRoomNotificationsEnabled(enabled) => {
                self.launch("set_at_room", async move {
                    this.set_at_room_notifications_enabled(enabled).await
                });
            }
            NotificationSettingsEvent::SetCallNotificationsEnabled(enabled) => {
                self.launch("set_call", async move {
                    this.set_call_notifications_enabled(enabled).await
                });
            }
            NotificationSettingsEvent::SetInviteForMeNotificationsEnabled(enabled) => {
                self.launch("set_invite_for_me", async move {
                    this.set_invite_for_me_notifications_enabled(enabled).await
                });
            }
            NotificationSettingsEvent::SetDefaultRoomNotificationMode {
                is_one_to_one,
                mode,
            } => {
                self.launch("set_default_mode", async move {
                    this.set_default_room_notification_mode(is_one_to_one, mode)
                        .await
                });
            }
            NotificationSettingsEvent::SetNotificationsEnabled(enabled) => {
                self.set_notifications_enabled(enabled);
            }
            NotificationSettingsEvent::ClearConfigurationMismatchError => {
                self.state.update(|s| {
                    s.matrix_settings = MatrixSettings::Invalid { fix_failed: false }
                });
            }
            NotificationSettingsEvent::FixConfigurationMismatch => {
                self.launch("fix_mismatch", async move {
                    let _ = this.fix_configuration_mismatch().await;
                });
            }
            NotificationSettingsEvent::RefreshSystemNotificationsEnabled => {
                self.refresh_system_notifications_enabled();
            }
            NotificationSettingsEvent::ClearNotificationChangeError => {
                self.state.update(|s| {
                    s.change_notification_setting_action = AsyncAction::Uninitialized
                });
            }
            NotificationSettingsEvent::ChangePushProvider => {
                self.state
                    .update(|s| s.show_change_push_provider_dialog = true);
            }
            NotificationSettingsEvent::CancelChangePushProvider => {
                self.state
                    .update(|s| s.show_change_push_provider_dialog = false);
            }
            NotificationSettingsEvent::SetPushProvider(index) => {
                self.launch("change_distributor", async move {
                    this.select_distributor(index).await
                });
            }
        }
    }

    async fn run_event_loop(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<NotificationSettingsEvent>,
    ) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
    }

    async fn observe_changes(self: Arc<Self>) {
        let changes = debounce(self.settings.subscribe_changes(), self.config.change_debounce);
        let mut changes = std::pin::pin!(changes);
        while changes.next().await.is_some() {
            debug!("Remote notification settings changed");
            let _ = self.fetch_settings().await;
        }
    }

    async fn mirror_device_flag(self: Arc<Self>) {
        let mut enabled_rx = self.device_store.subscribe();
        loop {
            let enabled = *enabled_rx.borrow_and_update();
            self.state
                .update(|s| s.app_settings.app_notifications_enabled = enabled);
            if enabled_rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Per-device only; remote settings are not touched
    fn set_notifications_enabled(&self, enabled: bool) {
        if let Err(e) = self.device_store.set_enabled(enabled) {
            warn!(error = %e, enabled, "Failed to store device notification flag");
        }
    }

    fn refresh_app_notifications_enabled(&self) {
        let enabled = *self.device_store.subscribe().borrow();
        self.state
            .update(|s| s.app_settings.app_notifications_enabled = enabled);
    }

    fn refresh_system_notifications_enabled(&self) {
        let enabled = self.system.is_enabled();
        self.state
            .update(|s| s.app_settings.system_notifications_enabled = enabled);
    }
}
