pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod memory;
pub mod models;
pub mod reconciler;
pub mod services;
pub mod store;
pub mod tracing_setup;

// Re-export the types most callers need at crate root
pub use config::CoreConfig;
pub use error::{ChimeError, ChimeResult};
pub use events::{EventSink, NotificationSettingsEvent};
pub use models::{
    AppSettings, AsyncAction, Distributor, DistributorChoice, MatrixSettings, PushProvider,
    RoomNotificationMode,
};
pub use reconciler::NotificationSettingsReconciler;
pub use store::{NotificationSettingsState, UserPushStore};
