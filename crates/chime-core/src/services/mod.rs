//! Collaborator contracts consumed by the reconciler.
//!
//! Real implementations wrap a Matrix SDK session, a push transport and the
//! OS notification manager; `crate::memory` has in-process ones.

pub mod device_store;
pub mod push_service;
pub mod settings_service;
pub mod system;

pub use device_store::PerDeviceStore;
pub use push_service::PushService;
pub use settings_service::{ChangeStream, NotificationSettingsService};
pub use system::SystemNotificationStatus;
