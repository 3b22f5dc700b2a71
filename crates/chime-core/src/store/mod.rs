pub mod state;
pub mod user_push_store;

pub use state::{NotificationSettingsState, StateCell};
pub use user_push_store::UserPushStore;
