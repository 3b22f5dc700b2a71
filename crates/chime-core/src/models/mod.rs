pub mod async_action;
pub mod push;
pub mod settings;

pub use async_action::AsyncAction;
pub use push::{Distributor, DistributorChoice, PushProvider};
pub use settings::{AppSettings, MatrixSettings, RoomNotificationMode};
