use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ChimeResult;
use crate::models::RoomNotificationMode;

/// Ticks once per remote change to the account's push rules
pub type ChangeStream = BoxStream<'static, ()>;

/// Remote account-level notification settings
#[async_trait]
pub trait NotificationSettingsService: Send + Sync {
    async fn default_room_notification_mode(
        &self,
        is_encrypted: bool,
        is_one_to_one: bool,
    ) -> ChimeResult<RoomNotificationMode>;

    async fn set_default_room_notification_mode(
        &self,
        is_encrypted: bool,
        mode: RoomNotificationMode,
        is_one_to_one: bool,
    ) -> ChimeResult<()>;

    async fn is_room_mention_enabled(&self) -> ChimeResult<bool>;
    async fn set_room_mention_enabled(&self, enabled: bool) -> ChimeResult<()>;

    async fn is_call_enabled(&self) -> ChimeResult<bool>;
    async fn set_call_enabled(&self, enabled: bool) -> ChimeResult<()>;

    async fn is_invite_for_me_enabled(&self) -> ChimeResult<bool>;
    async fn set_invite_for_me_enabled(&self, enabled: bool) -> ChimeResult<()>;

    fn subscribe_changes(&self) -> ChangeStream;
}
