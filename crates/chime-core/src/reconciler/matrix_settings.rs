use std::future::Future;

use tracing::{debug, warn};

use super::ReconcilerCore;
use crate::error::ChimeResult;
use crate::models::{AsyncAction, MatrixSettings, RoomNotificationMode};

impl ReconcilerCore {
    /// Read the remote settings and publish them.
    ///
    /// A failed read leaves the published settings untouched.
    pub(crate) async fn fetch_settings(&self) -> ChimeResult<()> {
        match self.read_matrix_settings().await {
            Ok(settings) => {
                debug!(?settings, "Fetched notification settings");
                self.state.update(|s| s.matrix_settings = settings);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch notification settings");
                Err(e)
            }
        }
    }

    async fn read_matrix_settings(&self) -> ChimeResult<MatrixSettings> {
        let (group_mode, encrypted_group_mode) = self.read_mode_pair(false).await?;
        let (one_to_one_mode, encrypted_one_to_one_mode) = self.read_mode_pair(true).await?;

        if group_mode != encrypted_group_mode || one_to_one_mode != encrypted_one_to_one_mode {
            return Ok(MatrixSettings::Invalid { fix_failed: false });
        }

        let call_enabled = self.settings.is_call_enabled().await?;
        let invite_for_me_enabled = self.settings.is_invite_for_me_enabled().await?;
        let at_room_enabled = self.settings.is_room_mention_enabled().await?;

        Ok(MatrixSettings::Valid {
            at_room_enabled,
            call_enabled,
            invite_for_me_enabled,
            default_group_mode: encrypted_group_mode,
            default_one_to_one_mode: encrypted_one_to_one_mode,
        })
    }

    /// `(unencrypted, encrypted)` default modes for one room category
    async fn read_mode_pair(
        &self,
        is_one_to_one: bool,
    ) -> ChimeResult<(RoomNotificationMode, RoomNotificationMode)> {
        let plain = self
            .settings
            .default_room_notification_mode(false, is_one_to_one)
            .await?;
        let encrypted = self
            .settings
            .default_room_notification_mode(true, is_one_to_one)
            .await?;
        Ok((plain, encrypted))
    }

    /// Realign mismatching encrypted/unencrypted defaults.
    ///
    /// Success publishes nothing; the corrected values arrive through the
    /// change stream or the next fetch.
    pub(crate) async fn fix_configuration_mismatch(&self) -> ChimeResult<()> {
        let result = self.apply_mismatch_fix().await;
        if let Err(e) = &result {
            warn!(error = %e, "Failed to fix notification settings mismatch");
            self.state
                .update(|s| s.matrix_settings = MatrixSettings::Invalid { fix_failed: true });
        }
        result
    }

    async fn apply_mismatch_fix(&self) -> ChimeResult<()> {
        for is_one_to_one in [false, true] {
            let (plain, encrypted) = self.read_mode_pair(is_one_to_one).await?;
            if plain == encrypted {
                continue;
            }
            let is_encrypted = encrypted != RoomNotificationMode::AllMessages;
            debug!(
                is_one_to_one,
                %plain,
                %encrypted,
                is_encrypted,
                "Correcting default notification mode"
            );
            self.settings
                .set_default_room_notification_mode(
                    is_encrypted,
                    RoomNotificationMode::AllMessages,
                    is_one_to_one,
                )
                .await?;
        }
        Ok(())
    }

    /// Drive the shared change slot through `Loading` to the write's outcome.
    ///
    /// Overlapping writes all share the slot; whichever finishes last wins.
    async fn run_change_action<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = ChimeResult<()>>,
    {
        self.state.update(|s| {
            s.change_notification_setting_action = AsyncAction::Loading;
        });
        let result = write.await;
        if let Err(e) = &result {
            warn!(setting = what, error = %e, "Failed to update notification setting");
        }
        self.state.update(|s| {
            s.change_notification_setting_action = AsyncAction::from_result(result);
        });
    }

    pub(crate) async fn set_at_room_notifications_enabled(&self, enabled: bool) {
        self.run_change_action(
            "at_room",
            self.settings.set_room_mention_enabled(enabled),
        )
        .await;
    }

    pub(crate) async fn set_call_notifications_enabled(&self, enabled: bool) {
        self.run_change_action("call", self.settings.set_call_enabled(enabled))
            .await;
    }

    pub(crate) async fn set_invite_for_me_notifications_enabled(&self, enabled: bool) {
        self.run_change_action(
            "invite_for_me",
            self.settings.set_invite_for_me_enabled(enabled),
        )
        .await;
    }

    pub(crate) async fn set_default_room_notification_mode(
        &self,
        is_one_to_one: bool,
        mode: RoomNotificationMode,
    ) {
        self.run_change_action(
            "default_mode",
            self.write_default_mode(is_one_to_one, mode),
        )
        .await;
    }

    /// Encrypted first, then unencrypted, so both variants end up equal
    async fn write_default_mode(
        &self,
        is_one_to_one: bool,
        mode: RoomNotificationMode,
    ) -> ChimeResult<()> {
        self.settings
            .set_default_room_notification_mode(true, mode, is_one_to_one)
            .await?;
        self.settings
            .set_default_room_notification_mode(false, mode, is_one_to_one)
            .await
    }
}
