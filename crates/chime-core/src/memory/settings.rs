use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{ChimeError, ChimeResult};
use crate::models::RoomNotificationMode;
use crate::services::{ChangeStream, NotificationSettingsService};

/// Remote account settings as stored by [`InMemorySettingsService`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettingsSnapshot {
    pub group_mode: RoomNotificationMode,
    pub encrypted_group_mode: RoomNotificationMode,
    pub one_to_one_mode: RoomNotificationMode,
    pub encrypted_one_to_one_mode: RoomNotificationMode,
    pub room_mention_enabled: bool,
    pub call_enabled: bool,
    pub invite_for_me_enabled: bool,
}

impl Default for RemoteSettingsSnapshot {
    fn default() -> Self {
        Self {
            group_mode: RoomNotificationMode::MentionsAndKeywordsOnly,
            encrypted_group_mode: RoomNotificationMode::MentionsAndKeywordsOnly,
            one_to_one_mode: RoomNotificationMode::AllMessages,
            encrypted_one_to_one_mode: RoomNotificationMode::AllMessages,
            room_mention_enabled: true,
            call_enabled: true,
            invite_for_me_enabled: true,
        }
    }
}

impl RemoteSettingsSnapshot {
    fn mode_mut(&mut self, is_encrypted: bool, is_one_to_one: bool) -> &mut RoomNotificationMode {
        match (is_encrypted, is_one_to_one) {
            (false, false) => &mut self.group_mode,
            (true, false) => &mut self.encrypted_group_mode,
            (false, true) => &mut self.one_to_one_mode,
            (true, true) => &mut self.encrypted_one_to_one_mode,
        }
    }

    fn mode(&self, is_encrypted: bool, is_one_to_one: bool) -> RoomNotificationMode {
        match (is_encrypted, is_one_to_one) {
            (false, false) => self.group_mode,
            (true, false) => self.encrypted_group_mode,
            (false, true) => self.one_to_one_mode,
            (true, true) => self.encrypted_one_to_one_mode,
        }
    }
}

/// Operation kinds, used to target failure injection and to inspect reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsOp {
    GetDefaultMode,
    SetDefaultMode,
    GetRoomMention,
    SetRoomMention,
    GetCall,
    SetCall,
    GetInviteForMe,
    SetInviteForMe,
}

/// A write that reached the service (successful or not)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsWrite {
    DefaultMode {
        is_encrypted: bool,
        mode: RoomNotificationMode,
        is_one_to_one: bool,
    },
    RoomMention(bool),
    Call(bool),
    InviteForMe(bool),
}

/// Scripted behaviour for the next write, consumed in call order
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteScript {
    pub delay: Duration,
    pub fail: bool,
}

pub struct InMemorySettingsService {
    state: Mutex<RemoteSettingsSnapshot>,
    reads: Mutex<Vec<SettingsOp>>,
    writes: Mutex<Vec<SettingsWrite>>,
    failing: Mutex<HashSet<SettingsOp>>,
    scripts: Mutex<VecDeque<WriteScript>>,
    changes: broadcast::Sender<()>,
}

impl Default for InMemorySettingsService {
    fn default() -> Self {
        Self::from_snapshot(RemoteSettingsSnapshot::default())
    }
}

impl InMemorySettingsService {
    pub fn from_snapshot(snapshot: RemoteSettingsSnapshot) -> Self {
        let (changes, _rx) = broadcast::channel(64);
        Self {
            state: Mutex::new(snapshot),
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            scripts: Mutex::new(VecDeque::new()),
            changes,
        }
    }

    pub fn snapshot(&self) -> RemoteSettingsSnapshot {
        self.state.lock().clone()
    }

    /// Replace the stored settings without recording a write
    pub fn set_snapshot(&self, snapshot: RemoteSettingsSnapshot) {
        *self.state.lock() = snapshot;
    }

    pub fn fail_on(&self, op: SettingsOp) {
        self.failing.lock().insert(op);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    pub fn script_writes(&self, scripts: impl IntoIterator<Item = WriteScript>) {
        self.scripts.lock().extend(scripts);
    }

    pub fn reads(&self) -> Vec<SettingsOp> {
        self.reads.lock().clone()
    }

    pub fn writes(&self) -> Vec<SettingsWrite> {
        self.writes.lock().clone()
    }

    pub fn clear_logs(&self) {
        self.reads.lock().clear();
        self.writes.lock().clear();
    }

    /// Emit a change notification as the homeserver would after a push-rule update
    pub fn notify_change(&self) {
        let _ = self.changes.send(());
    }

    fn read(&self, op: SettingsOp) -> ChimeResult<()> {
        self.reads.lock().push(op);
        if self.failing.lock().contains(&op) {
            return Err(ChimeError::remote(format!("{:?} failed", op)));
        }
        Ok(())
    }

    async fn write(
        &self,
        op: SettingsOp,
        write: SettingsWrite,
        apply: impl FnOnce(&mut RemoteSettingsSnapshot),
    ) -> ChimeResult<()> {
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        self.writes.lock().push(write);
        if script.fail || self.failing.lock().contains(&op) {
            return Err(ChimeError::remote(format!("{:?} failed", op)));
        }
        apply(&mut *self.state.lock());
        self.notify_change();
        Ok(())
    }
}

#[async_trait]
impl NotificationSettingsService for InMemorySettingsService {
    async fn default_room_notification_mode(
        &self,
        is_encrypted: bool,
        is_one_to_one: bool,
    ) -> ChimeResult<RoomNotificationMode> {
        self.read(SettingsOp::GetDefaultMode)?;
        Ok(self.state.lock().mode(is_encrypted, is_one_to_one))
    }

    async fn set_default_room_notification_mode(
        &self,
        is_encrypted: bool,
        mode: RoomNotificationMode,
        is_one_to_one: bool,
    ) -> ChimeResult<()> {
        let write = SettingsWrite::DefaultMode {
            is_encrypted,
            mode,
            is_one_to_one,
        };
        self.write(SettingsOp::SetDefaultMode, write, |s| {
            *s.mode_mut(is_encrypted, is_one_to_one) = mode;
        })
        .await
    }

    async fn is_room_mention_enabled(&self) -> ChimeResult<bool> {
        self.read(SettingsOp::GetRoomMention)?;
        Ok(self.state.lock().room_mention_enabled)
    }

    async fn set_room_mention_enabled(&self, enabled: bool) -> ChimeResult<()> {
        self.write(
            SettingsOp::SetRoomMention,
            SettingsWrite::RoomMention(enabled),
            |s| s.room_mention_enabled = enabled,
        )
        .await
    }

    async fn is_call_enabled(&self) -> ChimeResult<bool> {
        self.read(SettingsOp::GetCall)?;
        Ok(self.state.lock().call_enabled)
    }

    async fn set_call_enabled(&self, enabled: bool) -> ChimeResult<()> {
        self.write(SettingsOp::SetCall, SettingsWrite::Call(enabled), |s| {
            s.call_enabled = enabled
        })
        .await
    }

    async fn is_invite_for_me_enabled(&self) -> ChimeResult<bool> {
        self.read(SettingsOp::GetInviteForMe)?;
        Ok(self.state.lock().invite_for_me_enabled)
    }

    async fn set_invite_for_me_enabled(&self, enabled: bool) -> ChimeResult<()> {
        self.write(
            SettingsOp::SetInviteForMe,
            SettingsWrite::InviteForMe(enabled),
            |s| s.invite_for_me_enabled = enabled,
        )
        .await
    }

    fn subscribe_changes(&self) -> ChangeStream {
        let rx = self.changes.subscribe();
        futures::stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                // a lagged receiver still means "something changed"
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => Some(((), rx)),
                Err(broadcast::error::RecvError::Closed) => None,
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_updates_snapshot_and_log() {
        let service = InMemorySettingsService::default();
        service
            .set_default_room_notification_mode(true, RoomNotificationMode::Mute, false)
            .await
            .unwrap();

        assert_eq!(
            service.snapshot().encrypted_group_mode,
            RoomNotificationMode::Mute
        );
        assert_eq!(
            service.snapshot().group_mode,
            RoomNotificationMode::MentionsAndKeywordsOnly
        );
        assert_eq!(
            service.writes(),
            vec![SettingsWrite::DefaultMode {
                is_encrypted: true,
                mode: RoomNotificationMode::Mute,
                is_one_to_one: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_alone() {
        let service = InMemorySettingsService::default();
        service.fail_on(SettingsOp::SetCall);

        assert!(service.set_call_enabled(false).await.is_err());
        assert!(service.snapshot().call_enabled);
        assert_eq!(service.writes(), vec![SettingsWrite::Call(false)]);
    }

    #[tokio::test]
    async fn test_successful_write_emits_change() {
        let service = InMemorySettingsService::default();
        let mut changes = service.subscribe_changes();

        service.set_room_mention_enabled(false).await.unwrap();
        assert_eq!(changes.next().await, Some(()));
    }
}
