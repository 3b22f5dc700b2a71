use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::error::ChimeError;
use crate::memory::{
    InMemoryPushService, InMemorySettingsService, Registration, RemoteSettingsSnapshot,
    SettingsOp, SettingsWrite, StaticSystemStatus, WriteScript,
};
use crate::models::Distributor;
use crate::store::UserPushStore;

use crate::models::RoomNotificationMode::{AllMessages, MentionsAndKeywordsOnly, Mute};

struct Harness {
    settings: Arc<InMemorySettingsService>,
    push: Arc<InMemoryPushService>,
    device: Arc<UserPushStore>,
    system: Arc<StaticSystemStatus>,
    reconciler: NotificationSettingsReconciler,
}

fn harness_with(snapshot: RemoteSettingsSnapshot) -> Harness {
    let settings = Arc::new(InMemorySettingsService::from_snapshot(snapshot));
    let push = Arc::new(InMemoryPushService::default());
    let device = Arc::new(UserPushStore::in_memory(true));
    let system = Arc::new(StaticSystemStatus::new(true));
    let reconciler = NotificationSettingsReconciler::new(
        CoreConfig::default(),
        settings.clone(),
        push.clone(),
        device.clone(),
        system.clone(),
    );
    Harness {
        settings,
        push,
        device,
        system,
        reconciler,
    }
}

fn harness() -> Harness {
    harness_with(RemoteSettingsSnapshot::default())
}

fn snapshot(
    group: RoomNotificationMode,
    encrypted_group: RoomNotificationMode,
    one_to_one: RoomNotificationMode,
    encrypted_one_to_one: RoomNotificationMode,
) -> RemoteSettingsSnapshot {
    RemoteSettingsSnapshot {
        group_mode: group,
        encrypted_group_mode: encrypted_group,
        one_to_one_mode: one_to_one,
        encrypted_one_to_one_mode: encrypted_one_to_one,
        ..RemoteSettingsSnapshot::default()
    }
}

fn is_toggle_read(op: &SettingsOp) -> bool {
    matches!(
        op,
        SettingsOp::GetCall | SettingsOp::GetRoomMention | SettingsOp::GetInviteForMe
    )
}

/// Let spawned tasks run without reaching the debounce window
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn choice(h: &Harness, name: &str) -> DistributorChoice {
    h.reconciler
        .list_available_distributors()
        .into_iter()
        .find(|c| c.distributor.name == name)
        .unwrap()
}

// ===== fetch =====

#[tokio::test]
async fn test_matching_pairs_yield_valid_with_encrypted_modes() {
    let toggles = [(true, true, true), (false, true, false), (true, false, false)];
    for group in RoomNotificationMode::ALL {
        for one_to_one in RoomNotificationMode::ALL {
            for (at_room, call, invite) in toggles {
                let h = harness_with(RemoteSettingsSnapshot {
                    room_mention_enabled: at_room,
                    call_enabled: call,
                    invite_for_me_enabled: invite,
                    ..snapshot(group, group, one_to_one, one_to_one)
                });

                h.reconciler.fetch_settings().await.unwrap();

                assert_eq!(
                    h.reconciler.state().matrix_settings,
                    MatrixSettings::Valid {
                        at_room_enabled: at_room,
                        call_enabled: call,
                        invite_for_me_enabled: invite,
                        default_group_mode: group,
                        default_one_to_one_mode: one_to_one,
                    }
                );
            }
        }
    }
}

#[tokio::test]
async fn test_any_mismatch_yields_invalid_without_toggle_reads() {
    for group in RoomNotificationMode::ALL {
        for encrypted_group in RoomNotificationMode::ALL {
            for one_to_one in RoomNotificationMode::ALL {
                for encrypted_one_to_one in RoomNotificationMode::ALL {
                    if group == encrypted_group && one_to_one == encrypted_one_to_one {
                        continue;
                    }
                    let h = harness_with(RemoteSettingsSnapshot {
                        call_enabled: false,
                        ..snapshot(group, encrypted_group, one_to_one, encrypted_one_to_one)
                    });

                    h.reconciler.fetch_settings().await.unwrap();

                    assert_eq!(
                        h.reconciler.state().matrix_settings,
                        MatrixSettings::Invalid { fix_failed: false }
                    );
                    assert!(!h.settings.reads().iter().any(is_toggle_read));
                }
            }
        }
    }
}

#[tokio::test]
async fn test_read_failure_keeps_previous_settings() {
    let h = harness();
    h.reconciler.fetch_settings().await.unwrap();
    let before = h.reconciler.state().matrix_settings;
    assert!(before.is_valid());

    h.settings.set_snapshot(RemoteSettingsSnapshot {
        call_enabled: false,
        ..RemoteSettingsSnapshot::default()
    });
    h.settings.fail_on(SettingsOp::GetInviteForMe);

    let result = h.reconciler.fetch_settings().await;
    assert!(matches!(result, Err(ChimeError::Remote { .. })));
    assert_eq!(h.reconciler.state().matrix_settings, before);
}

#[tokio::test]
async fn test_mode_read_failure_never_publishes() {
    let h = harness();
    h.settings.fail_on(SettingsOp::GetDefaultMode);

    assert!(h.reconciler.fetch_settings().await.is_err());
    assert_eq!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Uninitialized
    );
}

// ===== mismatch fix =====

#[tokio::test]
async fn test_fix_without_mismatch_writes_nothing() {
    let h = harness();
    h.reconciler.fetch_settings().await.unwrap();
    let before = h.reconciler.state();

    h.reconciler.fix_configuration_mismatch().await.unwrap();

    assert!(h.settings.writes().is_empty());
    assert_eq!(h.reconciler.state(), before);
}

#[tokio::test]
async fn test_fix_group_mismatch_targets_encrypted_side() {
    let h = harness_with(snapshot(Mute, MentionsAndKeywordsOnly, AllMessages, AllMessages));

    h.reconciler.fix_configuration_mismatch().await.unwrap();

    assert_eq!(
        h.settings.writes(),
        vec![SettingsWrite::DefaultMode {
            is_encrypted: true,
            mode: AllMessages,
            is_one_to_one: false,
        }]
    );
}

#[tokio::test]
async fn test_fix_group_mismatch_targets_unencrypted_side() {
    let h = harness_with(snapshot(Mute, AllMessages, AllMessages, AllMessages));
    h.reconciler.fetch_settings().await.unwrap();
    let before = h.reconciler.state();

    h.reconciler.fix_configuration_mismatch().await.unwrap();

    assert_eq!(
        h.settings.writes(),
        vec![SettingsWrite::DefaultMode {
            is_encrypted: false,
            mode: AllMessages,
            is_one_to_one: false,
        }]
    );
    // no optimistic update
    assert_eq!(h.reconciler.state(), before);

    h.reconciler.fetch_settings().await.unwrap();
    assert!(h.reconciler.state().matrix_settings.is_valid());
}

#[tokio::test]
async fn test_fix_handles_both_categories() {
    let h = harness_with(snapshot(Mute, AllMessages, MentionsAndKeywordsOnly, AllMessages));

    h.reconciler.fix_configuration_mismatch().await.unwrap();

    let writes = h.settings.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[1],
        SettingsWrite::DefaultMode {
            is_encrypted: false,
            mode: AllMessages,
            is_one_to_one: true,
        }
    );
}

#[tokio::test]
async fn test_fix_write_failure_marks_fix_failed() {
    let h = harness_with(snapshot(Mute, MentionsAndKeywordsOnly, AllMessages, AllMessages));
    h.settings.fail_on(SettingsOp::SetDefaultMode);

    let result = h.reconciler.fix_configuration_mismatch().await;

    assert!(result.is_err());
    assert_eq!(h.settings.writes().len(), 1);
    assert_eq!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Invalid { fix_failed: true }
    );
}

#[tokio::test]
async fn test_fix_read_failure_marks_fix_failed() {
    let h = harness();
    h.settings.fail_on(SettingsOp::GetDefaultMode);

    assert!(h.reconciler.fix_configuration_mismatch().await.is_err());
    assert!(h.settings.writes().is_empty());
    assert_eq!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Invalid { fix_failed: true }
    );
}

// ===== change slot =====

#[tokio::test]
async fn test_toggle_success_updates_slot_and_remote() {
    let h = harness();

    h.reconciler.set_at_room_notifications_enabled(false).await;
    h.reconciler.set_invite_for_me_notifications_enabled(false).await;

    assert_eq!(
        h.reconciler.state().change_notification_setting_action,
        AsyncAction::Success(())
    );
    let remote = h.settings.snapshot();
    assert!(!remote.room_mention_enabled);
    assert!(!remote.invite_for_me_enabled);
    assert!(remote.call_enabled);
}

#[tokio::test]
async fn test_toggle_failure_is_scoped_to_slot() {
    let h = harness();
    h.reconciler.fetch_settings().await.unwrap();
    let settings_before = h.reconciler.state().matrix_settings;
    h.settings.fail_on(SettingsOp::SetCall);

    h.reconciler.set_call_notifications_enabled(false).await;

    let state = h.reconciler.state();
    assert!(state.change_notification_setting_action.is_failure());
    assert_eq!(state.matrix_settings, settings_before);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_toggles_last_completion_wins() {
    let h = harness();
    h.settings.script_writes([
        WriteScript {
            delay: Duration::from_millis(50),
            fail: false,
        },
        WriteScript {
            delay: Duration::from_millis(10),
            fail: true,
        },
    ]);

    let probe = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.reconciler.state().change_notification_setting_action
    };
    let ((), (), mid_flight) = tokio::join!(
        h.reconciler.set_call_notifications_enabled(true),
        h.reconciler.set_call_notifications_enabled(false),
        probe,
    );

    // the later-issued write finished first
    assert!(mid_flight.is_failure());
    assert_eq!(
        h.reconciler.state().change_notification_setting_action,
        AsyncAction::Success(())
    );
    assert_eq!(
        h.settings.writes(),
        vec![SettingsWrite::Call(false), SettingsWrite::Call(true)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_toggle_shows_loading_while_in_flight() {
    let h = harness();
    h.settings.script_writes([WriteScript {
        delay: Duration::from_millis(100),
        fail: false,
    }]);

    let probe = async {
        settle().await;
        h.reconciler.state().change_notification_setting_action
    };
    let ((), during) = tokio::join!(h.reconciler.set_call_notifications_enabled(false), probe);

    assert!(during.is_loading());
    assert!(h.reconciler.state().change_notification_setting_action.is_success());
}

#[tokio::test]
async fn test_default_mode_writes_both_variants() {
    let h = harness();

    h.reconciler
        .set_default_room_notification_mode(false, Mute)
        .await;

    assert_eq!(
        h.settings.writes(),
        vec![
            SettingsWrite::DefaultMode {
                is_encrypted: true,
                mode: Mute,
                is_one_to_one: false,
            },
            SettingsWrite::DefaultMode {
                is_encrypted: false,
                mode: Mute,
                is_one_to_one: false,
            },
        ]
    );
    h.reconciler.fetch_settings().await.unwrap();
    assert!(matches!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Valid {
            default_group_mode: Mute,
            ..
        }
    ));
}

#[tokio::test]
async fn test_default_mode_stops_after_first_failure() {
    let h = harness();
    h.settings.fail_on(SettingsOp::SetDefaultMode);

    h.reconciler
        .set_default_room_notification_mode(true, Mute)
        .await;

    assert_eq!(h.settings.writes().len(), 1);
    assert!(h
        .reconciler
        .state()
        .change_notification_setting_action
        .is_failure());
}

// ===== device flag =====

#[tokio::test]
async fn test_device_flag_is_local_only() {
    let h = harness();
    h.reconciler.fetch_settings().await.unwrap();
    let settings_before = h.reconciler.state().matrix_settings;
    let remote_before = h.settings.snapshot();

    h.reconciler.set_notifications_enabled(false);

    assert!(!h.device.is_enabled());
    assert!(h.settings.writes().is_empty());
    assert_eq!(h.settings.snapshot(), remote_before);
    assert_eq!(h.reconciler.state().matrix_settings, settings_before);
    assert!(h
        .reconciler
        .state()
        .change_notification_setting_action
        .is_uninitialized());
}

#[tokio::test(start_paused = true)]
async fn test_device_flag_is_mirrored_after_start() {
    let h = harness();
    h.reconciler.start();
    settle().await;

    h.reconciler.set_notifications_enabled(false);
    settle().await;

    assert!(!h.reconciler.state().app_settings.app_notifications_enabled);
}

#[tokio::test]
async fn test_device_flag_refresh_without_start() {
    let h = harness();
    h.reconciler.set_notifications_enabled(false);
    assert!(h.reconciler.state().app_settings.app_notifications_enabled);

    h.reconciler.refresh_app_notifications_enabled();
    assert!(!h.reconciler.state().app_settings.app_notifications_enabled);
}

#[tokio::test]
async fn test_system_status_is_polled_on_refresh_only() {
    let h = harness();
    h.system.set(false);
    assert!(h.reconciler.state().app_settings.system_notifications_enabled);

    h.reconciler.refresh_system_notifications_enabled();
    assert!(!h.reconciler.state().app_settings.system_notifications_enabled);
}

// ===== distributors =====

#[tokio::test]
async fn test_current_distributor_absent_provider_is_failure() {
    let h = harness();
    h.push.set_registration(None);

    assert_eq!(
        h.reconciler.current_distributor().await,
        AsyncAction::Failure(ChimeError::NoPushProvider)
    );
}

#[tokio::test]
async fn test_current_distributor_reads_registered_name() {
    let h = harness();
    h.push.set_registration(Some(Registration {
        provider: "UnifiedPush".to_string(),
        distributor: Distributor::new("io.heckel.ntfy", "ntfy"),
    }));
    assert_eq!(
        h.reconciler.current_distributor().await,
        AsyncAction::Success("ntfy".to_string())
    );
}

#[tokio::test]
async fn test_change_to_current_distributor_is_noop() {
    let h = harness();
    h.reconciler.refresh_current_distributor().await;
    let before = h.reconciler.state();
    assert_eq!(
        before.current_push_distributor,
        AsyncAction::Success("Firebase".to_string())
    );

    let firebase = choice(&h, "Firebase");
    h.reconciler.change_distributor(Some(firebase)).await;

    assert!(h.push.register_calls().is_empty());
    assert_eq!(h.reconciler.state(), before);
}

#[tokio::test]
async fn test_change_to_absent_choice_only_hides_dialog() {
    let h = harness();
    h.reconciler
        .handle_event(NotificationSettingsEvent::ChangePushProvider);
    assert!(h.reconciler.state().show_change_push_provider_dialog);

    h.reconciler.change_distributor(None).await;

    assert!(!h.reconciler.state().show_change_push_provider_dialog);
    assert!(h.push.register_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_change_distributor_loads_then_rederives_once() {
    let h = harness();
    h.push.set_registration(None);
    h.reconciler.refresh_current_distributor().await;
    assert!(h.reconciler.state().current_push_distributor.is_failure());
    let queries_before = h.push.distributor_queries();
    h.push.set_register_delay(Duration::from_millis(100));

    let ntfy = choice(&h, "ntfy");
    let probe = async {
        settle().await;
        h.reconciler.state().current_push_distributor
    };
    let ((), during) = tokio::join!(h.reconciler.change_distributor(Some(ntfy)), probe);

    assert!(during.is_loading());
    assert_eq!(
        h.reconciler.state().current_push_distributor,
        AsyncAction::Success("ntfy".to_string())
    );
    assert_eq!(h.push.register_calls().len(), 1);
    assert_eq!(h.push.distributor_queries(), queries_before + 1);
}

#[tokio::test(start_paused = true)]
async fn test_earlier_lookup_cannot_replace_loading() {
    let h = harness();
    h.push.set_lookup_delay(Duration::from_millis(30));
    h.push.set_register_delay(Duration::from_millis(100));

    // the initial lookup answers "Firebase" at 30ms, mid-registration
    h.reconciler.start();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let ntfy = choice(&h, "ntfy");
    let during = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.reconciler.state().current_push_distributor
    };
    let ((), during) = tokio::join!(h.reconciler.change_distributor(Some(ntfy)), during);

    assert!(during.is_loading());
    assert_eq!(
        h.reconciler.state().current_push_distributor,
        AsyncAction::Success("ntfy".to_string())
    );
}

#[tokio::test]
async fn test_rederivation_reports_what_was_actually_registered() {
    let h = harness();
    h.push.divert_registrations_to(Some(Distributor::new(
        "org.unifiedpush.distributor.nextpush",
        "NextPush",
    )));

    let ntfy = choice(&h, "ntfy");
    h.reconciler.change_distributor(Some(ntfy)).await;

    assert_eq!(
        h.reconciler.state().current_push_distributor,
        AsyncAction::Success("NextPush".to_string())
    );
}

#[tokio::test]
async fn test_registration_failure_is_carried_in_action() {
    let h = harness();
    h.push.set_fail_register(true);
    let queries_before = h.push.distributor_queries();

    let ntfy = choice(&h, "ntfy");
    h.reconciler.change_distributor(Some(ntfy)).await;

    let current = h.reconciler.state().current_push_distributor;
    assert!(matches!(current, AsyncAction::Failure(ChimeError::Push { .. })));
    assert_eq!(h.push.distributor_queries(), queries_before);
}

#[tokio::test]
async fn test_refresh_distributors_publishes_catalog() {
    let h = harness();
    assert_eq!(h.reconciler.state().available_push_distributors.len(), 3);

    h.reconciler.refresh_distributors();

    let labels: Vec<String> = h
        .reconciler
        .state()
        .available_push_distributors
        .iter()
        .map(|c| c.label())
        .collect();
    assert_eq!(labels[1], "ntfy (UnifiedPush)");
}

// ===== activation =====

#[tokio::test(start_paused = true)]
async fn test_start_fetches_and_derives_distributor() {
    let h = harness();
    h.reconciler.start();
    settle().await;

    let state = h.reconciler.state();
    assert!(state.matrix_settings.is_valid());
    assert_eq!(
        state.current_push_distributor,
        AsyncAction::Success("Firebase".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_change_burst_triggers_single_refetch() {
    let h = harness();
    h.reconciler.start();
    settle().await;
    h.settings.clear_logs();

    for _ in 0..3 {
        h.settings.notify_change();
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    let mode_reads = h
        .settings
        .reads()
        .into_iter()
        .filter(|op| *op == SettingsOp::GetDefaultMode)
        .count();
    assert_eq!(mode_reads, 4);
}

#[tokio::test(start_paused = true)]
async fn test_remote_change_is_picked_up() {
    let h = harness();
    h.reconciler.start();
    settle().await;

    h.settings.set_snapshot(RemoteSettingsSnapshot {
        call_enabled: false,
        ..RemoteSettingsSnapshot::default()
    });
    h.settings.notify_change();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(matches!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Valid {
            call_enabled: false,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_fix_event_converges_through_change_stream() {
    let h = harness_with(snapshot(
        MentionsAndKeywordsOnly,
        MentionsAndKeywordsOnly,
        Mute,
        AllMessages,
    ));
    h.reconciler.start();
    settle().await;
    assert_eq!(
        h.reconciler.state().matrix_settings,
        MatrixSettings::Invalid { fix_failed: false }
    );

    h.reconciler
        .event_sink()
        .send(NotificationSettingsEvent::FixConfigurationMismatch);
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(h.reconciler.state().matrix_settings.is_valid());
}

#[tokio::test(start_paused = true)]
async fn test_events_drive_dialog_and_errors() {
    let h = harness();
    h.reconciler.start();
    settle().await;
    let sink = h.reconciler.state().event_sink;

    sink.send(NotificationSettingsEvent::ChangePushProvider);
    settle().await;
    assert!(h.reconciler.state().show_change_push_provider_dialog);

    sink.send(NotificationSettingsEvent::SetPushProvider(2));
    settle().await;
    let state = h.reconciler.state();
    assert!(!state.show_change_push_provider_dialog);
    assert_eq!(
        state.current_push_distributor,
        AsyncAction::Success("NextPush".to_string())
    );

    h.settings.fail_on(SettingsOp::SetRoomMention);
    sink.send(NotificationSettingsEvent::SetAtRoomNotificationsEnabled(false));
    settle().await;
    assert!(h
        .reconciler
        .state()
        .change_notification_setting_action
        .is_failure());

    sink.send(NotificationSettingsEvent::ClearNotificationChangeError);
    sink.send(NotificationSettingsEvent::ClearConfigurationMismatchError);
    h.system.set(false);
    sink.send(NotificationSettingsEvent::RefreshSystemNotificationsEnabled);
    settle().await;
    let state = h.reconciler.state();
    assert!(state.change_notification_setting_action.is_uninitialized());
    assert_eq!(
        state.matrix_settings,
        MatrixSettings::Invalid { fix_failed: false }
    );
    assert!(!state.app_settings.system_notifications_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_selection_registers_nothing() {
    let h = harness();
    h.reconciler.start();
    settle().await;

    h.reconciler
        .handle_event(NotificationSettingsEvent::SetPushProvider(42));
    settle().await;

    assert!(h.push.register_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_activation() {
    let h = harness();
    h.reconciler.start();
    settle().await;
    let sink = h.reconciler.event_sink();
    let settings = h.settings.clone();

    drop(h);
    settle().await;

    assert!(sink.is_closed());
    settings.clear_logs();
    settings.notify_change();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(settings.reads().is_empty());
}

#[tokio::test]
async fn test_second_start_is_ignored() {
    let h = harness();
    h.reconciler.start();
    h.reconciler.start();
    h.reconciler.shutdown();
    assert!(h.reconciler.is_shut_down());
}
