use std::sync::Arc;

use anyhow::{bail, Result};
use chime_core::{NotificationSettingsReconciler, RoomNotificationMode, UserPushStore};
use clap::ValueEnum;
use serde_json::{json, Value};
use tracing::debug;

use super::config::CliConfig;
use super::sandbox::SandboxBackend;

/// On/off argument for the toggle commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(switch: Switch) -> bool {
        matches!(switch, Switch::On)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Print the current settings snapshot
    Show,
    SetCall(Switch),
    SetAtRoom(Switch),
    SetInvite(Switch),
    /// Per-device push flag, stored locally
    SetDevice(Switch),
    /// Flip the sandbox's OS-level notification permission
    SetSystem(Switch),
    SetDefaultMode {
        is_one_to_one: bool,
        mode: RoomNotificationMode,
    },
    FixMismatch,
    ListDistributors,
    SelectDistributor(usize),
}

/// Run one command against the sandbox backend stored in the data dir.
///
/// Returns the JSON document to print. The sandbox is saved afterwards so
/// the next invocation sees the writes this one made.
pub async fn run_command(config: &CliConfig, command: CliCommand) -> Result<Value> {
    let core_config = config.core_config();
    let data_dir = core_config.data_dir.clone();

    let mut backend = SandboxBackend::load(&data_dir)?;
    if let CliCommand::SetSystem(switch) = command {
        backend.system_notifications_enabled = switch.into();
    }
    let services = backend.services();

    let reconciler = NotificationSettingsReconciler::new(
        core_config,
        services.settings.clone(),
        services.push.clone(),
        Arc::new(UserPushStore::new(&data_dir)),
        services.system.clone(),
    );
    let output = execute(&reconciler, command).await;
    reconciler.shutdown();
    let output = output?;

    services
        .snapshot(backend.system_notifications_enabled)
        .save(&data_dir)?;
    Ok(output)
}

/// Load the current view, apply `command` and render the result
async fn execute(
    reconciler: &NotificationSettingsReconciler,
    command: CliCommand,
) -> Result<Value> {
    let _ = reconciler.fetch_settings().await;
    reconciler.refresh_current_distributor().await;

    debug!(?command, "Running command");
    let mut reread_settings = true;
    match command {
        CliCommand::Show | CliCommand::SetSystem(_) => {}
        CliCommand::SetCall(switch) => {
            reconciler
                .set_call_notifications_enabled(switch.into())
                .await;
        }
        CliCommand::SetAtRoom(switch) => {
            reconciler
                .set_at_room_notifications_enabled(switch.into())
                .await;
        }
        CliCommand::SetInvite(switch) => {
            reconciler
                .set_invite_for_me_notifications_enabled(switch.into())
                .await;
        }
        CliCommand::SetDevice(switch) => {
            reconciler.set_notifications_enabled(switch.into());
        }
        CliCommand::SetDefaultMode {
            is_one_to_one,
            mode,
        } => {
            reconciler
                .set_default_room_notification_mode(is_one_to_one, mode)
                .await;
        }
        CliCommand::FixMismatch => {
            // a re-read would turn `fix_failed` back into a plain mismatch
            reread_settings = reconciler.fix_configuration_mismatch().await.is_ok();
        }
        CliCommand::ListDistributors => {
            let choices: Vec<Value> = reconciler
                .list_available_distributors()
                .iter()
                .enumerate()
                .map(|(index, choice)| {
                    json!({
                        "index": index,
                        "label": choice.label(),
                        "provider": choice.provider.name,
                        "distributor": choice.distributor.value,
                    })
                })
                .collect();
            return Ok(Value::Array(choices));
        }
        CliCommand::SelectDistributor(index) => {
            let available = reconciler.list_available_distributors().len();
            if index >= available {
                bail!(
                    "No distributor at index {} ({} available)",
                    index,
                    available
                );
            }
            reconciler.select_distributor(index).await;
        }
    }

    // Writes publish nothing optimistically, so read back what the backend holds
    if reread_settings {
        let _ = reconciler.fetch_settings().await;
    }
    reconciler.refresh_app_notifications_enabled();
    reconciler.refresh_system_notifications_enabled();

    Ok(serde_json::to_value(reconciler.state())?)
}
