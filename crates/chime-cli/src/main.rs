use std::path::PathBuf;

use anyhow::Result;
use chime_cli::cli::{run_command, CliCommand, CliConfig, Switch};
use chime_core::RoomNotificationMode;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chime-cli")]
#[command(about = "Inspect and change notification settings against a local sandbox")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (contains dataDir, changeDebounceMs, logFilter)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current notification settings
    Show,

    /// Enable or disable call notifications
    SetCall {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Enable or disable @room notifications
    SetAtRoom {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Enable or disable notifications for invites
    SetInvite {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Enable or disable notifications on this device only
    SetDevice {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Simulate the OS notification permission being granted or revoked
    SetSystem {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Set the default mode for group or one-to-one rooms
    SetDefaultMode {
        /// all_messages, mentions_and_keywords_only or mute
        mode: RoomNotificationMode,
        /// Apply to one-to-one rooms instead of groups
        #[arg(long)]
        one_to_one: bool,
    },

    /// Realign encrypted and unencrypted default modes
    FixMismatch,

    /// List the push distributors that can be selected
    ListDistributors,

    /// Register with the distributor at the given index
    SelectDistributor {
        index: usize,
    },
}

impl From<Commands> for CliCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Show => CliCommand::Show,
            Commands::SetCall { state } => CliCommand::SetCall(state),
            Commands::SetAtRoom { state } => CliCommand::SetAtRoom(state),
            Commands::SetInvite { state } => CliCommand::SetInvite(state),
            Commands::SetDevice { state } => CliCommand::SetDevice(state),
            Commands::SetSystem { state } => CliCommand::SetSystem(state),
            Commands::SetDefaultMode { mode, one_to_one } => CliCommand::SetDefaultMode {
                is_one_to_one: one_to_one,
                mode,
            },
            Commands::FixMismatch => CliCommand::FixMismatch,
            Commands::ListDistributors => CliCommand::ListDistributors,
            Commands::SelectDistributor { index } => CliCommand::SelectDistributor(index),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CliConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        },
        None => CliConfig::default(),
    };

    if let Err(e) = chime_core::tracing_setup::init_tracing_with_default(config.log_filter()) {
        eprintln!("Warning: Failed to initialize logging: {:#}", e);
    }

    if let Err(e) = run(cli.command.into(), cli.pretty, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: CliCommand, pretty: bool, config: &CliConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(run_command(config, command))?;
    if pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
