mod commands;
mod config;
mod sandbox;

pub use commands::{run_command, CliCommand, Switch};
pub use config::CliConfig;
pub use sandbox::SandboxBackend;
