//! In-process collaborators.
//!
//! Deterministic stand-ins for the remote settings service, the push
//! registration service and the OS permission check. They keep a log of what
//! was asked of them, can be told to fail or to stall, and round-trip through
//! serde so a sandbox backend can be persisted between runs.

pub mod push;
pub mod settings;
pub mod system;

pub use push::{InMemoryPushService, ProviderSpec, PushSnapshot, Registration};
pub use settings::{
    InMemorySettingsService, RemoteSettingsSnapshot, SettingsOp, SettingsWrite, WriteScript,
};
pub use system::StaticSystemStatus;
