use async_trait::async_trait;

use crate::error::ChimeResult;
use crate::models::{Distributor, PushProvider};

/// Push provider discovery and device registration
#[async_trait]
pub trait PushService: Send + Sync {
    /// Providers in priority order, each with the distributors it can use
    fn available_providers(&self) -> Vec<(PushProvider, Vec<Distributor>)>;

    /// Provider the device is currently registered with, if any
    async fn active_provider(&self) -> Option<PushProvider>;

    /// Distributor the given provider is currently registered through
    async fn active_distributor(&self, provider: &PushProvider) -> Option<Distributor>;

    async fn register(&self, provider: &PushProvider, distributor: &Distributor)
        -> ChimeResult<()>;
}
