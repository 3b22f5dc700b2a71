use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::ReconcilerCore;
use crate::error::ChimeError;
use crate::models::{AsyncAction, DistributorChoice};
use crate::services::PushService;

/// Flattened `(provider, distributor)` list, computed on first use.
///
/// Providers rarely change during an activation, so the list is kept until
/// someone calls [`DistributorCatalog::invalidate`].
#[derive(Default)]
pub(crate) struct DistributorCatalog {
    cached: Mutex<Option<Vec<DistributorChoice>>>,
}

impl DistributorCatalog {
    pub(crate) fn get(&self, push: &dyn PushService) -> Vec<DistributorChoice> {
        self.cached
            .lock()
            .get_or_insert_with(|| flatten(push))
            .clone()
    }

    pub(crate) fn invalidate(&self) {
        self.cached.lock().take();
    }
}

fn flatten(push: &dyn PushService) -> Vec<DistributorChoice> {
    push.available_providers()
        .into_iter()
        .flat_map(|(provider, distributors)| {
            distributors
                .into_iter()
                .map(move |distributor| DistributorChoice {
                    provider: provider.clone(),
                    distributor,
                })
        })
        .collect()
}

impl ReconcilerCore {
    pub(crate) fn list_available(&self) -> Vec<DistributorChoice> {
        self.catalog.get(self.push.as_ref())
    }

    /// Drop the memoized catalog, rebuild it and publish it in the snapshot
    pub(crate) fn refresh_distributors(&self) {
        self.catalog.invalidate();
        let choices = self.list_available();
        debug!(count = choices.len(), "Refreshed push distributor catalog");
        self.state
            .update(|s| s.available_push_distributors = choices);
    }

    /// Ask the active provider which distributor it is registered through
    pub(crate) async fn current_distributor(&self) -> AsyncAction<String> {
        let Some(provider) = self.push.active_provider().await else {
            return AsyncAction::Failure(ChimeError::NoPushProvider);
        };
        match self.push.active_distributor(&provider).await {
            Some(distributor) => AsyncAction::Success(distributor.name),
            None => AsyncAction::Failure(ChimeError::NoDistributor {
                provider: provider.name,
            }),
        }
    }

    /// Re-derive the current distributor and publish it, unless a newer
    /// refresh was requested while this one was in flight.
    pub(crate) async fn refresh_current_distributor(&self) {
        let token = self.refresh_token.load(Ordering::SeqCst);
        let current = self.current_distributor().await;
        if self.refresh_token.load(Ordering::SeqCst) != token {
            debug!(token, "Discarding stale push distributor lookup");
            return;
        }
        if let AsyncAction::Failure(e) = &current {
            warn!(error = %e, "No current push distributor");
        }
        self.state.update(|s| s.current_push_distributor = current);
    }

    pub(crate) async fn change_distributor(&self, choice: Option<DistributorChoice>) {
        self.state
            .update(|s| s.show_change_push_provider_dialog = false);

        let Some(choice) = choice else {
            return;
        };

        let current = self.state.snapshot().current_push_distributor;
        if current.data() == Some(&choice.distributor.name) {
            debug!(distributor = %choice.distributor.name, "Distributor already active");
            return;
        }

        // lookups started before this point must not replace `Loading`
        self.refresh_token.fetch_add(1, Ordering::SeqCst);
        self.state
            .update(|s| s.current_push_distributor = AsyncAction::Loading);

        match self
            .push
            .register(&choice.provider, &choice.distributor)
            .await
        {
            Ok(()) => {
                info!(
                    provider = %choice.provider.name,
                    distributor = %choice.distributor.name,
                    "Registered with push distributor"
                );
                self.state.update(|s| {
                    s.current_push_distributor =
                        AsyncAction::Success(choice.distributor.name.clone())
                });
                // what the provider reports wins over what we asked for
                self.refresh_token.fetch_add(1, Ordering::SeqCst);
                self.refresh_current_distributor().await;
            }
            Err(e) => {
                warn!(
                    provider = %choice.provider.name,
                    distributor = %choice.distributor.name,
                    error = %e,
                    "Push registration failed"
                );
                self.state
                    .update(|s| s.current_push_distributor = AsyncAction::Failure(e));
            }
        }
    }

    pub(crate) async fn select_distributor(&self, index: usize) {
        let choice = self.list_available().get(index).cloned();
        if choice.is_none() {
            debug!(index, "Distributor index out of range");
        }
        self.change_distributor(choice).await;
    }
}
