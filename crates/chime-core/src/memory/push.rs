use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{ChimeError, ChimeResult};
use crate::models::{Distributor, PushProvider};
use crate::services::PushService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default)]
    pub distributors: Vec<Distributor>,
}

/// Which provider/distributor the device is registered with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub provider: String,
    pub distributor: Distributor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSnapshot {
    pub providers: Vec<ProviderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
}

impl Default for PushSnapshot {
    fn default() -> Self {
        let firebase = Distributor::new("firebase", "Firebase");
        Self {
            providers: vec![
                ProviderSpec {
                    name: "Firebase".to_string(),
                    distributors: vec![firebase.clone()],
                },
                ProviderSpec {
                    name: "UnifiedPush".to_string(),
                    distributors: vec![
                        Distributor::new("io.heckel.ntfy", "ntfy"),
                        Distributor::new("org.unifiedpush.distributor.nextpush", "NextPush"),
                    ],
                },
            ],
            registration: Some(Registration {
                provider: "Firebase".to_string(),
                distributor: firebase,
            }),
        }
    }
}

pub struct InMemoryPushService {
    providers: Vec<ProviderSpec>,
    registration: Mutex<Option<Registration>>,
    register_calls: Mutex<Vec<(PushProvider, Distributor)>>,
    distributor_queries: AtomicUsize,
    fail_register: AtomicBool,
    register_delay: Mutex<Duration>,
    lookup_delay: Mutex<Duration>,
    /// When set, a successful registration lands on this distributor instead
    diverted_to: Mutex<Option<Distributor>>,
}

impl Default for InMemoryPushService {
    fn default() -> Self {
        Self::from_snapshot(PushSnapshot::default())
    }
}

impl InMemoryPushService {
    pub fn from_snapshot(snapshot: PushSnapshot) -> Self {
        Self {
            providers: snapshot.providers,
            registration: Mutex::new(snapshot.registration),
            register_calls: Mutex::new(Vec::new()),
            distributor_queries: AtomicUsize::new(0),
            fail_register: AtomicBool::new(false),
            register_delay: Mutex::new(Duration::ZERO),
            lookup_delay: Mutex::new(Duration::ZERO),
            diverted_to: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> PushSnapshot {
        PushSnapshot {
            providers: self.providers.clone(),
            registration: self.registration.lock().clone(),
        }
    }

    pub fn set_registration(&self, registration: Option<Registration>) {
        *self.registration.lock() = registration;
    }

    pub fn set_fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn set_register_delay(&self, delay: Duration) {
        *self.register_delay.lock() = delay;
    }

    /// Stall every active-distributor lookup by `delay`
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = delay;
    }

    pub fn divert_registrations_to(&self, distributor: Option<Distributor>) {
        *self.diverted_to.lock() = distributor;
    }

    pub fn register_calls(&self) -> Vec<(PushProvider, Distributor)> {
        self.register_calls.lock().clone()
    }

    /// Number of times the active distributor was asked for
    pub fn distributor_queries(&self) -> usize {
        self.distributor_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushService for InMemoryPushService {
    fn available_providers(&self) -> Vec<(PushProvider, Vec<Distributor>)> {
        self.providers
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let provider = PushProvider {
                    index,
                    name: spec.name.clone(),
                };
                (provider, spec.distributors.clone())
            })
            .collect()
    }

    async fn active_provider(&self) -> Option<PushProvider> {
        let registration = self.registration.lock().clone()?;
        let index = self
            .providers
            .iter()
            .position(|p| p.name == registration.provider)?;
        Some(PushProvider {
            index,
            name: registration.provider,
        })
    }

    async fn active_distributor(&self, provider: &PushProvider) -> Option<Distributor> {
        self.distributor_queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.registration
            .lock()
            .as_ref()
            .filter(|r| r.provider == provider.name)
            .map(|r| r.distributor.clone())
    }

    async fn register(
        &self,
        provider: &PushProvider,
        distributor: &Distributor,
    ) -> ChimeResult<()> {
        self.register_calls
            .lock()
            .push((provider.clone(), distributor.clone()));

        let delay = *self.register_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_register.load(Ordering::SeqCst) {
            return Err(ChimeError::push(format!(
                "{} rejected {}",
                provider.name, distributor.name
            )));
        }

        let landed = self
            .diverted_to
            .lock()
            .clone()
            .unwrap_or_else(|| distributor.clone());
        *self.registration.lock() = Some(Registration {
            provider: provider.name.clone(),
            distributor: landed,
        });
        Ok(())
    }
}
