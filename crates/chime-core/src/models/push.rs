use serde::{Deserialize, Serialize};

/// A vendor push backend known to the push service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushProvider {
    /// Stable position among the registered providers
    pub index: usize,
    pub name: String,
}

/// A delivery transport offered by a [`PushProvider`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Distributor {
    /// Identifier used when registering (e.g. an app id)
    pub value: String,
    /// Human readable name, also used to tell distributors apart
    pub name: String,
}

impl Distributor {
    pub fn new(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: name.into(),
        }
    }
}

/// One selectable entry of the flattened distributor catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributorChoice {
    pub provider: PushProvider,
    pub distributor: Distributor,
}

impl DistributorChoice {
    /// Label shown in selection dialogs
    pub fn label(&self) -> String {
        format!("{} ({})", self.distributor.name, self.provider.name)
    }
}
