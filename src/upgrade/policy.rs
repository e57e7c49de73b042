// ABOUTME: Contract policy of this engine release.
// ABOUTME: Names the one contract rollouts may target and the legacy contract.

use serde::Deserialize;

use crate::types::Contract;

/// Contracts this release of the engine knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractPolicy {
    /// The single contract rollouts may move a fleet to.
    #[serde(default = "default_supported")]
    pub supported: Contract,

    /// Contract that cannot address multiple instances of one provider.
    #[serde(default = "default_legacy")]
    pub legacy: Contract,
}

fn default_supported() -> Contract {
    Contract::new("v1alpha4")
}

fn default_legacy() -> Contract {
    Contract::new("v1alpha3")
}

impl Default for ContractPolicy {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            legacy: default_legacy(),
        }
    }
}

impl ContractPolicy {
    pub fn is_supported(&self, contract: &Contract) -> bool {
        &self.supported == contract
    }

    pub fn is_legacy(&self, contract: &Contract) -> bool {
        &self.legacy == contract
    }
}
