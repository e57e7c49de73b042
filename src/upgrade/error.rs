// ABOUTME: Error types for version resolution and upgrade planning.
// ABOUTME: Planning errors are raised before any mutation of the fleet.

use crate::error::ErrorClass;
use crate::fleet::{FetchError, InventoryError};
use crate::rollout::RolloutError;
use crate::types::Contract;

/// Errors resolving a component's versions and contracts.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Release metadata could not be fetched or parsed.
    #[error("release metadata for provider {component} is unavailable: {source}")]
    MetadataUnavailable {
        component: String,
        #[source]
        source: FetchError,
    },

    /// The version lies outside every published release series.
    #[error("version {version} of provider {component} does not match any release series")]
    NoMatchingReleaseSeries { component: String, version: String },
}

impl ResolveError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ResolveError::MetadataUnavailable { source, .. } => source.class(),
            ResolveError::NoMatchingReleaseSeries { .. } => ErrorClass::Configuration,
        }
    }
}

/// Errors building or validating an upgrade plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid fleet: there should be exactly one core provider, found {found}")]
    NotExactlyOneCore { found: usize },

    #[error("unable to resolve the core provider: {source}")]
    CoreMetadata {
        #[source]
        source: ResolveError,
    },

    #[error("invalid metadata: no contract found for the core provider {component}")]
    NoUpgradeTargets { component: String },

    #[error("this release can only upgrade to the {supported} contract, requested {requested}")]
    UnsupportedContract {
        supported: Contract,
        requested: Contract,
    },

    #[error("unable to complete the upgrade: provider {component} is not part of the fleet")]
    UnknownProvider { component: String },

    #[error("unable to complete the upgrade: provider {component} is requested more than once")]
    DuplicateRequest { component: String },

    #[error(
        "unable to complete the upgrade: the target version of provider {component} supports the {contract} contract, while the fleet is moving to {target}"
    )]
    ContractMismatch {
        component: String,
        contract: Contract,
        target: Contract,
    },

    #[error(
        "unable to complete the upgrade: provider {component} supports the {contract} contract, while the fleet is moving to {target}; include {component} in the upgrade"
    )]
    LaggingProvider {
        component: String,
        contract: Contract,
        target: Contract,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to read the inventory: {0}")]
    Inventory(#[from] InventoryError),
}

impl PlanError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PlanError::CoreMetadata { source } | PlanError::Resolve(source) => source.class(),
            PlanError::Inventory(_) => ErrorClass::Fatal,
            _ => ErrorClass::Configuration,
        }
    }
}

/// Errors from planning followed by a rollout.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),
}

impl UpgradeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            UpgradeError::Plan(e) => e.class(),
            UpgradeError::Rollout(e) => e.class(),
        }
    }
}
