// ABOUTME: Rollout error types with SNAFU pattern.
// ABOUTME: Every failure names the phase it stopped in and, when known, the component.

use snafu::Snafu;

use super::drain::DrainError;
use crate::error::ErrorClass;
use crate::fleet::{FetchError, InventoryError, StoreError};
use crate::types::{Contract, NamespaceName};

/// Failure while applying an upgrade plan.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RolloutError {
    #[snafu(display(
        "guard: the {contract} contract does not support multiple instances of a provider: {source}"
    ))]
    MultipleInstancesNotSupported {
        contract: Contract,
        source: InventoryError,
    },

    #[snafu(display("guard: failed to check provider instances: {source}"))]
    InventoryCheck { source: InventoryError },

    #[snafu(display("drain: failed to scale down provider {component}: {source}"))]
    Drain {
        component: String,
        source: DrainError,
    },

    #[snafu(display("replace: failed to fetch {component} {version}: {source}"))]
    ComponentFetch {
        component: String,
        version: String,
        source: FetchError,
    },

    #[snafu(display("replace: failed to delete provider {component}: {source}"))]
    Delete {
        component: String,
        source: StoreError,
    },

    #[snafu(display("replace: failed to install {component} {version}: {source}"))]
    Install {
        component: String,
        version: String,
        source: StoreError,
    },

    #[snafu(display("replace: failed to record {component} {version} in the inventory: {source}"))]
    RecordInstall {
        component: String,
        version: String,
        source: InventoryError,
    },

    #[snafu(display("cleanup: failed to delete namespace {namespace}: {source}"))]
    WebhookCleanup {
        namespace: NamespaceName,
        source: StoreError,
    },
}

/// Stage of a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutPhase {
    /// Pre-flight checks, before any mutation.
    Guard,
    /// Scaling every pending component to zero replicas.
    Drain,
    /// Deleting and reinstalling pending components.
    Replace,
    /// Removing objects the new contract no longer uses.
    Cleanup,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutErrorKind {
    /// A legacy contract found a provider installed more than once.
    MultipleInstances,
    /// The inventory could not be read.
    InventoryUnavailable,
    /// A unit kept running replicas or could not be written.
    DrainFailed,
    /// Packaged components could not be fetched.
    FetchFailed,
    /// Old objects could not be deleted.
    DeleteFailed,
    /// New objects could not be installed or recorded.
    InstallFailed,
    /// The obsolete namespace could not be deleted.
    CleanupFailed,
}

impl RolloutError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RolloutErrorKind {
        match self {
            RolloutError::MultipleInstancesNotSupported { .. } => {
                RolloutErrorKind::MultipleInstances
            }
            RolloutError::InventoryCheck { .. } => RolloutErrorKind::InventoryUnavailable,
            RolloutError::Drain { .. } => RolloutErrorKind::DrainFailed,
            RolloutError::ComponentFetch { .. } => RolloutErrorKind::FetchFailed,
            RolloutError::Delete { .. } => RolloutErrorKind::DeleteFailed,
            RolloutError::Install { .. } | RolloutError::RecordInstall { .. } => {
                RolloutErrorKind::InstallFailed
            }
            RolloutError::WebhookCleanup { .. } => RolloutErrorKind::CleanupFailed,
        }
    }

    /// The phase the rollout stopped in.
    pub fn phase(&self) -> RolloutPhase {
        match self {
            RolloutError::MultipleInstancesNotSupported { .. }
            | RolloutError::InventoryCheck { .. } => RolloutPhase::Guard,
            RolloutError::Drain { .. } => RolloutPhase::Drain,
            RolloutError::ComponentFetch { .. }
            | RolloutError::Delete { .. }
            | RolloutError::Install { .. }
            | RolloutError::RecordInstall { .. } => RolloutPhase::Replace,
            RolloutError::WebhookCleanup { .. } => RolloutPhase::Cleanup,
        }
    }

    /// Instance name of the component being processed, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            RolloutError::Drain { component, .. }
            | RolloutError::ComponentFetch { component, .. }
            | RolloutError::Delete { component, .. }
            | RolloutError::Install { component, .. }
            | RolloutError::RecordInstall { component, .. } => Some(component),
            RolloutError::MultipleInstancesNotSupported { source, .. } => match source {
                InventoryError::MultipleInstances { name, .. } => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.phase() {
            RolloutPhase::Guard => match self {
                RolloutError::InventoryCheck { .. } => ErrorClass::Fatal,
                _ => ErrorClass::Configuration,
            },
            RolloutPhase::Drain => ErrorClass::Fatal,
            RolloutPhase::Replace => match self {
                RolloutError::ComponentFetch { source, .. } => source.class(),
                _ => ErrorClass::Mutation,
            },
            RolloutPhase::Cleanup => ErrorClass::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_phase() {
        let err = RolloutError::Delete {
            component: "capi-system/cluster-api".to_string(),
            source: StoreError::Rejected("forbidden".to_string()),
        };
        assert_eq!(err.phase(), RolloutPhase::Replace);
        assert_eq!(err.kind(), RolloutErrorKind::DeleteFailed);
        assert_eq!(err.class(), ErrorClass::Mutation);
        assert_eq!(err.component(), Some("capi-system/cluster-api"));
        assert!(err.to_string().starts_with("replace: "));
        assert!(err.to_string().contains("capi-system/cluster-api"));
    }
}
