// ABOUTME: Inventory trait holding the installed component records of a fleet.
// ABOUTME: Records installs atomically per component.

use async_trait::async_trait;
use semver::Version;

use crate::types::{Component, ComponentKind, ComponentRef, Contract};

/// The fleet's record of installed components.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// All installed components.
    async fn list(&self) -> Result<Vec<Component>, InventoryError>;

    /// Fail if any component of this kind is installed more than once.
    async fn check_single_instance(&self, kind: ComponentKind) -> Result<(), InventoryError>;

    /// Record a new installed version and contract for a component.
    async fn record_install(
        &self,
        component: &ComponentRef,
        version: &Version,
        contract: &Contract,
    ) -> Result<(), InventoryError>;
}

/// Errors from the inventory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InventoryError {
    #[error("{kind} {name} is installed {count} times (namespaces: {namespaces})")]
    MultipleInstances {
        kind: ComponentKind,
        name: String,
        count: usize,
        namespaces: String,
    },

    #[error("provider {0} is not part of the inventory")]
    NotFound(String),

    #[error("inventory unavailable: {0}")]
    Unavailable(String),
}
