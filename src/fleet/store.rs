// ABOUTME: Deployable-unit store trait: list, get, update, delete and create units.
// ABOUTME: Units are replica-scaled workloads owned by a component.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::releases::ComponentBundle;
use crate::rollout::Retryable;
use crate::types::{ComponentRef, NamespaceName, UnitName};

/// Label marking units managed by fleetup.
pub const MANAGED_LABEL: &str = "fleetup.managed";
/// Label carrying the owning component's manifest label.
pub const PROVIDER_LABEL: &str = "fleetup.provider";

/// A deployable unit and its replica counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub namespace: NamespaceName,
    pub name: UnitName,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Replicas requested in the unit's spec.
    pub desired_replicas: u32,
    /// Replicas actually running, as last reported by the store.
    pub observed_replicas: u32,
    /// Optimistic concurrency token; stale updates are rejected with a conflict.
    #[serde(default)]
    pub resource_version: u64,
}

impl Unit {
    pub fn unit_ref(&self) -> UnitRef {
        UnitRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Reference to a single unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitRef {
    pub namespace: NamespaceName,
    pub name: UnitName,
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Selects units in a namespace by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSelector {
    pub namespace: NamespaceName,
    pub labels: BTreeMap<String, String>,
}

impl UnitSelector {
    /// Select every managed unit owned by the given component.
    pub fn for_component(component: &ComponentRef) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        labels.insert(PROVIDER_LABEL.to_string(), component.manifest_label());
        Self {
            namespace: component.namespace.clone(),
            labels,
        }
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        unit.namespace == self.namespace
            && self
                .labels
                .iter()
                .all(|(k, v)| unit.labels.get(k) == Some(v))
    }
}

impl fmt::Display for UnitSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}[{}]", self.namespace, labels.join(","))
    }
}

/// What to keep when deleting a component's installed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOptions {
    pub preserve_crds: bool,
    pub preserve_namespace: bool,
    pub preserve_inventory: bool,
}

impl DeleteOptions {
    /// Options used when replacing a component during an upgrade.
    pub fn for_upgrade() -> Self {
        Self {
            preserve_crds: true,
            preserve_namespace: true,
            preserve_inventory: true,
        }
    }
}

/// Operations on deployable units.
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// List units matching the selector.
    async fn list(&self, selector: &UnitSelector) -> Result<Vec<Unit>, StoreError>;

    /// Read the current state of a unit.
    async fn get(&self, unit: &UnitRef) -> Result<Unit, StoreError>;

    /// Write a unit back. Fails with `Conflict` if `resource_version` is stale.
    async fn update(&self, unit: &Unit) -> Result<(), StoreError>;

    /// Delete the installed objects of a component.
    async fn delete(
        &self,
        component: &ComponentRef,
        options: &DeleteOptions,
    ) -> Result<(), StoreError>;

    /// Install the objects of a packaged component.
    async fn create(&self, bundle: &ComponentBundle) -> Result<(), StoreError>;

    /// Whether the namespace exists.
    async fn namespace_exists(&self, namespace: &NamespaceName) -> Result<bool, StoreError>;

    /// Delete a namespace and everything in it. Deleting a missing namespace succeeds.
    async fn delete_namespace(&self, namespace: &NamespaceName) -> Result<(), StoreError>;
}

/// Errors from the unit store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::Unavailable(_))
    }
}
