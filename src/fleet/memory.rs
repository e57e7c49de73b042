// ABOUTME: In-memory inventory, unit store and release source.
// ABOUTME: Back the CLI's state file and let tests inject conflicts, failures and scale lag.

use async_trait::async_trait;
use parking_lot::Mutex;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use super::inventory::{Inventory, InventoryError};
use super::releases::{ComponentBundle, FetchError, ReleaseMetadata, ReleaseSource, UnitSpec};
use super::store::{
    DeleteOptions, MANAGED_LABEL, PROVIDER_LABEL, StoreError, Unit, UnitRef, UnitSelector,
    UnitStore,
};
use crate::types::{
    Component, ComponentKind, ComponentRef, Contract, NamespaceName, UnitName, version_tag,
};

// =============================================================================
// Inventory
// =============================================================================

/// Inventory held in memory.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    components: Mutex<Vec<Component>>,
}

impl MemoryInventory {
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            components: Mutex::new(components),
        }
    }

    /// Snapshot of the current records.
    pub fn components(&self) -> Vec<Component> {
        self.components.lock().clone()
    }

    /// Current record for a component, if installed.
    pub fn get(&self, component: &ComponentRef) -> Option<Component> {
        self.components
            .lock()
            .iter()
            .find(|c| &c.id == component)
            .cloned()
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn list(&self) -> Result<Vec<Component>, InventoryError> {
        Ok(self.components())
    }

    async fn check_single_instance(&self, kind: ComponentKind) -> Result<(), InventoryError> {
        let components = self.components.lock();
        let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for component in components.iter().filter(|c| c.kind() == kind) {
            by_name
                .entry(component.id.name.as_str())
                .or_default()
                .push(component.id.namespace.as_str());
        }

        match by_name.into_iter().find(|(_, namespaces)| namespaces.len() > 1) {
            Some((name, namespaces)) => Err(InventoryError::MultipleInstances {
                kind,
                name: name.to_string(),
                count: namespaces.len(),
                namespaces: namespaces.join(", "),
            }),
            None => Ok(()),
        }
    }

    async fn record_install(
        &self,
        component: &ComponentRef,
        version: &Version,
        contract: &Contract,
    ) -> Result<(), InventoryError> {
        let mut components = self.components.lock();
        let record = components
            .iter_mut()
            .find(|c| &c.id == component)
            .ok_or_else(|| InventoryError::NotFound(component.instance_name()))?;

        // Both fields change under the same lock.
        record.version = version.clone();
        record.contract = Some(contract.clone());
        Ok(())
    }
}

// =============================================================================
// Unit store
// =============================================================================

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Update,
    Delete,
    Create,
    GetNamespace,
    DeleteNamespace,
}

/// A mutation applied to the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Scaled { unit: UnitRef, replicas: u32 },
    Deleted {
        component: ComponentRef,
        options: DeleteOptions,
    },
    Created {
        component: ComponentRef,
        version: Version,
    },
    NamespaceDeleted(NamespaceName),
}

#[derive(Debug, Default)]
struct StoreState {
    units: BTreeMap<UnitRef, Unit>,
    namespaces: BTreeSet<NamespaceName>,
    /// Reads remaining before observed replicas follow desired replicas.
    lagging: BTreeMap<UnitRef, u32>,
    scale_lag: u32,
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    events: Vec<StoreEvent>,
}

impl StoreState {
    fn take_failure(&mut self, op: StoreOp) -> Result<(), StoreError> {
        match self.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Unit store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: Vec<Unit>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for unit in units {
                state.namespaces.insert(unit.namespace.clone());
                state.units.insert(unit.unit_ref(), unit);
            }
        }
        store
    }

    /// Number of reads after a scale-down before observed replicas drop.
    pub fn set_scale_lag(&self, reads: u32) {
        self.state.lock().scale_lag = reads;
    }

    /// Fail the next call of `op` with `err`. Failures queue up.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn add_namespace(&self, namespace: NamespaceName) {
        self.state.lock().namespaces.insert(namespace);
    }

    pub fn units(&self) -> Vec<Unit> {
        self.state.lock().units.values().cloned().collect()
    }

    pub fn namespaces(&self) -> Vec<NamespaceName> {
        self.state.lock().namespaces.iter().cloned().collect()
    }

    /// Mutations applied so far.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.state.lock().events.clone()
    }
}

#[async_trait]
impl UnitStore for MemoryStore {
    async fn list(&self, selector: &UnitSelector) -> Result<Vec<Unit>, StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::List)?;
        Ok(state
            .units
            .values()
            .filter(|u| selector.matches(u))
            .cloned()
            .collect())
    }

    async fn get(&self, unit: &UnitRef) -> Result<Unit, StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::Get)?;

        let settled = match state.lagging.get_mut(unit) {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if settled {
            state.lagging.remove(unit);
        }

        let stored = state
            .units
            .get_mut(unit)
            .ok_or_else(|| StoreError::NotFound(unit.to_string()))?;
        if settled {
            stored.observed_replicas = stored.desired_replicas;
        }
        Ok(stored.clone())
    }

    async fn update(&self, unit: &Unit) -> Result<(), StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.take_failure(StoreOp::Update)?;

        let key = unit.unit_ref();
        let scale_lag = state.scale_lag;
        let stored = state
            .units
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if stored.resource_version != unit.resource_version {
            return Err(StoreError::Conflict(format!(
                "{key} has been modified (resource version {} != {})",
                stored.resource_version, unit.resource_version
            )));
        }

        let scaled = stored.desired_replicas != unit.desired_replicas;
        let observed = stored.observed_replicas;
        *stored = Unit {
            observed_replicas: observed,
            resource_version: unit.resource_version + 1,
            ..unit.clone()
        };

        if scaled {
            if scale_lag == 0 {
                stored.observed_replicas = stored.desired_replicas;
            } else {
                state.lagging.insert(key.clone(), scale_lag);
            }
            state.events.push(StoreEvent::Scaled {
                unit: key,
                replicas: unit.desired_replicas,
            });
        }
        Ok(())
    }

    async fn delete(
        &self,
        component: &ComponentRef,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::Delete)?;

        let selector = UnitSelector::for_component(component);
        state.units.retain(|_, u| !selector.matches(u));
        if !options.preserve_namespace {
            state.namespaces.remove(&component.namespace);
            state.units.retain(|k, _| k.namespace != component.namespace);
        }
        state.events.push(StoreEvent::Deleted {
            component: component.clone(),
            options: *options,
        });
        Ok(())
    }

    async fn create(&self, bundle: &ComponentBundle) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::Create)?;

        let namespace = bundle.target_namespace.clone();
        for spec in &bundle.units {
            let key = UnitRef {
                namespace: namespace.clone(),
                name: spec.name.clone(),
            };
            if state.units.contains_key(&key) {
                return Err(StoreError::Rejected(format!("{key} already exists")));
            }
        }

        state.namespaces.insert(namespace.clone());
        for spec in &bundle.units {
            let mut labels = spec.labels.clone();
            labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
            labels.insert(
                PROVIDER_LABEL.to_string(),
                bundle.component.manifest_label(),
            );
            let unit = Unit {
                namespace: namespace.clone(),
                name: spec.name.clone(),
                labels,
                desired_replicas: spec.replicas,
                observed_replicas: spec.replicas,
                resource_version: 1,
            };
            state.units.insert(unit.unit_ref(), unit);
        }
        state.events.push(StoreEvent::Created {
            component: bundle.component.clone(),
            version: bundle.version.clone(),
        });
        Ok(())
    }

    async fn namespace_exists(&self, namespace: &NamespaceName) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::GetNamespace)?;
        Ok(state.namespaces.contains(namespace))
    }

    async fn delete_namespace(&self, namespace: &NamespaceName) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.take_failure(StoreOp::DeleteNamespace)?;

        state.namespaces.remove(namespace);
        state.units.retain(|k, _| &k.namespace != namespace);
        state
            .events
            .push(StoreEvent::NamespaceDeleted(namespace.clone()));
        Ok(())
    }
}

// =============================================================================
// Release source
// =============================================================================

/// Release source held in memory, keyed by manifest label.
#[derive(Debug, Default)]
pub struct MemoryReleases {
    metadata: HashMap<String, ReleaseMetadata>,
    units: HashMap<(String, Version), Vec<UnitSpec>>,
    unavailable: HashSet<String>,
    /// Remaining transient failures per manifest label, metadata then components.
    blips: Mutex<HashMap<String, (u32, u32)>>,
    fetches: Mutex<Vec<String>>,
}

impl MemoryReleases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish metadata for every instance sharing the component's manifest label.
    pub fn with_metadata(mut self, component: &ComponentRef, metadata: ReleaseMetadata) -> Self {
        self.metadata.insert(component.manifest_label(), metadata);
        self
    }

    /// Override the units shipped by one version.
    pub fn with_units(
        mut self,
        component: &ComponentRef,
        version: Version,
        units: Vec<UnitSpec>,
    ) -> Self {
        self.units
            .insert((component.manifest_label(), version), units);
        self
    }

    /// Make metadata fetches for the component fail.
    pub fn with_unavailable(mut self, component: &ComponentRef) -> Self {
        self.unavailable.insert(component.manifest_label());
        self
    }

    /// Fail the next `metadata` metadata fetches and `components` component
    /// fetches for the component with `Unavailable`.
    pub fn with_blips(self, component: &ComponentRef, metadata: u32, components: u32) -> Self {
        self.blips
            .lock()
            .insert(component.manifest_label(), (metadata, components));
        self
    }

    fn take_blip(&self, label: &str, components: bool) -> Result<(), FetchError> {
        let mut blips = self.blips.lock();
        let Some((metadata_left, components_left)) = blips.get_mut(label) else {
            return Ok(());
        };
        let left = if components {
            components_left
        } else {
            metadata_left
        };
        if *left == 0 {
            return Ok(());
        }
        *left -= 1;
        Err(FetchError::Unavailable(format!("{label}: connection reset")))
    }

    /// Number of metadata fetches made for the component so far.
    pub fn fetch_count(&self, component: &ComponentRef) -> usize {
        let label = component.manifest_label();
        self.fetches.lock().iter().filter(|l| **l == label).count()
    }
}

#[async_trait]
impl ReleaseSource for MemoryReleases {
    async fn release_metadata(
        &self,
        component: &ComponentRef,
    ) -> Result<ReleaseMetadata, FetchError> {
        let label = component.manifest_label();
        self.fetches.lock().push(label.clone());
        self.take_blip(&label, false)?;

        if self.unavailable.contains(&label) {
            return Err(FetchError::Unavailable(format!(
                "metadata for {label} cannot be reached"
            )));
        }
        self.metadata
            .get(&label)
            .cloned()
            .ok_or(FetchError::NotFound(label))
    }

    async fn packaged_components(
        &self,
        component: &ComponentRef,
        version: &Version,
        target_namespace: &NamespaceName,
    ) -> Result<ComponentBundle, FetchError> {
        let label = component.manifest_label();
        self.take_blip(&label, true)?;
        let metadata = self
            .metadata
            .get(&label)
            .ok_or_else(|| FetchError::NotFound(label.clone()))?;
        if !metadata.versions.contains(version) {
            return Err(FetchError::UnknownVersion {
                component: component.instance_name(),
                version: version_tag(version),
            });
        }

        let units = self
            .units
            .get(&(label.clone(), version.clone()))
            .cloned()
            .unwrap_or_else(|| {
                vec![UnitSpec {
                    name: UnitName::new(format!("{label}-controller-manager")),
                    replicas: 1,
                    labels: BTreeMap::new(),
                }]
            });

        Ok(ComponentBundle {
            component: component.clone(),
            version: version.clone(),
            target_namespace: target_namespace.clone(),
            units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderName;

    fn core_ref() -> ComponentRef {
        ComponentRef::new(
            ComponentKind::Core,
            ProviderName::new("cluster-api").unwrap(),
            NamespaceName::new("capi-system"),
        )
    }

    fn unit(replicas: u32) -> Unit {
        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        labels.insert(PROVIDER_LABEL.to_string(), "cluster-api".to_string());
        Unit {
            namespace: NamespaceName::new("capi-system"),
            name: UnitName::new("capi-controller-manager"),
            labels,
            desired_replicas: replicas,
            observed_replicas: replicas,
            resource_version: 1,
        }
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let store = MemoryStore::with_units(vec![unit(1)]);
        let mut first = store.get(&unit(1).unit_ref()).await.unwrap();
        first.desired_replicas = 0;
        store.update(&first).await.unwrap();

        // Same resource version again is now stale.
        let err = store.update(&first).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn observed_replicas_follow_after_lag() {
        let store = MemoryStore::with_units(vec![unit(2)]);
        store.set_scale_lag(2);
        let key = unit(2).unit_ref();

        let mut current = store.get(&key).await.unwrap();
        current.desired_replicas = 0;
        store.update(&current).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap().observed_replicas, 2);
        assert_eq!(store.get(&key).await.unwrap().observed_replicas, 2);
        assert_eq!(store.get(&key).await.unwrap().observed_replicas, 0);
    }

    #[tokio::test]
    async fn delete_for_upgrade_keeps_namespace() {
        let store = MemoryStore::with_units(vec![unit(1)]);
        store
            .delete(&core_ref(), &DeleteOptions::for_upgrade())
            .await
            .unwrap();

        assert!(store.units().is_empty());
        assert_eq!(store.namespaces(), vec![NamespaceName::new("capi-system")]);
    }

    #[tokio::test]
    async fn single_instance_check_groups_by_name() {
        let mut second = Component::new(core_ref(), Version::new(0, 4, 2));
        second.id.namespace = NamespaceName::new("other-system");
        let inventory = MemoryInventory::new(vec![
            Component::new(core_ref(), Version::new(0, 4, 2)),
            second,
        ]);

        let err = inventory
            .check_single_instance(ComponentKind::Core)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::MultipleInstances { count: 2, .. }));
        assert!(
            inventory
                .check_single_instance(ComponentKind::Bootstrap)
                .await
                .is_ok()
        );
    }
}
