// ABOUTME: Test support utilities.
// ABOUTME: Builds in-memory fleets, release metadata and collaborators for integration tests.

#![allow(dead_code)]

use fleetup::fleet::{
    Cluster, MANAGED_LABEL, MemoryInventory, MemoryReleases, MemoryStore, PROVIDER_LABEL,
    ReleaseMetadata, ReleaseSeries, Unit,
};
use fleetup::rollout::{RecordingSleeper, RolloutSettings};
use fleetup::types::{
    Component, ComponentKind, ComponentRef, Contract, NamespaceName, ProviderName, UnitName,
    parse_version,
};
use fleetup::upgrade::{ContractPolicy, Upgrader};
use std::collections::BTreeMap;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("fleetup=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn component_ref(kind: ComponentKind, name: &str, namespace: &str) -> ComponentRef {
    ComponentRef::new(
        kind,
        ProviderName::new(name).unwrap(),
        NamespaceName::new(namespace),
    )
}

pub fn component(kind: ComponentKind, name: &str, namespace: &str, version: &str) -> Component {
    Component::new(
        component_ref(kind, name, namespace),
        parse_version(version).unwrap(),
    )
}

pub fn core(version: &str) -> Component {
    component(ComponentKind::Core, "cluster-api", "capi-system", version)
}

pub fn control_plane(version: &str) -> Component {
    component(
        ComponentKind::ControlPlane,
        "kubeadm",
        "capi-kubeadm-control-plane-system",
        version,
    )
}

pub fn bootstrap(version: &str) -> Component {
    component(
        ComponentKind::Bootstrap,
        "kubeadm",
        "capi-kubeadm-bootstrap-system",
        version,
    )
}

pub fn infrastructure(namespace: &str, version: &str) -> Component {
    component(ComponentKind::Infrastructure, "docker", namespace, version)
}

/// Metadata publishing `versions` with `series` as (major, minor, contract).
pub fn metadata(versions: &[&str], series: &[(u64, u64, &str)]) -> ReleaseMetadata {
    ReleaseMetadata {
        versions: versions.iter().map(|v| parse_version(v).unwrap()).collect(),
        release_series: series
            .iter()
            .map(|(major, minor, contract)| ReleaseSeries {
                major: *major,
                minor: *minor,
                contract: Contract::new(*contract),
            })
            .collect(),
    }
}

/// The single controller unit of a component, as the memory release source ships it.
pub fn controller_unit(component: &ComponentRef, replicas: u32) -> Unit {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
    labels.insert(PROVIDER_LABEL.to_string(), component.manifest_label());
    Unit {
        namespace: component.namespace.clone(),
        name: UnitName::new(format!("{}-controller-manager", component.manifest_label())),
        labels,
        desired_replicas: replicas,
        observed_replicas: replicas,
        resource_version: 1,
    }
}

pub fn policy(supported: &str, legacy: &str) -> ContractPolicy {
    ContractPolicy {
        supported: Contract::new(supported),
        legacy: Contract::new(legacy),
    }
}

/// Core v0.4.2 and ControlPlane v0.4.2 on v1alpha4. Core also offers v0.5.0 on
/// v1alpha5; ControlPlane has no v1alpha5 release.
pub fn two_contract_fleet() -> (Vec<Component>, MemoryReleases) {
    let fleet = vec![core("v0.4.2"), control_plane("v0.4.2")];
    let releases = MemoryReleases::new()
        .with_metadata(
            &fleet[0].id,
            metadata(
                &["v0.4.2", "v0.4.5", "v0.5.0"],
                &[(0, 4, "v1alpha4"), (0, 5, "v1alpha5")],
            ),
        )
        .with_metadata(
            &fleet[1].id,
            metadata(&["v0.4.2", "v0.4.5"], &[(0, 4, "v1alpha4")]),
        );
    (fleet, releases)
}

/// Collaborators of an in-memory fleet with one running controller per component.
pub struct Scenario {
    pub inventory: MemoryInventory,
    pub store: MemoryStore,
    pub releases: MemoryReleases,
    pub settings: RolloutSettings,
    pub sleeper: RecordingSleeper,
}

impl Scenario {
    pub fn new(fleet: Vec<Component>, releases: MemoryReleases) -> Self {
        let units = fleet.iter().map(|c| controller_unit(&c.id, 1)).collect();
        let store = MemoryStore::with_units(units);
        let settings = RolloutSettings::default();
        store.add_namespace(settings.webhook_namespace.clone());
        Self {
            inventory: MemoryInventory::new(fleet),
            store,
            releases,
            settings,
            sleeper: RecordingSleeper::new(),
        }
    }

    pub fn with_policy(mut self, policy: ContractPolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    pub fn cluster(&self) -> Cluster<'_> {
        Cluster::new(&self.inventory, &self.releases, &self.store)
    }

    pub fn upgrader(&self) -> Upgrader<'_> {
        Upgrader::new(self.cluster(), &self.settings, &self.sleeper)
    }
}
