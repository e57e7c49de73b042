// ABOUTME: YAML snapshot of a fleet: installed components and their deployable units.
// ABOUTME: Loaded into the in-memory collaborators and written back after a rollout.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::memory::{MemoryInventory, MemoryStore};
use super::store::Unit;
use crate::error::Result;
use crate::types::{Component, NamespaceName};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetState {
    #[serde(default)]
    pub providers: Vec<Component>,

    #[serde(default)]
    pub units: Vec<Unit>,

    /// Namespaces that exist without any unit in them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<NamespaceName>,
}

impl FleetState {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Build in-memory collaborators holding this state.
    pub fn into_collaborators(self) -> (MemoryInventory, MemoryStore) {
        let store = MemoryStore::with_units(self.units);
        for namespace in self.namespaces {
            store.add_namespace(namespace);
        }
        (MemoryInventory::new(self.providers), store)
    }

    /// Capture the state of in-memory collaborators.
    pub fn capture(inventory: &MemoryInventory, store: &MemoryStore) -> Self {
        let units = store.units();
        let namespaces = store
            .namespaces()
            .into_iter()
            .filter(|ns| !units.iter().any(|u| &u.namespace == ns))
            .collect();
        Self {
            providers: inventory.components(),
            units,
            namespaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"
providers:
  - kind: CoreProvider
    name: cluster-api
    namespace: capi-system
    version: v0.4.2
units:
  - namespace: capi-system
    name: capi-controller-manager
    labels:
      fleetup.managed: "true"
      fleetup.provider: cluster-api
    desired_replicas: 1
    observed_replicas: 1
namespaces:
  - capi-webhook-system
"#;

    #[test]
    fn state_survives_collaborator_round_trip() {
        let state = FleetState::from_yaml(STATE).unwrap();
        let (inventory, store) = state.into_collaborators();
        assert_eq!(store.namespaces().len(), 2);

        let captured = FleetState::capture(&inventory, &store);
        assert_eq!(captured.providers.len(), 1);
        assert_eq!(captured.units.len(), 1);
        assert_eq!(
            captured.namespaces,
            vec![NamespaceName::new("capi-webhook-system")]
        );
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.yml");
        FleetState::from_yaml(STATE).unwrap().save(&path).unwrap();

        let loaded = FleetState::load(&path).unwrap();
        assert_eq!(loaded.providers[0].instance_name(), "capi-system/cluster-api");
    }
}
