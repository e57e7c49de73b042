// ABOUTME: Collaborator traits the engine acts upon: inventory, release source, unit store.
// ABOUTME: Ships directory-backed and in-memory implementations plus the fleet state file.

mod directory;
mod inventory;
mod memory;
mod releases;
mod state;
mod store;

pub use directory::{COMPONENTS_FILE, DirectoryReleases, METADATA_FILE};
pub use inventory::{Inventory, InventoryError};
pub use memory::{MemoryInventory, MemoryReleases, MemoryStore, StoreEvent, StoreOp};
pub use releases::{
    ComponentBundle, FetchError, ReleaseMetadata, ReleaseSeries, ReleaseSource, UnitSpec,
};
pub use state::FleetState;
pub use store::{
    DeleteOptions, MANAGED_LABEL, PROVIDER_LABEL, StoreError, Unit, UnitRef, UnitSelector,
    UnitStore,
};

/// Handles on the collaborators of one fleet.
#[derive(Clone, Copy)]
pub struct Cluster<'a> {
    pub inventory: &'a dyn Inventory,
    pub releases: &'a dyn ReleaseSource,
    pub store: &'a dyn UnitStore,
}

impl<'a> Cluster<'a> {
    pub fn new(
        inventory: &'a dyn Inventory,
        releases: &'a dyn ReleaseSource,
        store: &'a dyn UnitStore,
    ) -> Self {
        Self {
            inventory,
            releases,
            store,
        }
    }
}
