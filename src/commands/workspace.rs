// ABOUTME: Shared helper loading the config, fleet state and release directory.
// ABOUTME: Writes the fleet state back after commands that change it.

use fleetup::config::Config;
use fleetup::error::Result;
use fleetup::fleet::{Cluster, DirectoryReleases, FleetState, MemoryInventory, MemoryStore};
use fleetup::output::Output;
use std::path::{Path, PathBuf};

/// Collaborators of the fleet described by the config in a directory.
pub struct Workspace {
    pub config: Config,
    state_path: PathBuf,
    inventory: MemoryInventory,
    store: MemoryStore,
    releases: DirectoryReleases,
}

impl Workspace {
    pub fn open(dir: &Path, output: &Output) -> Result<Self> {
        let config = Config::discover(dir)?;
        let state_path = config.state_path(dir);
        output.progress(&format!("Reading fleet from {}", state_path.display()));

        let (inventory, store) = FleetState::load(&state_path)?.into_collaborators();
        let releases = DirectoryReleases::new(config.releases_path(dir));

        Ok(Self {
            config,
            state_path,
            inventory,
            store,
            releases,
        })
    }

    pub fn cluster(&self) -> Cluster<'_> {
        Cluster::new(&self.inventory, &self.releases, &self.store)
    }

    pub fn save(&self) -> Result<()> {
        FleetState::capture(&self.inventory, &self.store).save(&self.state_path)
    }
}
