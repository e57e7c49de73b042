// ABOUTME: Configuration types and parsing for fleetup.yml.
// ABOUTME: Contract policy, fleet file locations, drain and fetch backoff schedules.

mod init;

pub use init::init_config;

use crate::error::{Error, Result};
use crate::rollout::{Backoff, DrainSettings, RolloutSettings};
use crate::types::NamespaceName;
use crate::upgrade::ContractPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "fleetup.yml";
pub const CONFIG_FILENAME_ALT: &str = "fleetup.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".fleetup/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub contracts: ContractPolicy,

    #[serde(default = "default_webhook_namespace")]
    pub webhook_namespace: NamespaceName,

    /// Fleet state file, relative to the config directory.
    #[serde(default = "default_state")]
    pub state: PathBuf,

    /// Directory of published releases, relative to the config directory.
    #[serde(default = "default_releases")]
    pub releases: PathBuf,

    #[serde(default)]
    pub drain: DrainSettings,

    /// Retries of release source reads.
    #[serde(default = "Backoff::read")]
    pub fetch: Backoff,
}

fn default_webhook_namespace() -> NamespaceName {
    NamespaceName::new("capi-webhook-system")
}

fn default_state() -> PathBuf {
    PathBuf::from("fleet.yml")
}

fn default_releases() -> PathBuf {
    PathBuf::from("releases")
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.contracts.supported == self.contracts.legacy {
            return Err(Error::InvalidConfig(format!(
                "supported and legacy contracts are both {}",
                self.contracts.supported
            )));
        }
        for (name, backoff) in [
            ("drain.write", &self.drain.write),
            ("drain.scale_to_zero", &self.drain.scale_to_zero),
            ("fetch", &self.fetch),
        ] {
            if backoff.steps == 0 {
                return Err(Error::InvalidConfig(format!("{name}.steps must be at least 1")));
            }
            if !(0.0..=1.0).contains(&backoff.jitter) || backoff.factor < 1.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name}: factor must be >= 1 and jitter within 0..=1"
                )));
            }
        }
        Ok(())
    }

    /// Fleet state file, resolved against `dir`.
    pub fn state_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.state)
    }

    /// Releases directory, resolved against `dir`.
    pub fn releases_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.releases)
    }

    /// Settings handed to every rollout.
    pub fn settings(&self) -> RolloutSettings {
        RolloutSettings {
            policy: self.contracts.clone(),
            drain: self.drain.clone(),
            fetch: self.fetch.clone(),
            webhook_namespace: self.webhook_namespace.clone(),
        }
    }

    pub fn template() -> Self {
        Config {
            contracts: ContractPolicy::default(),
            webhook_namespace: default_webhook_namespace(),
            state: default_state(),
            releases: default_releases(),
            drain: DrainSettings::default(),
            fetch: Backoff::read(),
        }
    }
}
