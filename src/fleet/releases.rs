// ABOUTME: Release source trait: per-component release metadata and packaged components.
// ABOUTME: Release series map major/minor version ranges to exactly one contract.

use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ErrorClass;
use crate::rollout::Retryable;
use crate::types::{ComponentRef, Contract, NamespaceName, UnitName, version};

/// A major/minor release line and the contract it implements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSeries {
    pub major: u64,
    pub minor: u64,
    pub contract: Contract,
}

impl ReleaseSeries {
    pub fn contains(&self, version: &Version) -> bool {
        self.major == version.major && self.minor == version.minor
    }
}

/// Release metadata published for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    /// Every published version of the component.
    #[serde(default, with = "version::tagged_vec")]
    pub versions: Vec<Version>,

    #[serde(default)]
    pub release_series: Vec<ReleaseSeries>,
}

impl ReleaseMetadata {
    /// The release series containing `version`, if any.
    pub fn series_for_version(&self, version: &Version) -> Option<&ReleaseSeries> {
        self.release_series.iter().find(|s| s.contains(version))
    }
}

/// A unit as shipped in a component's packaged manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: UnitName,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

fn default_replicas() -> u32 {
    1
}

/// Packaged components of one version, ready to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBundle {
    pub component: ComponentRef,
    pub version: Version,
    pub target_namespace: NamespaceName,
    pub units: Vec<UnitSpec>,
}

/// Source of release metadata and packaged components.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the release metadata of a component. Never cached by the engine.
    async fn release_metadata(
        &self,
        component: &ComponentRef,
    ) -> Result<ReleaseMetadata, FetchError>;

    /// Fetch the packaged components of a version, targeted at a namespace.
    async fn packaged_components(
        &self,
        component: &ComponentRef,
        version: &Version,
        target_namespace: &NamespaceName,
    ) -> Result<ComponentBundle, FetchError>;
}

/// Errors fetching from a release source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no releases published for {0}")]
    NotFound(String),

    #[error("version {version} of {component} is not published")]
    UnknownVersion { component: String, version: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("release source unavailable: {0}")]
    Unavailable(String),

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unavailable(_) | FetchError::Io { .. })
    }
}

impl FetchError {
    pub fn class(&self) -> ErrorClass {
        if self.is_retryable() {
            ErrorClass::Transient
        } else {
            ErrorClass::Fatal
        }
    }
}
