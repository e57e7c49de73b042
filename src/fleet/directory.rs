// ABOUTME: Release source backed by a local directory of published releases.
// ABOUTME: Layout: <root>/<manifest-label>/metadata.yaml and <root>/<label>/<tag>/components.yaml.

use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::releases::{ComponentBundle, FetchError, ReleaseMetadata, ReleaseSource, UnitSpec};
use crate::types::{ComponentRef, NamespaceName, version_tag};

pub const METADATA_FILE: &str = "metadata.yaml";
pub const COMPONENTS_FILE: &str = "components.yaml";

/// Reads release metadata and packaged components from disk on every call.
#[derive(Debug, Clone)]
pub struct DirectoryReleases {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ComponentsFile {
    #[serde(default)]
    units: Vec<UnitSpec>,
}

impl DirectoryReleases {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn component_dir(&self, component: &ComponentRef) -> PathBuf {
        self.root.join(component.manifest_label())
    }

    async fn read(path: &Path) -> Result<Option<String>, FetchError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FetchError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[async_trait]
impl ReleaseSource for DirectoryReleases {
    async fn release_metadata(
        &self,
        component: &ComponentRef,
    ) -> Result<ReleaseMetadata, FetchError> {
        let path = self.component_dir(component).join(METADATA_FILE);
        tracing::debug!("Reading release metadata from {}", path.display());

        let content = Self::read(&path)
            .await?
            .ok_or_else(|| FetchError::NotFound(component.instance_name()))?;
        serde_yaml::from_str(&content).map_err(|source| FetchError::Parse { path, source })
    }

    async fn packaged_components(
        &self,
        component: &ComponentRef,
        version: &Version,
        target_namespace: &NamespaceName,
    ) -> Result<ComponentBundle, FetchError> {
        let path = self
            .component_dir(component)
            .join(version_tag(version))
            .join(COMPONENTS_FILE);
        tracing::debug!("Reading packaged components from {}", path.display());

        let content = Self::read(&path)
            .await?
            .ok_or_else(|| FetchError::UnknownVersion {
                component: component.instance_name(),
                version: version_tag(version),
            })?;
        let file: ComponentsFile =
            serde_yaml::from_str(&content).map_err(|source| FetchError::Parse { path, source })?;

        Ok(ComponentBundle {
            component: component.clone(),
            version: version.clone(),
            target_namespace: target_namespace.clone(),
            units: file.units,
        })
    }
}
