// ABOUTME: Version and contract resolution for a single component.
// ABOUTME: Derives the installed contract and the newer versions offered per contract.

use semver::Version;
use std::collections::HashMap;

use super::error::ResolveError;
use crate::diagnostics::{Diagnostics, Warning};
use crate::fleet::{ReleaseMetadata, ReleaseSource};
use crate::types::{Component, ComponentRef, Contract, version_tag};

/// A published version newer than the installed one, with its contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextVersion {
    pub version: Version,
    pub contract: Contract,
}

/// What a component runs today and what it could move to.
#[derive(Debug, Clone)]
pub struct UpgradeInfo {
    pub component: ComponentRef,
    pub current_version: Version,
    pub current_contract: Contract,
    /// Strictly newer versions, ascending.
    pub next_versions: Vec<NextVersion>,
    metadata: ReleaseMetadata,
}

impl UpgradeInfo {
    /// Derive upgrade info from already fetched metadata.
    pub fn from_metadata(
        component: &Component,
        metadata: ReleaseMetadata,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ResolveError> {
        let current_contract = metadata
            .series_for_version(&component.version)
            .map(|s| s.contract.clone())
            .ok_or_else(|| ResolveError::NoMatchingReleaseSeries {
                component: component.instance_name(),
                version: version_tag(&component.version),
            })?;

        // Pre-releases are only offered to components already running one.
        let allow_pre = !component.version.pre.is_empty();

        let mut next_versions: Vec<NextVersion> = Vec::new();
        for version in &metadata.versions {
            if version <= &component.version || (!version.pre.is_empty() && !allow_pre) {
                continue;
            }
            match metadata.series_for_version(version) {
                Some(series) => next_versions.push(NextVersion {
                    version: version.clone(),
                    contract: series.contract.clone(),
                }),
                None => diagnostics.warn(Warning::unmatched_version(format!(
                    "skipping {} of provider {}: no matching release series",
                    version_tag(version),
                    component.instance_name()
                ))),
            }
        }
        next_versions.sort_by(|a, b| a.version.cmp(&b.version));
        next_versions.dedup_by(|a, b| a.version == b.version);

        Ok(Self {
            component: component.id.clone(),
            current_version: component.version.clone(),
            current_contract,
            next_versions,
            metadata,
        })
    }

    /// Contract the component supports at `version`.
    pub fn contract_for_version(&self, version: &Version) -> Result<Contract, ResolveError> {
        self.metadata
            .series_for_version(version)
            .map(|s| s.contract.clone())
            .ok_or_else(|| ResolveError::NoMatchingReleaseSeries {
                component: self.component.instance_name(),
                version: version_tag(version),
            })
    }

    /// Highest newer version implementing `contract`, if any.
    pub fn latest_version_for_contract(&self, contract: &Contract) -> Option<&Version> {
        self.next_versions
            .iter()
            .rev()
            .find(|n| &n.contract == contract)
            .map(|n| &n.version)
    }

    /// The current contract, then every newer contract in order of first release.
    pub fn contracts_for_upgrade(&self) -> Vec<Contract> {
        let mut contracts = vec![self.current_contract.clone()];
        for next in &self.next_versions {
            if !contracts.contains(&next.contract) {
                contracts.push(next.contract.clone());
            }
        }
        contracts
    }
}

/// Fetch metadata for a component and derive its upgrade info.
pub async fn resolve<R: ReleaseSource + ?Sized>(
    component: &Component,
    releases: &R,
    diagnostics: &mut Diagnostics,
) -> Result<UpgradeInfo, ResolveError> {
    let metadata = releases
        .release_metadata(&component.id)
        .await
        .map_err(|source| ResolveError::MetadataUnavailable {
            component: component.instance_name(),
            source,
        })?;
    UpgradeInfo::from_metadata(component, metadata, diagnostics)
}

/// Resolves components for one planning pass.
///
/// Each component is fetched at most once per pass. A pass is never reused
/// across calls so remote metadata changes are always picked up.
pub struct ResolutionPass<'a, R: ?Sized> {
    releases: &'a R,
    resolved: HashMap<ComponentRef, UpgradeInfo>,
    diagnostics: Diagnostics,
}

impl<'a, R: ReleaseSource + ?Sized> ResolutionPass<'a, R> {
    pub fn new(releases: &'a R) -> Self {
        Self {
            releases,
            resolved: HashMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub async fn info(&mut self, component: &Component) -> Result<&UpgradeInfo, ResolveError> {
        if !self.resolved.contains_key(&component.id) {
            let info = resolve(component, self.releases, &mut self.diagnostics).await?;
            self.resolved.insert(component.id.clone(), info);
        }
        Ok(&self.resolved[&component.id])
    }

    /// Contract `component` would support once moved to `version`.
    pub async fn contract_for_version(
        &mut self,
        component: &Component,
        version: &Version,
    ) -> Result<Contract, ResolveError> {
        self.info(component).await?.contract_for_version(version)
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::ReleaseSeries;
    use crate::types::{ComponentKind, NamespaceName, ProviderName};

    fn core(version: &str) -> Component {
        Component::new(
            ComponentRef::new(
                ComponentKind::Core,
                ProviderName::new("cluster-api").unwrap(),
                NamespaceName::new("capi-system"),
            ),
            crate::types::parse_version(version).unwrap(),
        )
    }

    fn metadata(versions: &[&str]) -> ReleaseMetadata {
        ReleaseMetadata {
            versions: versions
                .iter()
                .map(|v| crate::types::parse_version(v).unwrap())
                .collect(),
            release_series: vec![
                ReleaseSeries {
                    major: 0,
                    minor: 4,
                    contract: Contract::new("v1alpha4"),
                },
                ReleaseSeries {
                    major: 0,
                    minor: 5,
                    contract: Contract::new("v1alpha5"),
                },
            ],
        }
    }

    #[test]
    fn only_strictly_newer_versions_are_offered() {
        let mut diag = Diagnostics::default();
        let info = UpgradeInfo::from_metadata(
            &core("v0.4.2"),
            metadata(&["v0.5.0", "v0.4.1", "v0.4.2", "v0.4.5"]),
            &mut diag,
        )
        .unwrap();

        let versions: Vec<String> = info
            .next_versions
            .iter()
            .map(|n| version_tag(&n.version))
            .collect();
        assert_eq!(versions, vec!["v0.4.5", "v0.5.0"]);
        assert_eq!(info.current_contract.as_str(), "v1alpha4");
        assert!(!diag.has_warnings());
    }

    #[test]
    fn versions_outside_series_are_skipped_with_warning() {
        let mut diag = Diagnostics::default();
        let info =
            UpgradeInfo::from_metadata(&core("v0.4.2"), metadata(&["v0.6.0"]), &mut diag).unwrap();
        assert!(info.next_versions.is_empty());
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn installed_version_outside_series_is_an_error() {
        let mut diag = Diagnostics::default();
        let err = UpgradeInfo::from_metadata(&core("v0.3.0"), metadata(&[]), &mut diag)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoMatchingReleaseSeries { .. }));
    }

    #[test]
    fn pre_releases_only_for_pre_release_installs() {
        let mut diag = Diagnostics::default();
        let stable = UpgradeInfo::from_metadata(
            &core("v0.4.2"),
            metadata(&["v0.5.0-rc.1"]),
            &mut diag,
        )
        .unwrap();
        assert!(stable.next_versions.is_empty());

        let pre = UpgradeInfo::from_metadata(
            &core("v0.4.3-beta.0"),
            metadata(&["v0.5.0-rc.1"]),
            &mut diag,
        )
        .unwrap();
        assert_eq!(pre.next_versions.len(), 1);
    }

    #[test]
    fn latest_version_and_contract_order() {
        let mut diag = Diagnostics::default();
        let info = UpgradeInfo::from_metadata(
            &core("v0.4.2"),
            metadata(&["v0.4.3", "v0.4.5", "v0.5.0", "v0.5.1"]),
            &mut diag,
        )
        .unwrap();

        assert_eq!(
            info.latest_version_for_contract(&Contract::new("v1alpha4")),
            Some(&Version::new(0, 4, 5))
        );
        assert_eq!(
            info.latest_version_for_contract(&Contract::new("v1alpha5")),
            Some(&Version::new(0, 5, 1))
        );
        assert_eq!(
            info.latest_version_for_contract(&Contract::new("v1beta1")),
            None
        );
        assert_eq!(
            info.contracts_for_upgrade(),
            vec![Contract::new("v1alpha4"), Contract::new("v1alpha5")]
        );
    }
}
