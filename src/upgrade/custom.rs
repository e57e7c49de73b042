// ABOUTME: Validation of user-requested upgrades into a single-contract plan.
// ABOUTME: Rejects requests that would leave the fleet on mixed contracts.

use semver::Version;
use std::collections::HashSet;
use thiserror::Error;

use super::error::PlanError;
use super::info::ResolutionPass;
use super::plan::{UpgradeItem, UpgradePlan, single_core};
use super::policy::ContractPolicy;
use crate::fleet::ReleaseSource;
use crate::types::{
    Component, ComponentKind, ComponentRef, NamespaceName, ProviderName, ProviderNameError,
    parse_version, version_tag,
};

#[derive(Debug, Error)]
pub enum ParseUpgradeRequestError {
    #[error("expected <namespace>/<name>:<version>, got '{0}'")]
    Format(String),

    #[error(transparent)]
    Name(#[from] ProviderNameError),

    #[error("invalid version '{value}': {source}")]
    Version {
        value: String,
        #[source]
        source: semver::Error,
    },
}

/// A user's request to move one component to a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub component: ComponentRef,
    pub next_version: Version,
}

impl UpgradeRequest {
    pub fn new(component: ComponentRef, next_version: Version) -> Self {
        Self {
            component,
            next_version,
        }
    }

    /// Parse `<namespace>/<name>:<version>` for a component of `kind`.
    pub fn parse(kind: ComponentKind, value: &str) -> Result<Self, ParseUpgradeRequestError> {
        let format_err = || ParseUpgradeRequestError::Format(value.to_string());

        let (namespace, rest) = value.trim().split_once('/').ok_or_else(format_err)?;
        let (name, version) = rest.split_once(':').ok_or_else(format_err)?;
        if namespace.is_empty() || version.is_empty() {
            return Err(format_err());
        }

        let name = ProviderName::new(name)?;
        let next_version =
            parse_version(version).map_err(|source| ParseUpgradeRequestError::Version {
                value: version.to_string(),
                source,
            })?;

        Ok(Self::new(
            ComponentRef::new(kind, name, NamespaceName::new(namespace)),
            next_version,
        ))
    }
}

/// Turn requested upgrades into a plan that keeps the fleet on one contract.
///
/// The target contract comes from the core component: its requested version
/// if the core is part of the request, its installed version otherwise.
/// Components left out of the request must already be on that contract.
pub async fn validate_custom_plan<R: ReleaseSource + ?Sized>(
    fleet: &[Component],
    requested: &[UpgradeRequest],
    releases: &R,
    policy: &ContractPolicy,
) -> Result<UpgradePlan, PlanError> {
    let core = single_core(fleet)?;
    let target_core_version = requested
        .iter()
        .find(|r| r.component == core.id)
        .map(|r| &r.next_version)
        .unwrap_or(&core.version);

    let mut pass = ResolutionPass::new(releases);
    let target = pass
        .contract_for_version(core, target_core_version)
        .await
        .map_err(|source| PlanError::CoreMetadata { source })?;
    if !policy.is_supported(&target) {
        return Err(PlanError::UnsupportedContract {
            supported: policy.supported.clone(),
            requested: target,
        });
    }
    tracing::debug!(
        contract = %target,
        core_version = %version_tag(target_core_version),
        "Validating custom upgrade"
    );

    let mut requested_ids: HashSet<&ComponentRef> = HashSet::new();
    let mut items = Vec::with_capacity(requested.len());
    for request in requested {
        if !requested_ids.insert(&request.component) {
            return Err(PlanError::DuplicateRequest {
                component: request.component.instance_name(),
            });
        }

        let component = fleet
            .iter()
            .find(|c| c.id == request.component)
            .ok_or_else(|| PlanError::UnknownProvider {
                component: request.component.instance_name(),
            })?;

        let contract = pass
            .contract_for_version(component, &request.next_version)
            .await?;
        if contract != target {
            return Err(PlanError::ContractMismatch {
                component: component.instance_name(),
                contract,
                target,
            });
        }

        items.push(UpgradeItem::new(
            component.clone(),
            Some(request.next_version.clone()),
        ));
    }

    for component in fleet.iter().filter(|c| !requested_ids.contains(&c.id)) {
        let contract = pass
            .contract_for_version(component, &component.version)
            .await?;
        if contract != target {
            return Err(PlanError::LaggingProvider {
                component: component.instance_name(),
                contract,
                target,
            });
        }
    }

    Ok(UpgradePlan::new(target, items))
}
