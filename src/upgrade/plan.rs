// ABOUTME: Upgrade plans and the plan builder.
// ABOUTME: Produces one plan per candidate contract, never a mixed-contract fleet.

use semver::Version;
use std::fmt;

use super::error::PlanError;
use super::info::ResolutionPass;
use crate::diagnostics::{Diagnostics, Warning};
use crate::fleet::ReleaseSource;
use crate::types::{Component, ComponentKind, Contract, version_tag};

/// One component of a plan and the version it moves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeItem {
    pub component: Component,
    /// `None` when no newer version is available for the plan's contract.
    pub next_version: Option<Version>,
}

impl UpgradeItem {
    pub fn new(component: Component, next_version: Option<Version>) -> Self {
        Self {
            component,
            next_version,
        }
    }

    /// Identifies the item; derived from the component instance.
    pub fn upgrade_ref(&self) -> String {
        self.component.instance_name()
    }

    /// The version to install, if it differs from the installed one.
    pub fn pending_version(&self) -> Option<&Version> {
        self.next_version
            .as_ref()
            .filter(|v| **v != self.component.version)
    }
}

impl fmt::Display for UpgradeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next = match self.pending_version() {
            Some(v) => version_tag(v),
            None => "Already up to date".to_string(),
        };
        write!(
            f,
            "{} {} -> {}",
            self.upgrade_ref(),
            version_tag(&self.component.version),
            next
        )
    }
}

/// A set of upgrades that keeps the whole fleet on one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    pub contract: Contract,
    pub items: Vec<UpgradeItem>,
}

impl UpgradePlan {
    /// Build a plan with items in upgrade order.
    pub fn new(contract: Contract, mut items: Vec<UpgradeItem>) -> Self {
        sort_items(&mut items);
        Self { contract, items }
    }

    /// True if at least one item has no target version.
    pub fn is_partial(&self) -> bool {
        self.items.iter().any(|i| i.next_version.is_none())
    }

    /// Items that actually change the installed version.
    pub fn pending(&self) -> impl Iterator<Item = &UpgradeItem> {
        self.items.iter().filter(|i| i.pending_version().is_some())
    }

    /// True if applying the plan changes nothing.
    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }
}

/// Order by kind precedence, then instance name for a stable total order.
pub(crate) fn sort_items(items: &mut [UpgradeItem]) {
    items.sort_by(|a, b| {
        a.component
            .kind()
            .cmp(&b.component.kind())
            .then_with(|| a.upgrade_ref().cmp(&b.upgrade_ref()))
    });
}

/// The single core component of the fleet.
pub(crate) fn single_core(fleet: &[Component]) -> Result<&Component, PlanError> {
    let cores: Vec<&Component> = fleet
        .iter()
        .filter(|c| c.kind() == ComponentKind::Core)
        .collect();
    match cores.as_slice() {
        [core] => Ok(*core),
        _ => Err(PlanError::NotExactlyOneCore { found: cores.len() }),
    }
}

/// Plans produced for a fleet, with the warnings gathered on the way.
#[derive(Debug)]
pub struct PlanSet {
    pub plans: Vec<UpgradePlan>,
    pub diagnostics: Diagnostics,
}

/// Build one upgrade plan per contract the core component can reach.
///
/// The first plan keeps the core's current contract. Plans that change the
/// contract are dropped unless every component has a version for it.
pub async fn build_plans<R: ReleaseSource + ?Sized>(
    fleet: &[Component],
    releases: &R,
) -> Result<PlanSet, PlanError> {
    tracing::info!("Checking new release availability...");

    let core = single_core(fleet)?;
    let mut pass = ResolutionPass::new(releases);

    let (current_contract, contracts) = {
        let info = pass
            .info(core)
            .await
            .map_err(|source| PlanError::CoreMetadata { source })?;
        (info.current_contract.clone(), info.contracts_for_upgrade())
    };
    if contracts.is_empty() {
        return Err(PlanError::NoUpgradeTargets {
            component: core.instance_name(),
        });
    }

    let mut plans = Vec::with_capacity(contracts.len());
    for contract in contracts {
        let plan = assemble(&mut pass, fleet, &contract).await?;

        // All components change contract together or not at all.
        if plan.is_partial() && plan.contract != current_contract {
            pass.diagnostics_mut().warn(Warning::dropped_plan(format!(
                "no upgrade to the {} contract: not every provider has a release for it",
                plan.contract
            )));
            continue;
        }
        tracing::debug!(
            contract = %plan.contract,
            partial = plan.is_partial(),
            "Upgrade plan assembled"
        );
        plans.push(plan);
    }

    Ok(PlanSet {
        plans,
        diagnostics: pass.into_diagnostics(),
    })
}

/// Build the plan moving every component to its latest version for `contract`.
pub async fn plan_for_contract<R: ReleaseSource + ?Sized>(
    fleet: &[Component],
    releases: &R,
    contract: &Contract,
) -> Result<UpgradePlan, PlanError> {
    let mut pass = ResolutionPass::new(releases);
    assemble(&mut pass, fleet, contract).await
}

async fn assemble<R: ReleaseSource + ?Sized>(
    pass: &mut ResolutionPass<'_, R>,
    fleet: &[Component],
    contract: &Contract,
) -> Result<UpgradePlan, PlanError> {
    let mut items = Vec::with_capacity(fleet.len());
    for component in fleet {
        let info = pass.info(component).await?;
        let next_version = info.latest_version_for_contract(contract).cloned();
        items.push(UpgradeItem::new(component.clone(), next_version));
    }
    Ok(UpgradePlan::new(contract.clone(), items))
}
