// ABOUTME: Upgrader facade reading the fleet and chaining planning with rollout.
// ABOUTME: Each call reads a fresh fleet snapshot and retries transient release reads.

use nonempty::NonEmpty;

use super::custom::{UpgradeRequest, validate_custom_plan};
use super::error::{PlanError, UpgradeError};
use super::plan::{PlanSet, UpgradePlan, build_plans, plan_for_contract};
use crate::fleet::Cluster;
use crate::rollout::{RetryingReleases, RolloutReport, RolloutSettings, Sleeper, execute};
use crate::types::{Component, Contract};

/// Plans and applies upgrades for one fleet.
///
/// Release source reads are retried under `RolloutSettings::fetch`.
/// `apply_plan` and `apply_custom_plan` only ever target the supported
/// contract. A plan for the legacy contract has to be handed to
/// [`execute`] directly, which is where the single-instance guard applies.
pub struct Upgrader<'a> {
    cluster: Cluster<'a>,
    settings: &'a RolloutSettings,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Upgrader<'a> {
    pub fn new(
        cluster: Cluster<'a>,
        settings: &'a RolloutSettings,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            cluster,
            settings,
            sleeper,
        }
    }

    fn releases(&self) -> RetryingReleases<'a> {
        RetryingReleases::new(self.cluster.releases, &self.settings.fetch, self.sleeper)
    }

    async fn fleet(&self) -> Result<Vec<Component>, PlanError> {
        Ok(self.cluster.inventory.list().await?)
    }

    /// Every upgrade plan the fleet can take, current contract first.
    pub async fn plan(&self) -> Result<PlanSet, PlanError> {
        let fleet = self.fleet().await?;
        build_plans(&fleet, &self.releases()).await
    }

    /// The plan moving every component to its latest version for `contract`.
    pub async fn plan_for(&self, contract: &Contract) -> Result<UpgradePlan, PlanError> {
        let policy = &self.settings.policy;
        if !policy.is_supported(contract) {
            return Err(PlanError::UnsupportedContract {
                supported: policy.supported.clone(),
                requested: contract.clone(),
            });
        }
        let fleet = self.fleet().await?;
        plan_for_contract(&fleet, &self.releases(), contract).await
    }

    /// Validate user-requested upgrades into a plan without applying it.
    pub async fn custom_plan(
        &self,
        requests: &NonEmpty<UpgradeRequest>,
    ) -> Result<UpgradePlan, PlanError> {
        let requests: Vec<UpgradeRequest> = requests.iter().cloned().collect();
        let fleet = self.fleet().await?;
        validate_custom_plan(&fleet, &requests, &self.releases(), &self.settings.policy).await
    }

    /// Upgrade every component to its latest version for `contract`.
    pub async fn apply_plan(&self, contract: &Contract) -> Result<RolloutReport, UpgradeError> {
        let plan = self.plan_for(contract).await?;
        Ok(self.apply(plan).await?)
    }

    /// Upgrade the requested components, leaving the others as they are.
    pub async fn apply_custom_plan(
        &self,
        requests: &NonEmpty<UpgradeRequest>,
    ) -> Result<RolloutReport, UpgradeError> {
        let plan = self.custom_plan(requests).await?;
        Ok(self.apply(plan).await?)
    }

    /// Apply an already validated plan.
    pub async fn apply(
        &self,
        plan: UpgradePlan,
    ) -> Result<RolloutReport, crate::rollout::RolloutError> {
        execute(self.cluster, self.settings, self.sleeper, plan).await
    }
}
