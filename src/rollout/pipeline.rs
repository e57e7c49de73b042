// ABOUTME: Generic rollout struct parameterized by state marker.
// ABOUTME: Carries the plan, collaborators and the report built along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::backoff::{Backoff, Sleeper};
use super::drain::DrainSettings;
use super::state::Planned;
use crate::fleet::Cluster;
use crate::types::{Contract, NamespaceName};
use crate::upgrade::{ContractPolicy, UpgradePlan};

/// Settings shared by every rollout of an engine instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RolloutSettings {
    #[serde(default)]
    pub policy: ContractPolicy,

    #[serde(default)]
    pub drain: DrainSettings,

    /// Retries of release metadata and packaged component fetches.
    #[serde(default = "Backoff::read")]
    pub fetch: Backoff,

    /// Namespace left over from the legacy contract, deleted after a rollout
    /// to the supported contract.
    #[serde(default = "default_webhook_namespace")]
    pub webhook_namespace: NamespaceName,
}

fn default_webhook_namespace() -> NamespaceName {
    NamespaceName::new("capi-webhook-system")
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            policy: ContractPolicy::default(),
            drain: DrainSettings::default(),
            fetch: Backoff::read(),
            webhook_namespace: default_webhook_namespace(),
        }
    }
}

/// A component reinstalled at a new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacedComponent {
    pub component: String,
    pub from: String,
    pub to: String,
}

/// What a rollout changed.
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    pub contract: Contract,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub drained_units: usize,
    pub replaced: Vec<ReplacedComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_namespace: Option<NamespaceName>,
}

impl RolloutReport {
    fn new(contract: Contract) -> Self {
        Self {
            contract,
            started_at: Utc::now(),
            finished_at: None,
            drained_units: 0,
            replaced: Vec::new(),
            deleted_namespace: None,
        }
    }

    /// True if no component was replaced.
    pub fn is_noop(&self) -> bool {
        self.replaced.is_empty()
    }
}

/// A rollout in progress, parameterized by its current state.
///
/// The state markers carry no data; only the available transitions differ.
pub struct Rollout<'a, S> {
    pub(crate) cluster: Cluster<'a>,
    pub(crate) settings: &'a RolloutSettings,
    pub(crate) sleeper: &'a dyn Sleeper,
    pub(crate) plan: UpgradePlan,
    pub(crate) report: RolloutReport,
    pub(crate) state: PhantomData<S>,
}

impl<'a> Rollout<'a, Planned> {
    /// Start a rollout of `plan`.
    pub fn new(
        cluster: Cluster<'a>,
        settings: &'a RolloutSettings,
        sleeper: &'a dyn Sleeper,
        plan: UpgradePlan,
    ) -> Self {
        // Kind order decides the order of every phase.
        let plan = UpgradePlan::new(plan.contract, plan.items);
        let report = RolloutReport::new(plan.contract.clone());
        Rollout {
            cluster,
            settings,
            sleeper,
            plan,
            report,
            state: PhantomData,
        }
    }
}

impl<S> Rollout<'_, S> {
    pub fn plan(&self) -> &UpgradePlan {
        &self.plan
    }

    /// The report so far.
    pub fn report(&self) -> &RolloutReport {
        &self.report
    }
}
