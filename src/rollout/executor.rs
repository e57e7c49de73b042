// ABOUTME: Applies a validated upgrade plan to the fleet.
// ABOUTME: Runs guard, drain, replace and cleanup strictly in that order.

use super::backoff::Sleeper;
use super::error::RolloutError;
use super::pipeline::{Rollout, RolloutReport, RolloutSettings};
use crate::fleet::Cluster;
use crate::upgrade::UpgradePlan;

/// Apply `plan` to the fleet.
///
/// Every pending component is drained before the first one is replaced.
/// A plan without pending items leaves the fleet untouched. Failures stop
/// the rollout where it is; nothing is rolled back.
pub async fn execute(
    cluster: Cluster<'_>,
    settings: &RolloutSettings,
    sleeper: &dyn Sleeper,
    plan: UpgradePlan,
) -> Result<RolloutReport, RolloutError> {
    let rollout = Rollout::new(cluster, settings, sleeper, plan);
    let pending = rollout.plan().pending().count();
    tracing::info!(
        contract = %rollout.plan().contract,
        pending,
        "Starting rollout"
    );

    let rollout = rollout.guard().await?;
    let rollout = rollout.drain().await?;
    tracing::debug!(units = rollout.report().drained_units, "Drain complete");
    let rollout = rollout.replace().await?;
    let report = rollout.cleanup().await?.finish();

    if report.is_noop() {
        tracing::info!("Nothing to upgrade");
    } else {
        tracing::info!(replaced = report.replaced.len(), "Rollout complete");
    }
    Ok(report)
}
