// ABOUTME: Plan command implementation.
// ABOUTME: Lists one upgrade plan per reachable contract without touching the fleet.

use super::workspace::Workspace;
use fleetup::error::Result;
use fleetup::output::Output;
use fleetup::rollout::TokioSleeper;
use fleetup::types::version_tag;
use fleetup::upgrade::{UpgradePlan, Upgrader};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PlanView {
    contract: String,
    applicable: bool,
    items: Vec<ItemView>,
}

#[derive(Serialize)]
struct ItemView {
    component: String,
    current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_version: Option<String>,
}

impl PlanView {
    fn new(plan: &UpgradePlan, applicable: bool) -> Self {
        Self {
            contract: plan.contract.to_string(),
            applicable,
            items: plan
                .items
                .iter()
                .map(|item| ItemView {
                    component: item.upgrade_ref(),
                    current_version: version_tag(&item.component.version),
                    next_version: item.pending_version().map(version_tag),
                })
                .collect(),
        }
    }
}

/// Show the upgrade plans available to the fleet.
pub async fn plan(dir: &Path, mut output: Output) -> Result<()> {
    output.start_timer();
    let workspace = Workspace::open(dir, &output)?;
    let settings = workspace.config.settings();
    let upgrader = Upgrader::new(workspace.cluster(), &settings, &TokioSleeper);

    let set = upgrader.plan().await?;
    for warning in set.diagnostics.warnings() {
        output.warning(&warning.message);
    }

    let views: Vec<PlanView> = set
        .plans
        .iter()
        .map(|p| PlanView::new(p, settings.policy.is_supported(&p.contract)))
        .collect();
    output.data("plans", &format!("{} plan(s)", views.len()), &views);

    for (i, plan) in set.plans.iter().enumerate() {
        let current = if i == 0 { " (current)" } else { "" };
        output.line(&format!(
            "\nLatest releases available for the {} contract{current}:",
            plan.contract
        ));
        for item in &plan.items {
            output.line(&format!("  {item}"));
        }

        if plan.is_noop() {
            output.line("You are already up to date!");
        } else if settings.policy.is_supported(&plan.contract) {
            output.line(&format!(
                "\nYou can now apply the upgrade by executing:\n\n  fleetup apply --contract {}",
                plan.contract
            ));
        } else {
            output.line(&format!(
                "\nThis release of fleetup cannot upgrade to the {} contract.",
                plan.contract
            ));
        }
    }
    Ok(())
}
