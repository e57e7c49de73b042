// ABOUTME: Apply command implementation.
// ABOUTME: Runs a rollout for a whole contract or for the requested providers.

use super::workspace::Workspace;
use fleetup::error::{Error, Result};
use fleetup::output::Output;
use fleetup::rollout::TokioSleeper;
use fleetup::types::{ComponentKind, Contract};
use fleetup::upgrade::{UpgradeRequest, Upgrader};
use nonempty::NonEmpty;
use std::path::Path;

/// What `apply` upgrades.
pub enum ApplyTarget {
    /// Every provider, to the latest version for the contract.
    Contract(String),
    /// Only the listed providers.
    Providers(ProviderArgs),
}

/// Provider arguments as given on the command line.
pub struct ProviderArgs {
    pub core: Option<String>,
    pub bootstrap: Vec<String>,
    pub control_plane: Vec<String>,
    pub infrastructure: Vec<String>,
}

impl ProviderArgs {
    fn requests(&self) -> Result<NonEmpty<UpgradeRequest>> {
        let by_kind = [
            (ComponentKind::Core, self.core.iter().collect::<Vec<_>>()),
            (ComponentKind::Bootstrap, self.bootstrap.iter().collect()),
            (ComponentKind::ControlPlane, self.control_plane.iter().collect()),
            (ComponentKind::Infrastructure, self.infrastructure.iter().collect()),
        ];

        let mut requests = Vec::new();
        for (kind, values) in by_kind {
            for value in values {
                let request = UpgradeRequest::parse(kind, value)
                    .map_err(|e| Error::InvalidRequest(format!("--{}: {e}", flag(kind))))?;
                requests.push(request);
            }
        }

        NonEmpty::from_vec(requests).ok_or_else(|| {
            Error::InvalidRequest(
                "nothing to upgrade: pass --contract or at least one provider".to_string(),
            )
        })
    }
}

fn flag(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Core => "core",
        ComponentKind::Bootstrap => "bootstrap",
        ComponentKind::ControlPlane => "control-plane",
        ComponentKind::Infrastructure => "infrastructure",
    }
}

/// Apply an upgrade and write the resulting fleet state back.
pub async fn apply(dir: &Path, target: ApplyTarget, mut output: Output) -> Result<()> {
    output.start_timer();
    let workspace = Workspace::open(dir, &output)?;
    let settings = workspace.config.settings();
    let upgrader = Upgrader::new(workspace.cluster(), &settings, &TokioSleeper);

    let result = match target {
        ApplyTarget::Contract(contract) => {
            output.progress(&format!("Upgrading the fleet to the {contract} contract"));
            upgrader.apply_plan(&Contract::new(contract)).await
        }
        ApplyTarget::Providers(args) => {
            let requests = args.requests()?;
            output.progress(&format!("Upgrading {} provider(s)", requests.len()));
            upgrader.apply_custom_plan(&requests).await
        }
    };

    // A failed rollout may have changed part of the fleet.
    workspace.save()?;
    let report = result?;

    for replaced in &report.replaced {
        output.progress(&format!(
            "  ✓ {} {} -> {}",
            replaced.component, replaced.from, replaced.to
        ));
    }
    if let Some(namespace) = &report.deleted_namespace {
        output.progress(&format!("  ✓ deleted namespace {namespace}"));
    }
    output.data("report", "rollout finished", &report);

    if report.is_noop() {
        output.success("Nothing to upgrade");
    } else {
        output.success(&format!(
            "Upgraded {} provider(s) to the {} contract",
            report.replaced.len(),
            report.contract
        ));
    }
    Ok(())
}
