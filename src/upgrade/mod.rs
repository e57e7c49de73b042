// ABOUTME: Upgrade planning: version resolution, plan building and custom plan validation.
// ABOUTME: Planning never mutates the fleet; the upgrader hands plans to the rollout.

mod custom;
mod error;
mod info;
mod plan;
mod policy;
mod upgrader;

pub use custom::{ParseUpgradeRequestError, UpgradeRequest, validate_custom_plan};
pub use error::{PlanError, ResolveError, UpgradeError};
pub use info::{NextVersion, ResolutionPass, UpgradeInfo, resolve};
pub use plan::{PlanSet, UpgradeItem, UpgradePlan, build_plans, plan_for_contract};
pub use policy::ContractPolicy;
pub use upgrader::Upgrader;
