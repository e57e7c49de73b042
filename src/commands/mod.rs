// ABOUTME: Command module aggregator for the fleetup CLI.
// ABOUTME: Re-exports plan and apply command handlers.

mod apply;
mod plan;
mod workspace;

pub use apply::{ApplyTarget, ProviderArgs, apply};
pub use plan::plan;
