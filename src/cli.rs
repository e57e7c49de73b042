// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleetup")]
#[command(about = "Contract-consistent upgrades for provider fleets")]
#[command(version)]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new fleetup.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show the upgrade plans available to the fleet
    Plan,

    /// Apply an upgrade plan
    Apply {
        /// Upgrade every provider to the latest version for this contract
        #[arg(long, conflicts_with_all = ["core", "bootstrap", "control_plane", "infrastructure"])]
        contract: Option<String>,

        /// Core provider to upgrade, as <namespace>/<name>:<version>
        #[arg(long, value_name = "NAMESPACE/NAME:VERSION")]
        core: Option<String>,

        /// Bootstrap provider to upgrade (repeatable)
        #[arg(long, value_name = "NAMESPACE/NAME:VERSION")]
        bootstrap: Vec<String>,

        /// Control plane provider to upgrade (repeatable)
        #[arg(long, value_name = "NAMESPACE/NAME:VERSION")]
        control_plane: Vec<String>,

        /// Infrastructure provider to upgrade (repeatable)
        #[arg(long, value_name = "NAMESPACE/NAME:VERSION")]
        infrastructure: Vec<String>,
    },
}
