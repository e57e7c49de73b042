// ABOUTME: Component kinds and their fixed upgrade precedence.
// ABOUTME: Core < Bootstrap < ControlPlane < Infrastructure orders plans and rollouts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown component kind: {0}")]
pub struct UnknownKindError(String);

/// The role a component plays in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    #[serde(rename = "CoreProvider", alias = "core")]
    Core,
    #[serde(rename = "BootstrapProvider", alias = "bootstrap")]
    Bootstrap,
    #[serde(rename = "ControlPlaneProvider", alias = "control-plane")]
    ControlPlane,
    #[serde(rename = "InfrastructureProvider", alias = "infrastructure")]
    Infrastructure,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Core,
        ComponentKind::Bootstrap,
        ComponentKind::ControlPlane,
        ComponentKind::Infrastructure,
    ];

    /// Upgrade precedence. Lower values are upgraded first.
    pub fn order(self) -> u8 {
        match self {
            ComponentKind::Core => 0,
            ComponentKind::Bootstrap => 1,
            ComponentKind::ControlPlane => 2,
            ComponentKind::Infrastructure => 3,
        }
    }

    /// Prefix used when building manifest labels. Core has none.
    pub fn label_prefix(self) -> Option<&'static str> {
        match self {
            ComponentKind::Core => None,
            ComponentKind::Bootstrap => Some("bootstrap"),
            ComponentKind::ControlPlane => Some("control-plane"),
            ComponentKind::Infrastructure => Some("infrastructure"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Core => "CoreProvider",
            ComponentKind::Bootstrap => "BootstrapProvider",
            ComponentKind::ControlPlane => "ControlPlaneProvider",
            ComponentKind::Infrastructure => "InfrastructureProvider",
        }
    }
}

impl PartialOrd for ComponentKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order().cmp(&other.order())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CoreProvider" | "core" => Ok(ComponentKind::Core),
            "BootstrapProvider" | "bootstrap" => Ok(ComponentKind::Bootstrap),
            "ControlPlaneProvider" | "control-plane" => Ok(ComponentKind::ControlPlane),
            "InfrastructureProvider" | "infrastructure" => Ok(ComponentKind::Infrastructure),
            other => Err(UnknownKindError(other.to_string())),
        }
    }
}
