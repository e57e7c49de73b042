// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Component identities, kinds, contracts, and tagged semantic versions.

mod component;
mod contract;
mod id;
mod kind;
mod provider_name;
pub mod version;

pub use component::{CORE_MANIFEST_LABEL, Component, ComponentRef};
pub use contract::Contract;
pub use id::{NamespaceName, UnitName};
pub use kind::{ComponentKind, UnknownKindError};
pub use provider_name::{ProviderName, ProviderNameError};
pub use version::{parse_version, version_tag};
