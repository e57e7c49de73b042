// ABOUTME: Component identity and installed-component records.
// ABOUTME: Derives manifest labels and instance names used across planning and rollout.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::contract::Contract;
use super::id::NamespaceName;
use super::kind::ComponentKind;
use super::provider_name::ProviderName;
use super::version;

/// Label value shared by every core component.
pub const CORE_MANIFEST_LABEL: &str = "cluster-api";

/// Identity of a component: kind, name and the namespace it is installed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub kind: ComponentKind,
    pub name: ProviderName,
    pub namespace: NamespaceName,
}

impl ComponentRef {
    pub fn new(kind: ComponentKind, name: ProviderName, namespace: NamespaceName) -> Self {
        Self {
            kind,
            name,
            namespace,
        }
    }

    /// Label identifying the component's manifests, e.g. `bootstrap-kubeadm`.
    pub fn manifest_label(&self) -> String {
        match self.kind.label_prefix() {
            None => CORE_MANIFEST_LABEL.to_string(),
            Some(prefix) => format!("{}-{}", prefix, self.name),
        }
    }

    /// Unique name of this instance in the fleet, e.g. `capi-system/cluster-api`.
    pub fn instance_name(&self) -> String {
        format!("{}/{}", self.namespace, self.manifest_label())
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instance_name())
    }
}

/// An installed component as recorded in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(flatten)]
    pub id: ComponentRef,

    #[serde(with = "version::tagged")]
    pub version: Version,

    /// Contract recorded at install time. Planning always re-derives it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<Contract>,
}

impl Component {
    pub fn new(id: ComponentRef, version: Version) -> Self {
        Self {
            id,
            version,
            contract: None,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.id.kind
    }

    pub fn instance_name(&self) -> String {
        self.id.instance_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_ref(kind: ComponentKind, name: &str, namespace: &str) -> ComponentRef {
        ComponentRef::new(
            kind,
            ProviderName::new(name).unwrap(),
            NamespaceName::new(namespace),
        )
    }

    #[test]
    fn core_uses_shared_label() {
        let core = component_ref(ComponentKind::Core, "cluster-api", "capi-system");
        assert_eq!(core.manifest_label(), "cluster-api");
        assert_eq!(core.instance_name(), "capi-system/cluster-api");
    }

    #[test]
    fn other_kinds_are_prefixed() {
        let infra = component_ref(ComponentKind::Infrastructure, "docker", "capd-system");
        assert_eq!(infra.manifest_label(), "infrastructure-docker");
        assert_eq!(infra.instance_name(), "capd-system/infrastructure-docker");

        let cp = component_ref(ComponentKind::ControlPlane, "kubeadm", "capi-kubeadm");
        assert_eq!(cp.manifest_label(), "control-plane-kubeadm");
    }

    #[test]
    fn component_round_trips_through_yaml() {
        let yaml = r#"
kind: BootstrapProvider
name: kubeadm
namespace: capi-kubeadm-bootstrap-system
version: v0.4.2
"#;
        let component: Component = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(component.kind(), ComponentKind::Bootstrap);
        assert_eq!(component.version, Version::new(0, 4, 2));
        assert!(component.contract.is_none());

        let out = serde_yaml::to_string(&component).unwrap();
        assert!(out.contains("version: v0.4.2"));
    }
}
