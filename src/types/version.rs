// ABOUTME: Semantic version helpers accepting an optional leading "v".
// ABOUTME: Serde adapters keep release tags ("v0.4.2") on the wire.

use semver::Version;

/// Parse a version tag, with or without the leading `v`.
pub fn parse_version(value: &str) -> Result<Version, semver::Error> {
    let trimmed = value.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
}

/// Render a version as a release tag.
pub fn version_tag(version: &Version) -> String {
    format!("v{version}")
}

/// Serde adapter for a single tagged version.
pub mod tagged {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(version: &Version, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::version_tag(version))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Version, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_version(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a list of tagged versions.
pub mod tagged_vec {
    use semver::Version;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        versions: &[Version],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(versions.len()))?;
        for version in versions {
            seq.serialize_element(&super::version_tag(version))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Version>, D::Error> {
        let values: Vec<String> = Vec::deserialize(deserializer)?;
        values
            .iter()
            .map(|s| super::parse_version(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::de::Error::custom)
    }
}
