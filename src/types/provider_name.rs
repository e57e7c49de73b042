// ABOUTME: DNS-compatible provider name validation.
// ABOUTME: Ensures provider names follow RFC 1123 label requirements.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderNameError {
    #[error("provider name cannot be empty")]
    Empty,

    #[error("provider name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("provider name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("provider name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("provider name must be lowercase")]
    NotLowercase,

    #[error("invalid character in provider name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderName(String);

impl ProviderName {
    pub fn new(value: &str) -> Result<Self, ProviderNameError> {
        if value.is_empty() {
            return Err(ProviderNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ProviderNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ProviderNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ProviderNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ProviderNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ProviderNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ProviderName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProviderName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ProviderName::new(&s).map_err(serde::de::Error::custom)
    }
}
