// ABOUTME: Application-wide error types for fleetup.
// ABOUTME: Uses thiserror for ergonomic error handling and classifies engine failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::rollout::RolloutError;
use crate::upgrade::{PlanError, UpgradeError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid upgrade request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<UpgradeError> for Error {
    fn from(err: UpgradeError) -> Self {
        match err {
            UpgradeError::Plan(e) => Error::Plan(e),
            UpgradeError::Rollout(e) => Error::Rollout(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// How a failure relates to fleet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invariant violation found before any mutation. Never retried.
    Configuration,
    /// Remote hiccup that is retried locally.
    Transient,
    /// Retries exhausted or a non-retryable remote failure.
    Fatal,
    /// Delete or install failed mid-replacement. The rollout stopped in place.
    Mutation,
}
