// ABOUTME: Drain controller scaling a component's units to zero replicas.
// ABOUTME: Retries conflicting writes and polls until no replica is left running.

use serde::Deserialize;
use std::fmt;

use super::backoff::{Backoff, Exhausted, Retryable, Sleeper, retry};
use crate::error::ErrorClass;
use crate::fleet::{StoreError, Unit, UnitRef, UnitSelector, UnitStore};

/// Backoff schedules used while draining.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrainSettings {
    #[serde(default = "Backoff::write")]
    pub write: Backoff,

    #[serde(default = "Backoff::scale_to_zero")]
    pub scale_to_zero: Backoff,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            write: Backoff::write(),
            scale_to_zero: Backoff::scale_to_zero(),
        }
    }
}

/// Errors draining units.
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("failed to list units {selector}: {source}")]
    List {
        selector: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to scale down {unit} after {attempts} attempt(s): {source}")]
    ScaleDown {
        unit: UnitRef,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("{unit} still has {replicas} replica(s) after {attempts} check(s)")]
    Timeout {
        unit: UnitRef,
        replicas: u32,
        attempts: u32,
    },

    #[error("failed to read {unit} after {attempts} attempt(s): {source}")]
    Poll {
        unit: UnitRef,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

impl DrainError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Fatal
    }

    /// The unit that could not be drained, if the failure concerns one.
    pub fn unit(&self) -> Option<&UnitRef> {
        match self {
            DrainError::List { .. } => None,
            DrainError::ScaleDown { unit, .. }
            | DrainError::Timeout { unit, .. }
            | DrainError::Poll { unit, .. } => Some(unit),
        }
    }
}

/// Why a unit is not drained yet.
#[derive(Debug)]
enum PollError {
    Running(u32),
    Store(StoreError),
}

impl Retryable for PollError {
    fn is_retryable(&self) -> bool {
        match self {
            PollError::Running(_) => true,
            PollError::Store(e) => e.is_retryable(),
        }
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Running(n) => write!(f, "{n} replica(s) still running"),
            PollError::Store(e) => write!(f, "{e}"),
        }
    }
}

/// Scales units to zero and waits for them to stop.
pub struct Drainer<'a> {
    store: &'a dyn UnitStore,
    sleeper: &'a dyn Sleeper,
    settings: &'a DrainSettings,
}

impl<'a> Drainer<'a> {
    pub fn new(
        store: &'a dyn UnitStore,
        sleeper: &'a dyn Sleeper,
        settings: &'a DrainSettings,
    ) -> Self {
        Self {
            store,
            sleeper,
            settings,
        }
    }

    /// Drain every unit matching `selector`, one after the other.
    ///
    /// Returns the number of units drained. Stops at the first unit that
    /// cannot be drained.
    pub async fn drain(&self, selector: &UnitSelector) -> Result<usize, DrainError> {
        let units = self
            .store
            .list(selector)
            .await
            .map_err(|source| DrainError::List {
                selector: selector.to_string(),
                source,
            })?;

        for unit in &units {
            let unit = unit.unit_ref();
            self.scale_down(&unit).await?;
            self.wait_for_zero(&unit).await?;
            tracing::debug!(unit = %unit, "Unit drained");
        }
        Ok(units.len())
    }

    /// Set desired replicas to zero, re-reading the unit on every attempt.
    pub async fn scale_down(&self, unit: &UnitRef) -> Result<(), DrainError> {
        let store = self.store;
        retry(&self.settings.write, self.sleeper, "scale down", || async move {
            let current = store.get(unit).await?;
            if current.desired_replicas == 0 {
                return Ok(());
            }
            store
                .update(&Unit {
                    desired_replicas: 0,
                    ..current
                })
                .await
        })
        .await
        .map_err(|Exhausted { attempts, last }| DrainError::ScaleDown {
            unit: unit.clone(),
            attempts,
            source: last,
        })
    }

    /// Poll until the store reports no running replica.
    pub async fn wait_for_zero(&self, unit: &UnitRef) -> Result<(), DrainError> {
        let store = self.store;
        retry(
            &self.settings.scale_to_zero,
            self.sleeper,
            "wait for scale down",
            || async move {
                let current = store.get(unit).await.map_err(PollError::Store)?;
                match current.observed_replicas {
                    0 => Ok(()),
                    n => Err(PollError::Running(n)),
                }
            },
        )
        .await
        .map_err(|Exhausted { attempts, last }| match last {
            PollError::Running(replicas) => DrainError::Timeout {
                unit: unit.clone(),
                replicas,
                attempts,
            },
            PollError::Store(source) => DrainError::Poll {
                unit: unit.clone(),
                attempts,
                source,
            },
        })
    }
}
