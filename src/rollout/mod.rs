// ABOUTME: Rollout of upgrade plans using the type state pattern.
// ABOUTME: Exports the executor, drain controller, backoff, retrying fetches and state markers.

mod backoff;
mod drain;
mod error;
mod executor;
mod fetch;
mod pipeline;
mod state;
mod transitions;

pub use backoff::{
    Backoff, Exhausted, RecordingSleeper, RetryDecision, Retryable, Sleeper, TokioSleeper, retry,
};
pub use drain::{DrainError, DrainSettings, Drainer};
pub use error::{RolloutError, RolloutErrorKind, RolloutPhase};
pub use executor::execute;
pub use fetch::RetryingReleases;
pub use pipeline::{ReplacedComponent, Rollout, RolloutReport, RolloutSettings};
pub use state::{Completed, Drained, Guarded, Planned, Replaced};
