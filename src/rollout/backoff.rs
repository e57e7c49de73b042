// ABOUTME: Jittered backoff with a pure retry decision and an injected sleeper.
// ABOUTME: Used for release fetches, scale-down writes and replica polling.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Errors that may clear up if the operation is tried again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Backoff schedule: `steps` attempts, delays growing by `factor`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Backoff {
    /// Delay after the first failed attempt.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Each delay is stretched by up to `jitter * delay`.
    #[serde(default)]
    pub jitter: f64,

    /// Total number of attempts, the first included.
    pub steps: u32,

    /// Upper bound for the un-jittered delay.
    #[serde(default, with = "humantime_serde")]
    pub cap: Option<Duration>,
}

fn default_factor() -> f64 {
    1.0
}

impl Backoff {
    /// Schedule for writes that may hit conflicts: 500ms, x1.5, 10 attempts.
    pub fn write() -> Self {
        Self {
            duration: Duration::from_millis(500),
            factor: 1.5,
            jitter: 0.4,
            steps: 10,
            cap: None,
        }
    }

    /// Schedule for reads from a release source: 250ms, x1.5, 9 attempts.
    pub fn read() -> Self {
        Self {
            duration: Duration::from_millis(250),
            factor: 1.5,
            jitter: 0.1,
            steps: 9,
            cap: None,
        }
    }

    /// Schedule for waiting on replicas to reach zero: 1s, x1, 60 attempts.
    pub fn scale_to_zero() -> Self {
        Self {
            duration: Duration::from_secs(1),
            factor: 1.0,
            jitter: 0.4,
            steps: 60,
            cap: None,
        }
    }

    /// Un-jittered delay after the `attempt`-th failure (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.duration.as_secs_f64() * self.factor.max(0.0).powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.cap {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Delay after the `attempt`-th failure given a jitter sample in `[0, 1)`.
    pub fn delay(&self, attempt: u32, jitter_sample: f64) -> Duration {
        let base = self.base_delay(attempt);
        let stretch = self.jitter.max(0.0) * jitter_sample.clamp(0.0, 1.0);
        if stretch == 0.0 {
            return base;
        }
        let extra = Duration::try_from_secs_f64(base.as_secs_f64() * stretch).unwrap_or_default();
        base.saturating_add(extra)
    }

    /// Decide what to do after the `attempt`-th attempt failed with `err`.
    pub fn decide<E: Retryable + ?Sized>(
        &self,
        attempt: u32,
        err: &E,
        jitter_sample: f64,
    ) -> RetryDecision {
        if !err.is_retryable() || attempt >= self.steps {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay(attempt, jitter_sample))
    }
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// The last error of an operation that was given up on.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or `backoff` gives up.
pub async fn retry<T, E, F, Fut>(
    backoff: &Backoff,
    sleeper: &dyn Sleeper,
    what: &str,
    mut op: F,
) -> Result<T, Exhausted<E>>
where
    E: Retryable + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let sample: f64 = rand::thread_rng().r#gen();
        match backoff.decide(attempt, &err, sample) {
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(attempt, ?delay, error = %err, "{what}: retrying");
                sleeper.sleep(delay).await;
            }
            RetryDecision::GiveUp => {
                return Err(Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
        }
    }
}
