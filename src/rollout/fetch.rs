// ABOUTME: Release source wrapper retrying transient fetch failures.
// ABOUTME: Planning and rollout read metadata and packaged components through it.

use async_trait::async_trait;
use semver::Version;

use super::backoff::{Backoff, Exhausted, Sleeper, retry};
use crate::fleet::{ComponentBundle, FetchError, ReleaseMetadata, ReleaseSource};
use crate::types::{ComponentRef, NamespaceName};

/// Retries `Unavailable` and I/O failures of another release source.
///
/// Other failures are returned after the first attempt. Once the backoff
/// gives up, the last failure is wrapped in `FetchError::Exhausted`.
pub struct RetryingReleases<'a> {
    inner: &'a dyn ReleaseSource,
    backoff: &'a Backoff,
    sleeper: &'a dyn Sleeper,
}

impl<'a> RetryingReleases<'a> {
    pub fn new(
        inner: &'a dyn ReleaseSource,
        backoff: &'a Backoff,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            inner,
            backoff,
            sleeper,
        }
    }
}

fn give_up(Exhausted { attempts, last }: Exhausted<FetchError>) -> FetchError {
    if attempts > 1 {
        tracing::warn!(attempts, error = %last, "Giving up on release source");
        FetchError::Exhausted {
            attempts,
            last: Box::new(last),
        }
    } else {
        last
    }
}

#[async_trait]
impl ReleaseSource for RetryingReleases<'_> {
    async fn release_metadata(
        &self,
        component: &ComponentRef,
    ) -> Result<ReleaseMetadata, FetchError> {
        let inner = self.inner;
        retry(self.backoff, self.sleeper, "fetch release metadata", || {
            inner.release_metadata(component)
        })
        .await
        .map_err(give_up)
    }

    async fn packaged_components(
        &self,
        component: &ComponentRef,
        version: &Version,
        target_namespace: &NamespaceName,
    ) -> Result<ComponentBundle, FetchError> {
        let inner = self.inner;
        retry(self.backoff, self.sleeper, "fetch packaged components", || {
            inner.packaged_components(component, version, target_namespace)
        })
        .await
        .map_err(give_up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::MemoryReleases;
    use crate::rollout::RecordingSleeper;
    use crate::types::{ComponentKind, ProviderName};

    fn core() -> ComponentRef {
        ComponentRef::new(
            ComponentKind::Core,
            ProviderName::new("cluster-api").unwrap(),
            NamespaceName::new("capi-system"),
        )
    }

    #[tokio::test]
    async fn missing_metadata_is_not_retried() {
        let releases = MemoryReleases::new();
        let sleeper = RecordingSleeper::new();
        let backoff = Backoff::read();
        let retrying = RetryingReleases::new(&releases, &backoff, &sleeper);

        let err = retrying.release_metadata(&core()).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(sleeper.slept().is_empty());
        assert_eq!(releases.fetch_count(&core()), 1);
    }

    #[tokio::test]
    async fn single_step_backoff_keeps_the_original_error() {
        let releases = MemoryReleases::new().with_unavailable(&core());
        let sleeper = RecordingSleeper::new();
        let backoff = Backoff {
            steps: 1,
            ..Backoff::read()
        };
        let retrying = RetryingReleases::new(&releases, &backoff, &sleeper);

        let err = retrying.release_metadata(&core()).await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(_)));
        assert!(sleeper.slept().is_empty());
    }
}
