// ABOUTME: State transition methods for rollout orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use semver::Version;
use snafu::ResultExt;
use std::marker::PhantomData;

use super::drain::Drainer;
use super::fetch::RetryingReleases;
use super::error::{
    ComponentFetchSnafu, DeleteSnafu, DrainSnafu, InstallSnafu, InventoryCheckSnafu,
    MultipleInstancesNotSupportedSnafu, RecordInstallSnafu, RolloutError, WebhookCleanupSnafu,
};
use super::pipeline::{ReplacedComponent, Rollout, RolloutReport};
use super::state::{Completed, Drained, Guarded, Planned, Replaced};
use crate::fleet::{DeleteOptions, InventoryError, ReleaseSource, UnitSelector};
use crate::types::{ComponentKind, ComponentRef, version_tag};

/// A pending item: the component, its installed version and its target.
type Pending = (ComponentRef, Version, Version);

// =============================================================================
// Internal Helpers
// =============================================================================

impl<'a, S> Rollout<'a, S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self) -> Rollout<'a, T> {
        Rollout {
            cluster: self.cluster,
            settings: self.settings,
            sleeper: self.sleeper,
            plan: self.plan,
            report: self.report,
            state: PhantomData,
        }
    }

    /// Items whose target differs from the installed version, in upgrade order.
    fn pending(&self) -> Vec<Pending> {
        self.plan
            .pending()
            .filter_map(|item| {
                item.pending_version().map(|next| {
                    (
                        item.component.id.clone(),
                        item.component.version.clone(),
                        next.clone(),
                    )
                })
            })
            .collect()
    }
}

// =============================================================================
// Planned -> Guarded
// =============================================================================

impl<'a> Rollout<'a, Planned> {
    /// Refuse plans the fleet cannot take.
    ///
    /// The legacy contract cannot address several instances of one provider,
    /// so such fleets are rejected before anything is touched.
    ///
    /// # Errors
    ///
    /// Returns `RolloutError::MultipleInstancesNotSupported` naming the
    /// duplicated provider.
    #[must_use = "rollout state must be used"]
    pub async fn guard(self) -> Result<Rollout<'a, Guarded>, RolloutError> {
        if self.settings.policy.is_legacy(&self.plan.contract) {
            for kind in ComponentKind::ALL {
                match self.cluster.inventory.check_single_instance(kind).await {
                    Err(source @ InventoryError::MultipleInstances { .. }) => {
                        Err::<(), _>(source).context(MultipleInstancesNotSupportedSnafu {
                            contract: self.plan.contract.clone(),
                        })?
                    }
                    other => other.context(InventoryCheckSnafu)?,
                }
            }
        }
        Ok(self.transition::<Guarded>())
    }
}

// =============================================================================
// Guarded -> Drained
// =============================================================================

impl<'a> Rollout<'a, Guarded> {
    /// Scale every pending component down to zero replicas.
    ///
    /// All components are drained before any is replaced, so no old
    /// controller runs next to a new one.
    ///
    /// # Errors
    ///
    /// Returns `RolloutError::Drain` for the first component that cannot be
    /// drained. Components drained so far stay at zero replicas.
    #[must_use = "rollout state must be used"]
    pub async fn drain(mut self) -> Result<Rollout<'a, Drained>, RolloutError> {
        let settings = self.settings;
        let drainer = Drainer::new(self.cluster.store, self.sleeper, &settings.drain);
        for (component, _, _) in self.pending() {
            tracing::info!(component = %component.instance_name(), "Scaling down");
            let drained = drainer
                .drain(&UnitSelector::for_component(&component))
                .await
                .context(DrainSnafu {
                    component: component.instance_name(),
                })?;
            self.report.drained_units += drained;
        }
        Ok(self.transition::<Drained>())
    }
}

// =============================================================================
// Drained -> Replaced
// =============================================================================

impl<'a> Rollout<'a, Drained> {
    /// Delete and reinstall every pending component at its target version.
    ///
    /// CRDs, namespaces and inventory records survive the delete. The
    /// inventory is updated only after the new objects are installed.
    /// Transient fetch failures are retried under the fetch backoff.
    ///
    /// # Errors
    ///
    /// Stops at the first failure. Nothing is rolled back: components
    /// already replaced keep their new version.
    #[must_use = "rollout state must be used"]
    pub async fn replace(mut self) -> Result<Rollout<'a, Replaced>, RolloutError> {
        let contract = self.plan.contract.clone();
        let settings = self.settings;
        let releases = RetryingReleases::new(self.cluster.releases, &settings.fetch, self.sleeper);
        for (component, from, to) in self.pending() {
            let name = component.instance_name();
            tracing::info!(component = %name, version = %version_tag(&to), "Upgrading");

            let bundle = releases
                .packaged_components(&component, &to, &component.namespace)
                .await
                .context(ComponentFetchSnafu {
                    component: name.as_str(),
                    version: version_tag(&to),
                })?;

            self.cluster
                .store
                .delete(&component, &DeleteOptions::for_upgrade())
                .await
                .context(DeleteSnafu {
                    component: name.as_str(),
                })?;

            self.cluster
                .store
                .create(&bundle)
                .await
                .context(InstallSnafu {
                    component: name.as_str(),
                    version: version_tag(&to),
                })?;

            self.cluster
                .inventory
                .record_install(&component, &to, &contract)
                .await
                .context(RecordInstallSnafu {
                    component: name.as_str(),
                    version: version_tag(&to),
                })?;

            self.report.replaced.push(ReplacedComponent {
                component: name,
                from: version_tag(&from),
                to: version_tag(&to),
            });
        }
        Ok(self.transition::<Replaced>())
    }
}

// =============================================================================
// Replaced -> Completed
// =============================================================================

impl<'a> Rollout<'a, Replaced> {
    /// Remove the namespace the legacy contract used for webhooks.
    ///
    /// Runs on every rollout to the supported contract, so a cleanup that
    /// failed before is completed by the next run. A namespace that is
    /// already gone is left alone.
    #[must_use = "rollout state must be used"]
    pub async fn cleanup(mut self) -> Result<Rollout<'a, Completed>, RolloutError> {
        if !self.settings.policy.is_supported(&self.plan.contract) {
            return Ok(self.transition::<Completed>());
        }

        let namespace = &self.settings.webhook_namespace;
        let store = self.cluster.store;
        let exists = store
            .namespace_exists(namespace)
            .await
            .context(WebhookCleanupSnafu {
                namespace: namespace.clone(),
            })?;
        if exists {
            tracing::info!(namespace = %namespace, "Deleting obsolete webhook namespace");
            store
                .delete_namespace(namespace)
                .await
                .context(WebhookCleanupSnafu {
                    namespace: namespace.clone(),
                })?;
            self.report.deleted_namespace = Some(namespace.clone());
        }
        Ok(self.transition::<Completed>())
    }
}

// =============================================================================
// Completed
// =============================================================================

impl Rollout<'_, Completed> {
    /// Close the rollout and hand back its report.
    pub fn finish(mut self) -> RolloutReport {
        self.report.finished_at = Some(chrono::Utc::now());
        self.report
    }
}
