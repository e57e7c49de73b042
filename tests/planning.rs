// ABOUTME: Integration tests for the plan builder and version resolution.
// ABOUTME: Covers contract-consistent plans, the drop rule and per-pass metadata fetches.

mod support;

use fleetup::diagnostics::WarningKind;
use fleetup::error::ErrorClass;
use fleetup::fleet::FetchError;
use fleetup::types::{ComponentKind, Contract};
use fleetup::upgrade::{PlanError, ResolveError, build_plans, plan_for_contract};
use proptest::prelude::*;
use semver::Version;
use support::*;

#[tokio::test]
async fn partial_plan_changing_contract_is_dropped() {
    init_tracing();
    let (fleet, releases) = two_contract_fleet();

    let set = build_plans(&fleet, &releases).await.unwrap();

    assert_eq!(set.plans.len(), 1);
    let plan = &set.plans[0];
    assert_eq!(plan.contract, Contract::new("v1alpha4"));
    assert!(!plan.is_partial());
    for item in &plan.items {
        assert_eq!(item.next_version, Some(Version::new(0, 4, 5)));
    }
    assert_eq!(plan.items[0].component.kind(), ComponentKind::Core);

    let dropped: Vec<_> = set
        .diagnostics
        .warnings()
        .iter()
        .filter(|w| w.kind == WarningKind::DroppedPlan)
        .collect();
    assert_eq!(dropped.len(), 1);
    assert!(dropped[0].message.contains("v1alpha5"));
}

#[tokio::test]
async fn complete_plan_for_new_contract_is_kept() {
    let fleet = vec![core("v0.4.2"), control_plane("v0.4.2")];
    let releases = fleetup::fleet::MemoryReleases::new()
        .with_metadata(
            &fleet[0].id,
            metadata(&["v0.4.5", "v0.5.0"], &[(0, 4, "v1alpha4"), (0, 5, "v1alpha5")]),
        )
        .with_metadata(
            &fleet[1].id,
            metadata(&["v0.5.1"], &[(0, 4, "v1alpha4"), (0, 5, "v1alpha5")]),
        );

    let set = build_plans(&fleet, &releases).await.unwrap();

    let contracts: Vec<&str> = set.plans.iter().map(|p| p.contract.as_str()).collect();
    assert_eq!(contracts, vec!["v1alpha4", "v1alpha5"]);

    // Same-contract plans may lag behind.
    assert!(set.plans[0].is_partial());
    assert_eq!(set.plans[0].items[1].next_version, None);

    let next: Vec<_> = set.plans[1]
        .items
        .iter()
        .map(|i| i.next_version.clone().unwrap())
        .collect();
    assert_eq!(next, vec![Version::new(0, 5, 0), Version::new(0, 5, 1)]);
}

#[tokio::test]
async fn up_to_date_fleet_has_single_noop_plan() {
    let fleet = vec![core("v0.4.5")];
    let releases = fleetup::fleet::MemoryReleases::new().with_metadata(
        &fleet[0].id,
        metadata(&["v0.4.2", "v0.4.5"], &[(0, 4, "v1alpha4")]),
    );

    let set = build_plans(&fleet, &releases).await.unwrap();

    assert_eq!(set.plans.len(), 1);
    assert!(set.plans[0].is_noop());
}

#[tokio::test]
async fn fleet_without_core_is_rejected() {
    let (_, releases) = two_contract_fleet();
    let fleet = vec![control_plane("v0.4.2")];

    let err = build_plans(&fleet, &releases).await.unwrap_err();
    assert!(matches!(err, PlanError::NotExactlyOneCore { found: 0 }));
}

#[tokio::test]
async fn core_outside_every_series_fails_resolution() {
    let fleet = vec![core("v0.3.0")];
    let releases = fleetup::fleet::MemoryReleases::new().with_metadata(
        &fleet[0].id,
        metadata(&["v0.4.5"], &[(0, 4, "v1alpha4")]),
    );

    let err = build_plans(&fleet, &releases).await.unwrap_err();
    assert!(matches!(
        err,
        PlanError::CoreMetadata {
            source: ResolveError::NoMatchingReleaseSeries { .. }
        }
    ));
}

#[tokio::test]
async fn unreachable_metadata_names_the_component() {
    let (fleet, releases) = two_contract_fleet();
    let releases = releases.with_unavailable(&fleet[1].id);

    let err = build_plans(&fleet, &releases).await.unwrap_err();
    assert!(matches!(
        err,
        PlanError::Resolve(ResolveError::MetadataUnavailable { .. })
    ));
    assert!(err.to_string().contains("control-plane-kubeadm"));
}

#[tokio::test]
async fn metadata_is_fetched_once_per_pass() {
    let (fleet, releases) = two_contract_fleet();

    build_plans(&fleet, &releases).await.unwrap();
    assert_eq!(releases.fetch_count(&fleet[0].id), 1);
    assert_eq!(releases.fetch_count(&fleet[1].id), 1);

    // A new pass reads fresh metadata.
    plan_for_contract(&fleet, &releases, &Contract::new("v1alpha4"))
        .await
        .unwrap();
    assert_eq!(releases.fetch_count(&fleet[0].id), 2);
}

#[tokio::test]
async fn plan_for_contract_targets_latest_matching_versions() {
    let (fleet, releases) = two_contract_fleet();

    let plan = plan_for_contract(&fleet, &releases, &Contract::new("v1alpha5"))
        .await
        .unwrap();

    assert!(plan.is_partial());
    assert_eq!(plan.items[0].next_version, Some(Version::new(0, 5, 0)));
    assert_eq!(plan.items[1].next_version, None);
}

#[tokio::test]
async fn metadata_blips_within_budget_are_retried() {
    let (fleet, releases) = two_contract_fleet();
    let releases = releases.with_blips(&fleet[0].id, 2, 0);
    let scenario = Scenario::new(fleet.clone(), releases);

    let set = scenario.upgrader().plan().await.unwrap();

    assert_eq!(set.plans.len(), 1);
    assert_eq!(set.plans[0].contract.as_str(), "v1alpha4");
    assert_eq!(scenario.releases.fetch_count(&fleet[0].id), 3);
    assert_eq!(scenario.sleeper.slept().len(), 2);
}

#[tokio::test]
async fn exhausted_metadata_retries_report_the_last_error() {
    let (fleet, releases) = two_contract_fleet();
    let releases = releases.with_unavailable(&fleet[0].id);
    let mut scenario = Scenario::new(fleet.clone(), releases);
    scenario.settings.fetch.steps = 4;

    let err = scenario.upgrader().plan().await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Fatal);
    let PlanError::CoreMetadata {
        source:
            ResolveError::MetadataUnavailable {
                source: FetchError::Exhausted { attempts, last },
                ..
            },
    } = &err
    else {
        panic!("expected exhausted metadata fetch, got {err}");
    };
    assert_eq!(*attempts, 4);
    assert!(matches!(**last, FetchError::Unavailable(_)));
    assert!(err.to_string().contains("gave up after 4 attempt(s)"));
    assert_eq!(scenario.releases.fetch_count(&fleet[0].id), 4);
    assert_eq!(scenario.sleeper.slept().len(), 3);
}

#[tokio::test]
async fn single_unreachable_fetch_is_transient() {
    let (fleet, releases) = two_contract_fleet();
    let releases = releases.with_unavailable(&fleet[0].id);

    let err = build_plans(&fleet, &releases).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
}

// =============================================================================
// Properties
// =============================================================================

fn arb_versions() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((4u64..=6, 0u64..=3), 0..6)
}

fn tags(versions: &[(u64, u64)]) -> Vec<String> {
    versions
        .iter()
        .map(|(minor, patch)| format!("v0.{minor}.{patch}"))
        .collect()
}

proptest! {
    #[test]
    fn plans_never_mix_contracts(
        core_versions in arb_versions(),
        cp_versions in arb_versions(),
    ) {
        let series = [(0, 4, "v1alpha4"), (0, 5, "v1alpha5"), (0, 6, "v1beta1")];
        let fleet = vec![core("v0.4.0"), control_plane("v0.4.0")];
        let core_tags = tags(&core_versions);
        let cp_tags = tags(&cp_versions);
        let core_refs: Vec<&str> = core_tags.iter().map(String::as_str).collect();
        let cp_refs: Vec<&str> = cp_tags.iter().map(String::as_str).collect();
        let releases = fleetup::fleet::MemoryReleases::new()
            .with_metadata(&fleet[0].id, metadata(&core_refs, &series))
            .with_metadata(&fleet[1].id, metadata(&cp_refs, &series));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let set = runtime.block_on(build_plans(&fleet, &releases)).unwrap();

        // First plan keeps the core's current contract.
        prop_assert_eq!(set.plans[0].contract.as_str(), "v1alpha4");

        for plan in &set.plans[1..] {
            prop_assert!(!plan.is_partial());
            for item in &plan.items {
                let next = item.next_version.as_ref().unwrap();
                let contract = series
                    .iter()
                    .find(|(_, minor, _)| *minor == next.minor)
                    .map(|(_, _, c)| *c)
                    .unwrap();
                prop_assert_eq!(contract, plan.contract.as_str());
            }
        }

        // Items always follow kind order.
        for plan in &set.plans {
            let orders: Vec<u8> = plan.items.iter().map(|i| i.component.kind().order()).collect();
            let mut sorted = orders.clone();
            sorted.sort();
            prop_assert_eq!(orders, sorted);
        }
    }
}
