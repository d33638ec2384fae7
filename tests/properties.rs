//! Property-style tests for the invariants in the testable-properties list:
//! dedup, ancestor soundness, partition disjointness, version-normalization
//! idempotence, id canonicalization, and the bounded-concurrency/retry
//! ceiling constants the resolution engine and Insights adapter enforce.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use depscan_core::config::AuditConfig;
use depscan_core::id::{dependency_id, parse_dependency_id};
use depscan_core::insights::fake::{FakeInsightsClient, FakePackage};
use depscan_core::insights::{
    DependenciesResponse, InsightsClient, InsightsError, VersionKey, VersionResponse,
    VersionsResponse,
};
use depscan_core::manifest::DependencyDeclaration;
use depscan_core::version::{is_valid_version, resolve_version, System};
use depscan_core::LicenseAuditor;

fn arb_system() -> impl Strategy<Value = System> {
    prop_oneof![
        Just(System::Npm),
        Just(System::Maven),
        Just(System::PyPi),
        Just(System::Go),
    ]
}

proptest! {
    /// `dependency_id(parse(dependency_id(x))) == dependency_id(x)` for any
    /// ASCII name/version pair free of the `:`/`@` separators themselves.
    #[test]
    fn id_canonicalization_round_trips(
        system in arb_system(),
        name in "[a-zA-Z0-9_.-]{1,20}",
        version in proptest::option::of("[a-zA-Z0-9_.-]{1,10}"),
    ) {
        let id = dependency_id(system, &name, version.as_deref());
        let (parsed_system, parsed_name, parsed_version) = parse_dependency_id(&id).unwrap();
        let rebuilt = dependency_id(parsed_system.unwrap(), &parsed_name, parsed_version.as_deref());
        prop_assert_eq!(rebuilt, id);
    }

    /// `resolve_version` is idempotent for every system on arbitrary
    /// plausible version strings.
    #[test]
    fn version_normalization_is_idempotent(
        system in arb_system(),
        raw in "[v]?[0-9]{1,3}(\\.[0-9]{1,3}){0,2}",
    ) {
        let once = resolve_version(system, &raw);
        let twice = resolve_version(system, &once);
        prop_assert_eq!(once, twice);
    }

    /// Validity-table property: NPM accepts only what `semver` parses;
    /// PyPI/Maven accept the relaxed numeric-dotted shape; Go requires the
    /// `v`-prefix. `None`/empty is always invalid.
    #[test]
    fn validity_table_matches_per_system_rules(
        major in 0u64..100,
        minor in 0u64..100,
        patch in 0u64..100,
    ) {
        let plain = format!("{major}.{minor}.{patch}");
        let go_prefixed = format!("v{major}.{minor}.{patch}");

        prop_assert!(is_valid_version(System::Npm, Some(&plain)));
        prop_assert!(!is_valid_version(System::Npm, Some(&go_prefixed)));

        prop_assert!(is_valid_version(System::PyPi, Some(&plain)));
        prop_assert!(is_valid_version(System::Maven, Some(&plain)));

        prop_assert!(is_valid_version(System::Go, Some(&go_prefixed)));
        prop_assert!(!is_valid_version(System::Go, Some(&plain)));

        prop_assert!(!is_valid_version(System::Npm, None));
        prop_assert!(!is_valid_version(System::PyPi, Some("")));
    }
}

fn version_response(system: System, name: &str, version: &str, licenses: &[&str]) -> VersionResponse {
    VersionResponse {
        version_key: VersionKey {
            system,
            name: name.to_string(),
            version: version.to_string(),
        },
        licenses: licenses.iter().map(|s| s.to_string()).collect(),
    }
}

/// Dedup: registering the same `(system, name, version)` as two separate
/// direct declarations still yields exactly one entry in the resolved set.
#[tokio::test]
async fn resolved_graph_has_no_duplicate_ids() {
    let fake = Arc::new(FakeInsightsClient::new());
    fake.register(
        System::Npm,
        "shared",
        FakePackage {
            versions: VersionsResponse { versions: vec![] },
            version_responses: HashMap::from([(
                "1.0.0".to_string(),
                version_response(System::Npm, "shared", "1.0.0", &["MIT"]),
            )]),
            dependencies: HashMap::from([(
                "1.0.0".to_string(),
                DependenciesResponse { nodes: vec![] },
            )]),
        },
    );

    let engine = depscan_core::resolver::ResolutionEngine::new(
        fake,
        depscan_core::resolver::ResolverOptions::default(),
    );
    let dep = |origin: &str| {
        DependencyDeclaration::new(
            System::Npm,
            "shared".to_string(),
            Some("1.0.0".to_string()),
            origin.to_string(),
            true,
            false,
        )
    };
    let (infos, _errors, _warnings) = engine
        .resolve(vec![dep("a/package.json"), dep("b/package.json")])
        .await
        .unwrap();

    let ids: HashSet<_> = infos.iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids.len(), infos.len());
    assert_eq!(infos.len(), 1);
}

/// Ancestor soundness: every ancestor recorded for a non-direct dependency
/// is itself a direct dependency of the run.
#[tokio::test]
async fn every_ancestor_of_a_transitive_dep_is_a_direct_dep() {
    let fake = Arc::new(FakeInsightsClient::new());
    fake.register(
        System::Npm,
        "root",
        FakePackage {
            versions: VersionsResponse { versions: vec![] },
            version_responses: HashMap::from([(
                "1.0.0".to_string(),
                version_response(System::Npm, "root", "1.0.0", &["MIT"]),
            )]),
            dependencies: HashMap::from([(
                "1.0.0".to_string(),
                DependenciesResponse {
                    nodes: vec![depscan_core::insights::DependencyNode {
                        version_key: VersionKey {
                            system: System::Npm,
                            name: "leaf".to_string(),
                            version: "1.0.0".to_string(),
                        },
                        relation: depscan_core::insights::Relation::Direct,
                        errors: vec![],
                    }],
                },
            )]),
        },
    );
    fake.register(
        System::Npm,
        "leaf",
        FakePackage {
            versions: VersionsResponse { versions: vec![] },
            version_responses: HashMap::from([(
                "1.0.0".to_string(),
                version_response(System::Npm, "leaf", "1.0.0", &["MIT"]),
            )]),
            dependencies: HashMap::from([(
                "1.0.0".to_string(),
                DependenciesResponse { nodes: vec![] },
            )]),
        },
    );

    let engine = depscan_core::resolver::ResolutionEngine::new(
        fake,
        depscan_core::resolver::ResolverOptions::default(),
    );
    let dep = DependencyDeclaration::new(
        System::Npm,
        "root".to_string(),
        Some("1.0.0".to_string()),
        "package.json".to_string(),
        true,
        false,
    );
    let (infos, _errors, _warnings) = engine.resolve(vec![dep]).await.unwrap();

    let direct_ids: HashSet<_> = infos.iter().filter(|i| i.direct).map(|i| i.id.clone()).collect();
    for info in infos.iter().filter(|i| !i.direct) {
        for ancestor in &info.ancestors {
            assert!(direct_ids.contains(ancestor), "ancestor {ancestor} of {} is not a direct dep", info.id);
        }
    }
}

/// Partition: the three output buckets never share an id, end-to-end
/// through the public `LicenseAuditor`.
#[tokio::test]
async fn audit_result_buckets_stay_disjoint_end_to_end() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(br#"{"dependencies":{"mit-dep":"1.0.0","gpl-dep":"1.0.0","unknown-dep":"1.0.0"}}"#)
        .unwrap();

    let fake = Arc::new(FakeInsightsClient::new());
    for (name, licenses) in [("mit-dep", vec!["MIT"]), ("gpl-dep", vec!["GPL-3.0"]), ("unknown-dep", vec![])] {
        fake.register(
            System::Npm,
            name,
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: HashMap::from([(
                    "1.0.0".to_string(),
                    version_response(System::Npm, name, "1.0.0", &licenses),
                )]),
                dependencies: HashMap::from([(
                    "1.0.0".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );
    }

    let config = AuditConfig {
        licenses: depscan_core::classifier::LicensePolicy {
            allowed: vec!["MIT".to_string()],
            forbidden: vec!["GPL-3.0".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let auditor = LicenseAuditor::new(dir.path().to_path_buf(), config, fake);
    let result = auditor.check().await.unwrap();

    let allowed: HashSet<_> = result.allowed.iter().map(|d| d.id.clone()).collect();
    let warning: HashSet<_> = result.warning.iter().map(|d| d.id.clone()).collect();
    let forbidden: HashSet<_> = result.forbidden.iter().map(|d| d.id.clone()).collect();
    assert!(allowed.is_disjoint(&warning));
    assert!(allowed.is_disjoint(&forbidden));
    assert!(warning.is_disjoint(&forbidden));
    assert_eq!(allowed.len() + warning.len() + forbidden.len(), 3);
}

/// Bounded concurrency: a counting wrapper around the fake client never
/// observes more in-flight calls than the resolution engine's semaphore
/// permits, across a fan-out wide enough to force real interleaving.
struct CountingClient {
    inner: FakeInsightsClient,
    in_flight: AtomicUsize,
    max_observed: AtomicUsize,
}

impl CountingClient {
    fn new(inner: FakeInsightsClient) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            max_observed: AtomicUsize::new(0),
        }
    }

    fn enter(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(current, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InsightsClient for CountingClient {
    async fn get_versions(&self, system: System, name: &str) -> Result<VersionsResponse, InsightsError> {
        self.enter();
        tokio::task::yield_now().await;
        let result = self.inner.get_versions(system, name).await;
        self.exit();
        result
    }

    async fn get_version(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<VersionResponse, InsightsError> {
        self.enter();
        tokio::task::yield_now().await;
        let result = self.inner.get_version(system, name, version).await;
        self.exit();
        result
    }

    async fn get_dependencies(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<DependenciesResponse, InsightsError> {
        self.enter();
        tokio::task::yield_now().await;
        let result = self.inner.get_dependencies(system, name, version).await;
        self.exit();
        result
    }
}

#[tokio::test]
async fn concurrent_rpcs_never_exceed_the_configured_bound() {
    const CONCURRENCY_BOUND: usize = 500;
    const FANOUT: usize = 64;

    let fake = FakeInsightsClient::new();
    let mut deps = Vec::new();
    for i in 0..FANOUT {
        let name = format!("pkg-{i}");
        fake.register(
            System::Npm,
            &name,
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: HashMap::from([(
                    "1.0.0".to_string(),
                    version_response(System::Npm, &name, "1.0.0", &["MIT"]),
                )]),
                dependencies: HashMap::from([(
                    "1.0.0".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );
        deps.push(DependencyDeclaration::new(
            System::Npm,
            name,
            Some("1.0.0".to_string()),
            "package.json".to_string(),
            true,
            false,
        ));
    }

    let counting = Arc::new(CountingClient::new(fake));
    let engine = depscan_core::resolver::ResolutionEngine::new(
        counting.clone(),
        depscan_core::resolver::ResolverOptions::default(),
    );
    let (infos, errors, _warnings) = engine.resolve(deps).await.unwrap();
    assert!(errors.is_empty());
    assert_eq!(infos.len(), FANOUT);
    assert!(counting.max_observed.load(Ordering::SeqCst) <= CONCURRENCY_BOUND);
}

/// Retry ceiling: the Insights adapter's retry contract caps at 3 attempts
/// per RPC on deadline-exceeded, a fixed bound rather than unbounded backoff.
#[test]
fn retry_ceiling_constant_matches_the_contract() {
    assert_eq!(depscan_core::insights::MAX_RETRY_ATTEMPTS, 3);
}
