//! Bounded-concurrency dependency graph resolution.
//!
//! Grounds on the teacher's `DependencyResolver`/`ResolverError` split in
//! `services/dependency_resolver.rs`: a single struct holding a resolver's
//! configuration plus a run-scoped cache, and a `thiserror` enum composing
//! the collaborators' errors. The BFS/`VecDeque` traversal there is replaced
//! with a `Semaphore`-bounded fan-out `JoinSet`, since the spec requires
//! ≤500 concurrent in-flight RPCs rather than strictly-ordered levels.
//! `expand_inner` never awaits a child directly: it relays the child's
//! boxed future through an mpsc channel to the single task in `resolve`
//! that owns the `JoinSet`, so every subtree spawns concurrently instead of
//! walking depth-first.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::id::DependencyId;
use crate::insights::{InsightsClient, InsightsError, Relation};
use crate::manifest::DependencyDeclaration;
use crate::matcher::{is_ignored, ModuleSpec};
use crate::version::{is_valid_version, System};

const MAX_CONCURRENT_RPCS: usize = 500;
const ANCESTOR_HOP_BOUND: usize = 2;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(transparent)]
    Insights(#[from] InsightsError),

    #[error("no default version available for {system} {name}")]
    NoDefaultVersion { system: System, name: String },
}

/// Per-system tuning knobs, mirroring the unified per-system configuration
/// contract in §6: manifest-discovery overrides consumed by the readers
/// (`include_files`/`exclude_files`/`development_files`/`extra_modules`/
/// `recursive_requirements`) plus the `ModuleSpec`-based inclusion/exclusion
/// rules consumed by the resolver and classifier (`modules`/
/// `exclude_modules`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerSystemOptions {
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub exclude_modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub include_files: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub development_files: Vec<String>,
    #[serde(default)]
    pub extra_modules: Vec<String>,
    #[serde(default)]
    pub recursive_requirements: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    #[serde(default)]
    pub only_direct: bool,
    #[serde(default = "default_true")]
    pub production: bool,
    #[serde(default = "default_true")]
    pub development: bool,
    #[serde(default)]
    pub per_system: HashMap<System, PerSystemOptions>,
}

fn default_true() -> bool {
    true
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            only_direct: false,
            production: true,
            development: true,
            per_system: HashMap::new(),
        }
    }
}

/// The fully resolved record for one `(system, name, version)`, the
/// Resolution Engine's output shape consumed by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub id: DependencyId,
    pub system: System,
    pub name: String,
    pub version: Option<String>,
    pub resolved_version: Option<String>,
    pub licenses: Vec<String>,
    pub direct: bool,
    pub production: bool,
    pub development: bool,
    pub dependencies: Vec<DependencyId>,
    pub ancestors: Vec<DependencyId>,
    pub origins: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct ModuleRecord {
    system: System,
    name: String,
    version: Option<String>,
    resolved_version: Option<String>,
    licenses: Vec<String>,
    error: Option<String>,
    request_ancestor: Option<DependencyId>,
    origin: String,
}

#[derive(Debug, Clone, Default)]
struct DependenciesRecord {
    resolved_version: Option<String>,
    dependencies: Vec<DependencyId>,
    error: Option<String>,
}

#[derive(Default)]
struct ResolutionState {
    modules_info: HashMap<DependencyId, ModuleRecord>,
    dependencies_info: HashMap<DependencyId, DependenciesRecord>,
    requested: HashSet<DependencyId>,
    ignored: HashSet<DependencyId>,
    direct_deps: HashSet<DependencyId>,
    direct_prod: HashSet<DependencyId>,
    direct_dev: HashSet<DependencyId>,
    /// Every origin file that declared a given direct-dependency id,
    /// accumulated across all manifests (a dep can be declared more than
    /// once). [`synthesize`] derives `DependencyInfo::origins` from this,
    /// unioned across a transitive dependency's ancestors.
    direct_origins: HashMap<DependencyId, HashSet<String>>,
    parents: HashMap<DependencyId, Vec<DependencyId>>,
    default_version_cache: HashMap<(System, String), String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct ExpandContext {
    is_direct: bool,
    development: bool,
    production: bool,
    ancestor: Option<DependencyId>,
}

/// Orchestrates one run of bounded-concurrency graph expansion.
///
/// One `run_lock` serializes `resolve` calls on a single instance: the spec
/// requires at most one in-flight run, with every new caller starting from a
/// freshly cleared cache once the prior run completes.
pub struct ResolutionEngine<C: InsightsClient> {
    client: Arc<C>,
    options: ResolverOptions,
    run_lock: Mutex<()>,
}

impl<C: InsightsClient + 'static> ResolutionEngine<C> {
    pub fn new(client: Arc<C>, options: ResolverOptions) -> Self {
        Self {
            client,
            options,
            run_lock: Mutex::new(()),
        }
    }

    /// Resolves the full transitive graph reachable from `direct`. Clears
    /// all run-scoped state first and serializes concurrent callers.
    pub async fn resolve(
        &self,
        direct: Vec<DependencyDeclaration>,
    ) -> Result<(Vec<DependencyInfo>, Vec<String>, Vec<String>), ResolverError> {
        let _guard = self.run_lock.lock().await;

        let state = Arc::new(Mutex::new(ResolutionState::default()));
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_RPCS));

        {
            let mut locked = state.lock().await;
            for dep in &direct {
                let id = DependencyId::new(dep.system, &dep.name, dep.version.as_deref());
                locked.direct_deps.insert(id.clone());
                locked
                    .direct_origins
                    .entry(id.clone())
                    .or_default()
                    .insert(dep.origin.clone());
                if dep.production {
                    locked.direct_prod.insert(id.clone());
                }
                if dep.development {
                    locked.direct_dev.insert(id);
                }
            }
        }

        // `expand_inner` never spawns directly (a `JoinSet` can't be spawned
        // onto from more than one owner without risking a deadlock between a
        // holder awaiting `join_next` and a child blocked acquiring the same
        // lock to spawn). Instead every call relays its children's boxed
        // futures through this channel; this task is the sole `JoinSet`
        // owner, so spawning and draining never contend with each other.
        let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel::<ExpandFuture>();

        for dep in direct {
            let ctx = ExpandContext {
                is_direct: true,
                development: dep.development,
                production: dep.production,
                ancestor: None,
            };
            let future = expand(
                self.client.clone(),
                self.options.clone(),
                state.clone(),
                semaphore.clone(),
                spawn_tx.clone(),
                dep,
                ctx,
            );
            let _ = spawn_tx.send(future);
        }
        drop(spawn_tx);

        let mut join_set: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                next = spawn_rx.recv() => {
                    match next {
                        Some(future) => {
                            join_set.spawn(future);
                        }
                        None => break,
                    }
                }
                Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
                    if let Err(join_err) = joined {
                        warn!("expand task panicked: {join_err}");
                    }
                }
            }
        }
        while let Some(joined) = join_set.join_next().await {
            if let Err(join_err) = joined {
                warn!("expand task panicked: {join_err}");
            }
        }

        let mut locked = Arc::try_unwrap(state)
            .unwrap_or_else(|arc| panic!("state still has {} references", Arc::strong_count(&arc)))
            .into_inner();

        let infos = synthesize(&mut locked);
        Ok((infos, locked.errors, locked.warnings))
    }
}

fn per_system_options<'a>(
    options: &'a ResolverOptions,
    system: System,
) -> Option<&'a PerSystemOptions> {
    options.per_system.get(&system)
}

/// A boxed, type-erased `expand_inner` invocation, relayed through the
/// spawn channel so `resolve`'s `JoinSet` can run it as its own task.
type ExpandFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn expand<C: InsightsClient + 'static>(
    client: Arc<C>,
    options: ResolverOptions,
    state: Arc<Mutex<ResolutionState>>,
    semaphore: Arc<Semaphore>,
    spawner: mpsc::UnboundedSender<ExpandFuture>,
    dep: DependencyDeclaration,
    ctx: ExpandContext,
) -> ExpandFuture {
    Box::pin(expand_inner(client, options, state, semaphore, spawner, dep, ctx))
}

async fn expand_inner<C: InsightsClient + 'static>(
    client: Arc<C>,
    options: ResolverOptions,
    state: Arc<Mutex<ResolutionState>>,
    semaphore: Arc<Semaphore>,
    spawner: mpsc::UnboundedSender<ExpandFuture>,
    dep: DependencyDeclaration,
    ctx: ExpandContext,
) {
    let id = DependencyId::new(dep.system, &dep.name, dep.version.as_deref());

    {
        let mut locked = state.lock().await;
        if locked.ignored.contains(&id) {
            return;
        }
        if let Some(per_system) = per_system_options(&options, dep.system) {
            if is_ignored(&dep, &per_system.exclude_modules) {
                locked.ignored.insert(id);
                return;
            }
        }
        if locked.requested.contains(&id) {
            return;
        }
        locked.requested.insert(id.clone());
    }

    let candidate = dep.resolved_version.as_deref().or(dep.version.as_deref());
    let version_to_request = if is_valid_version(dep.system, candidate) {
        candidate.map(str::to_string)
    } else {
        match default_version(&client, &state, dep.system, &dep.name).await {
            Ok(v) => Some(v),
            Err(err) => {
                let mut locked = state.lock().await;
                let message = format!("{}: {err}", display_name(&dep.name, candidate));
                locked.modules_info.insert(
                    id.clone(),
                    ModuleRecord {
                        system: dep.system,
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                        resolved_version: None,
                        licenses: Vec::new(),
                        error: Some(message.clone()),
                        request_ancestor: ctx.ancestor.clone(),
                        origin: dep.origin.clone(),
                    },
                );
                locked.dependencies_info.insert(
                    id,
                    DependenciesRecord {
                        error: Some(message.clone()),
                        ..Default::default()
                    },
                );
                locked.errors.push(message);
                return;
            }
        }
    };
    let version_to_request = version_to_request.unwrap_or_default();

    let version_permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");

    let skip_dependencies = options.only_direct
        || (ctx.is_direct && ctx.development && !options.development)
        || (ctx.is_direct && ctx.production && !options.production);

    let dependencies_permit = if skip_dependencies {
        None
    } else {
        Some(semaphore.clone().acquire_owned().await.expect("semaphore not closed"))
    };

    // Both permits are held up front so the two RPCs are issued together
    // via `tokio::join!` and overlap in flight, rather than the dependency
    // lookup waiting on the version lookup's completion.
    let (version_result, dependencies_result) = if dependencies_permit.is_some() {
        let (v, d) = tokio::join!(
            client.get_version(dep.system, &dep.name, &version_to_request),
            client.get_dependencies(dep.system, &dep.name, &version_to_request)
        );
        (v, Some(d))
    } else {
        (
            client.get_version(dep.system, &dep.name, &version_to_request).await,
            None,
        )
    };
    drop(version_permit);
    drop(dependencies_permit);

    {
        let mut locked = state.lock().await;
        match &version_result {
            Ok(response) => {
                locked.modules_info.insert(
                    id.clone(),
                    ModuleRecord {
                        system: dep.system,
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                        resolved_version: Some(version_to_request.clone()),
                        licenses: response.licenses.clone(),
                        error: None,
                        request_ancestor: if ctx.is_direct { None } else { ctx.ancestor.clone() },
                        origin: dep.origin.clone(),
                    },
                );
            }
            Err(err) => {
                let message = format!(
                    "{}: {err}",
                    display_name(&dep.name, Some(version_to_request.as_str()))
                );
                locked.modules_info.insert(
                    id.clone(),
                    ModuleRecord {
                        system: dep.system,
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                        resolved_version: Some(version_to_request.clone()),
                        licenses: Vec::new(),
                        error: Some(message.clone()),
                        request_ancestor: ctx.ancestor.clone(),
                        origin: dep.origin.clone(),
                    },
                );
                locked.errors.push(message);
            }
        }
    }

    let Some(dependencies_result) = dependencies_result else {
        return;
    };

    match dependencies_result {
        Ok(response) => {
            let mut children = Vec::new();
            for node in &response.nodes {
                if matches!(node.relation, Relation::Self_) {
                    continue;
                }
                if node.version_key.system == dep.system && node.version_key.name == dep.name {
                    continue;
                }
                let child_id = DependencyId::new(
                    node.version_key.system,
                    &node.version_key.name,
                    Some(&node.version_key.version),
                );
                children.push(child_id.clone());

                let mut locked = state.lock().await;
                locked.parents.entry(child_id.clone()).or_default().push(id.clone());
                drop(locked);

                let child_declaration = DependencyDeclaration::new(
                    node.version_key.system,
                    node.version_key.name.clone(),
                    Some(node.version_key.version.clone()),
                    dep.origin.clone(),
                    false,
                    false,
                )
                .with_resolved_version(Some(node.version_key.version.clone()));

                let child_ctx = ExpandContext {
                    is_direct: false,
                    development: ctx.development,
                    production: ctx.production,
                    ancestor: Some(if ctx.is_direct { id.clone() } else { ctx.ancestor.clone().unwrap_or_else(|| id.clone()) }),
                };

                let child_future = expand(
                    client.clone(),
                    options.clone(),
                    state.clone(),
                    semaphore.clone(),
                    spawner.clone(),
                    child_declaration,
                    child_ctx,
                );
                let _ = spawner.send(child_future);
            }

            let mut locked = state.lock().await;
            locked.dependencies_info.insert(
                id,
                DependenciesRecord {
                    resolved_version: Some(version_to_request),
                    dependencies: children,
                    error: None,
                },
            );
        }
        Err(err) => {
            let message = format!(
                "{}: {err}",
                display_name(&dep.name, Some(version_to_request.as_str()))
            );
            let mut locked = state.lock().await;
            locked.dependencies_info.insert(
                id,
                DependenciesRecord {
                    resolved_version: Some(version_to_request),
                    dependencies: Vec::new(),
                    error: Some(message.clone()),
                },
            );
            locked.errors.push(message);
        }
    }
}

async fn default_version<C: InsightsClient>(
    client: &Arc<C>,
    state: &Arc<Mutex<ResolutionState>>,
    system: System,
    name: &str,
) -> Result<String, ResolverError> {
    let key = (system, name.to_string());
    {
        let locked = state.lock().await;
        if let Some(cached) = locked.default_version_cache.get(&key) {
            return Ok(cached.clone());
        }
    }

    let versions = client.get_versions(system, name).await?;
    let resolved = versions
        .default_version()
        .map(|v| v.version_key.version.clone())
        .ok_or_else(|| ResolverError::NoDefaultVersion {
            system,
            name: name.to_string(),
        })?;

    let mut locked = state.lock().await;
    locked
        .default_version_cache
        .entry(key)
        .or_insert_with(|| resolved.clone());
    Ok(resolved)
}

fn display_name(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{name}@{v}"),
        None => name.to_string(),
    }
}

/// Computes `ancestors(id)` by walking `parents` up to [`ANCESTOR_HOP_BOUND`]
/// levels from `id`, collecting any direct-dep ids reached; falls back to
/// the single recorded `request_ancestor` when the bound is exhausted
/// without reaching a direct root.
fn ancestors_of(
    id: &DependencyId,
    parents: &HashMap<DependencyId, Vec<DependencyId>>,
    direct_deps: &HashSet<DependencyId>,
    request_ancestor: Option<&DependencyId>,
) -> Vec<DependencyId> {
    let mut found = HashSet::new();
    let mut frontier = vec![id.clone()];
    for _ in 0..ANCESTOR_HOP_BOUND {
        let mut next = Vec::new();
        for node in &frontier {
            for parent in parents.get(node).into_iter().flatten() {
                if direct_deps.contains(parent) {
                    found.insert(parent.clone());
                } else {
                    next.push(parent.clone());
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    if found.is_empty() {
        if let Some(ancestor) = request_ancestor {
            found.insert(ancestor.clone());
        }
    }
    found.into_iter().collect()
}

fn synthesize(state: &mut ResolutionState) -> Vec<DependencyInfo> {
    let mut infos = Vec::new();
    let ids: Vec<DependencyId> = state.modules_info.keys().cloned().collect();

    for id in ids {
        let module = state.modules_info.get(&id).expect("id came from modules_info keys").clone();
        let deps_record = state.dependencies_info.get(&id).cloned().unwrap_or_default();
        let direct = state.direct_deps.contains(&id);

        let ancestors = if direct {
            Vec::new()
        } else {
            ancestors_of(
                &id,
                &state.parents,
                &state.direct_deps,
                module.request_ancestor.as_ref(),
            )
        };

        let production = if direct {
            state.direct_prod.contains(&id)
        } else {
            ancestors.iter().any(|a| state.direct_prod.contains(a))
        };
        let development = if direct {
            state.direct_dev.contains(&id)
        } else {
            ancestors.iter().any(|a| state.direct_dev.contains(a))
        };

        let mut warnings = Vec::new();
        if !direct && ancestors.is_empty() {
            warnings.push(format!(
                "{}: Ancestor not found",
                display_name(&module.name, module.resolved_version.as_deref())
            ));
        }
        if !direct && !production && !development {
            warnings.push(format!(
                "{}: Not production nor development",
                display_name(&module.name, module.resolved_version.as_deref())
            ));
        }

        let mut errors = Vec::new();
        if let Some(err) = &module.error {
            errors.push(err.clone());
        }
        if let Some(err) = &deps_record.error {
            errors.push(err.clone());
        }

        // `origins` is the union of origin files across every declaration
        // that reaches this id: a direct dep declared in more than one
        // manifest, or a transitive dep reachable through more than one
        // ancestor (a diamond in the graph), must report every one of them,
        // not just whichever `expand_inner` call won the dedup race.
        let mut origin_set: HashSet<String> = if direct {
            state.direct_origins.get(&id).cloned().unwrap_or_default()
        } else {
            let mut set = HashSet::new();
            for ancestor in &ancestors {
                if let Some(origins) = state.direct_origins.get(ancestor) {
                    set.extend(origins.iter().cloned());
                }
            }
            set
        };
        if origin_set.is_empty() {
            origin_set.insert(module.origin.clone());
        }
        let mut origins: Vec<String> = origin_set.into_iter().collect();
        origins.sort();

        debug!(id = %id, direct, production, development, "synthesized dependency info");

        infos.push(DependencyInfo {
            id: id.clone(),
            system: module.system,
            name: module.name,
            version: module.version,
            resolved_version: module.resolved_version,
            licenses: module.licenses,
            direct,
            production,
            development,
            dependencies: deps_record.dependencies,
            ancestors,
            origins,
            errors,
            warnings,
        });
    }

    state.warnings.extend(infos.iter().flat_map(|i| i.warnings.clone()));
    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::fake::{FakeInsightsClient, FakePackage};
    use crate::insights::{DependenciesResponse, VersionKey, VersionResponse, VersionsResponse};
    use std::collections::HashMap as StdHashMap;

    fn version_response(name: &str, version: &str, licenses: &[&str]) -> VersionResponse {
        VersionResponse {
            version_key: VersionKey {
                system: System::Npm,
                name: name.to_string(),
                version: version.to_string(),
            },
            licenses: licenses.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn single_direct_dependency_resolves() {
        let fake = Arc::new(FakeInsightsClient::new());
        fake.register(
            System::Npm,
            "x",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "1.2.3".to_string(),
                    version_response("x", "1.2.3", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "1.2.3".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );

        let engine = ResolutionEngine::new(fake, ResolverOptions::default());
        let dep = DependencyDeclaration::new(
            System::Npm,
            "x".to_string(),
            Some("1.2.3".to_string()),
            "package.json".to_string(),
            true,
            false,
        )
        .with_resolved_version(Some("1.2.3".to_string()));

        let (infos, errors, _warnings) = engine.resolve(vec![dep]).await.unwrap();
        assert!(errors.is_empty());
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].licenses, vec!["MIT".to_string()]);
        assert!(infos[0].direct);
        assert!(infos[0].production);
    }

    #[tokio::test]
    async fn transitive_dependency_inherits_ancestor_and_production_flag() {
        let fake = Arc::new(FakeInsightsClient::new());
        fake.register(
            System::Npm,
            "a",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "1.0.0".to_string(),
                    version_response("a", "1.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "1.0.0".to_string(),
                    DependenciesResponse {
                        nodes: vec![crate::insights::DependencyNode {
                            version_key: VersionKey {
                                system: System::Npm,
                                name: "b".to_string(),
                                version: "2.0.0".to_string(),
                            },
                            relation: Relation::Direct,
                            errors: vec![],
                        }],
                    },
                )]),
            },
        );
        fake.register(
            System::Npm,
            "b",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "2.0.0".to_string(),
                    version_response("b", "2.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "2.0.0".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );

        let engine = ResolutionEngine::new(fake, ResolverOptions::default());
        let dep = DependencyDeclaration::new(
            System::Npm,
            "a".to_string(),
            Some("1.0.0".to_string()),
            "package.json".to_string(),
            true,
            false,
        )
        .with_resolved_version(Some("1.0.0".to_string()));

        let (infos, errors, _warnings) = engine.resolve(vec![dep]).await.unwrap();
        assert!(errors.is_empty());
        let b = infos.iter().find(|i| i.name == "b").unwrap();
        assert!(!b.direct);
        assert!(b.production);
        assert_eq!(b.ancestors.len(), 1);
        assert_eq!(b.origins, vec!["package.json".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_deduplicated() {
        let fake = Arc::new(FakeInsightsClient::new());
        fake.register(
            System::Npm,
            "shared",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "1.0.0".to_string(),
                    version_response("shared", "1.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "1.0.0".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );

        let engine = ResolutionEngine::new(fake, ResolverOptions::default());
        let dep = |origin: &str| {
            DependencyDeclaration::new(
                System::Npm,
                "shared".to_string(),
                Some("1.0.0".to_string()),
                origin.to_string(),
                true,
                false,
            )
            .with_resolved_version(Some("1.0.0".to_string()))
        };

        let (infos, _errors, _warnings) = engine
            .resolve(vec![dep("package.json"), dep("package.json")])
            .await
            .unwrap();
        assert_eq!(infos.len(), 1);
    }

    #[tokio::test]
    async fn diamond_dependency_reports_every_ancestor_and_origin() {
        // a (package.json) and b (package-dev.json) both depend on c: c must
        // report both as ancestors and both origin files, not just whichever
        // branch's `expand_inner` call happened to win the dedup race.
        let fake = Arc::new(FakeInsightsClient::new());
        fake.register(
            System::Npm,
            "a",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "1.0.0".to_string(),
                    version_response("a", "1.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "1.0.0".to_string(),
                    DependenciesResponse {
                        nodes: vec![crate::insights::DependencyNode {
                            version_key: VersionKey {
                                system: System::Npm,
                                name: "c".to_string(),
                                version: "3.0.0".to_string(),
                            },
                            relation: Relation::Direct,
                            errors: vec![],
                        }],
                    },
                )]),
            },
        );
        fake.register(
            System::Npm,
            "b",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "2.0.0".to_string(),
                    version_response("b", "2.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "2.0.0".to_string(),
                    DependenciesResponse {
                        nodes: vec![crate::insights::DependencyNode {
                            version_key: VersionKey {
                                system: System::Npm,
                                name: "c".to_string(),
                                version: "3.0.0".to_string(),
                            },
                            relation: Relation::Direct,
                            errors: vec![],
                        }],
                    },
                )]),
            },
        );
        fake.register(
            System::Npm,
            "c",
            FakePackage {
                versions: VersionsResponse { versions: vec![] },
                version_responses: StdHashMap::from([(
                    "3.0.0".to_string(),
                    version_response("c", "3.0.0", &["MIT"]),
                )]),
                dependencies: StdHashMap::from([(
                    "3.0.0".to_string(),
                    DependenciesResponse { nodes: vec![] },
                )]),
            },
        );

        let engine = ResolutionEngine::new(fake, ResolverOptions::default());
        let dep_a = DependencyDeclaration::new(
            System::Npm,
            "a".to_string(),
            Some("1.0.0".to_string()),
            "package.json".to_string(),
            true,
            false,
        )
        .with_resolved_version(Some("1.0.0".to_string()));
        let dep_b = DependencyDeclaration::new(
            System::Npm,
            "b".to_string(),
            Some("2.0.0".to_string()),
            "package-dev.json".to_string(),
            true,
            false,
        )
        .with_resolved_version(Some("2.0.0".to_string()));

        let (infos, errors, _warnings) = engine.resolve(vec![dep_a, dep_b]).await.unwrap();
        assert!(errors.is_empty());
        let c = infos.iter().find(|i| i.name == "c").unwrap();
        assert_eq!(c.ancestors.len(), 2);
        let mut origins = c.origins.clone();
        origins.sort();
        assert_eq!(
            origins,
            vec!["package-dev.json".to_string(), "package.json".to_string()]
        );
    }
}
