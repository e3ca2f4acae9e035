//! Concurrent refresh of stale origin nodes.
//!
//! An update pass walks the given graphs, groups every non-fresh
//! [`OriginNode`](crate::node::OriginNode) by origin and query, and fetches each origin's whole batch
//! on its own task. Identical `(origin, query)` pairs are fetched once no
//! matter how many nodes or graphs share them. A failing or panicking origin
//! only leaves its own nodes stale.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::node::{walk, NodeRef};
use crate::{Origin, OriginError, Point, Query, ValidationError};

/// Default number of origin fetches allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Tunables for an [`Updater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub max_concurrency: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl UpdaterConfig {
    pub fn with_max_concurrency(max_concurrency: usize) -> Result<Self, ValidationError> {
        let config = Self { max_concurrency };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Origin registry and refresh engine.
pub struct Updater {
    origins: HashMap<String, Arc<dyn Origin>>,
    limiter: Arc<Semaphore>,
    config: UpdaterConfig,
}

/// Stale nodes grouped by origin, then by query.
type Pending = BTreeMap<String, BTreeMap<Query, Vec<NodeRef>>>;

type FetchHandle = JoinHandle<Result<HashMap<Query, Point>, OriginError>>;

/// Builder for an [`Updater`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use tickgraph_core::{StaticOrigin, Updater};
///
/// let updater = Updater::builder()
///     .with_origin("static", Arc::new(StaticOrigin::default()))
///     .with_max_concurrency(4)
///     .build()
///     .expect("valid config");
/// assert_eq!(updater.origin_names(), vec!["static"]);
/// ```
#[derive(Default)]
pub struct UpdaterBuilder {
    origins: HashMap<String, Arc<dyn Origin>>,
    config: UpdaterConfig,
}

impl UpdaterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an origin under `name`, replacing any previous registration.
    pub fn with_origin(mut self, name: impl Into<String>, origin: Arc<dyn Origin>) -> Self {
        self.origins.insert(name.into(), origin);
        self
    }

    pub fn with_config(mut self, config: UpdaterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn build(self) -> Result<Updater, ValidationError> {
        self.config.validate()?;
        Ok(Updater::new(self.origins, self.config))
    }
}

impl Updater {
    /// Create an updater. A zero `max_concurrency` is raised to one.
    pub fn new(origins: HashMap<String, Arc<dyn Origin>>, config: UpdaterConfig) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            origins,
            limiter: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    pub fn builder() -> UpdaterBuilder {
        UpdaterBuilder::new()
    }

    pub fn config(&self) -> UpdaterConfig {
        self.config
    }

    /// Registered origin names, sorted.
    pub fn origin_names(&self) -> Vec<&str> {
        let mut names = self.origins.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Refresh every stale origin node reachable from `graphs`.
    ///
    /// Never fails: per-origin and per-node problems are logged and leave
    /// the affected caches as they were.
    pub async fn update(&self, cancel: &CancellationToken, graphs: &[NodeRef]) {
        let pending = collect_pending(graphs);
        if pending.is_empty() {
            tracing::debug!("all origin nodes are fresh, nothing to update");
            return;
        }
        tracing::debug!(
            origins = pending.len(),
            queries = pending.values().map(BTreeMap::len).sum::<usize>(),
            "updating stale origin nodes"
        );

        let handles = self.spawn_fetches(cancel, &pending);
        let results = join_fetches(handles).await;
        apply_results(&pending, &results);
    }

    fn spawn_fetches(&self, cancel: &CancellationToken, pending: &Pending) -> Vec<(String, FetchHandle)> {
        let mut handles = Vec::with_capacity(pending.len());
        for (name, queries) in pending {
            let Some(origin) = self.origins.get(name) else {
                tracing::warn!(origin = %name, "origin is not registered, skipping its nodes");
                continue;
            };

            let origin = Arc::clone(origin);
            let limiter = Arc::clone(&self.limiter);
            let cancel = cancel.clone();
            let queries = queries.keys().cloned().collect::<Vec<_>>();
            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = limiter.acquire_owned() => permit
                        .map_err(|_| OriginError::internal("origin limiter is closed"))?,
                    () = cancel.cancelled() => return Err(OriginError::cancelled()),
                };
                origin.fetch_data_points(cancel, queries).await
            });
            handles.push((name.clone(), handle));
        }
        handles
    }
}

fn collect_pending(graphs: &[NodeRef]) -> Pending {
    let mut pending = Pending::new();
    walk(graphs, |node| {
        let Some(origin) = node.as_origin() else {
            return;
        };
        if origin.is_fresh() {
            return;
        }
        pending
            .entry(origin.origin().to_owned())
            .or_default()
            .entry(origin.query().clone())
            .or_default()
            .push(Arc::clone(node));
    });
    pending
}

async fn join_fetches(handles: Vec<(String, FetchHandle)>) -> HashMap<String, HashMap<Query, Point>> {
    let mut results = HashMap::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(points)) => {
                results.insert(name, points);
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    origin = %name,
                    code = error.code(),
                    retryable = error.retryable(),
                    "origin fetch failed: {}",
                    error.message()
                );
            }
            Err(error) if error.is_panic() => {
                tracing::error!(origin = %name, "origin fetch panicked");
            }
            Err(error) => {
                tracing::warn!(origin = %name, "origin fetch task was aborted: {error}");
            }
        }
    }
    results
}

fn apply_results(pending: &Pending, results: &HashMap<String, HashMap<Query, Point>>) {
    for (name, queries) in pending {
        let points = results.get(name);
        for (query, nodes) in queries {
            let Some(point) = points.and_then(|points| points.get(query)) else {
                tracing::warn!(origin = %name, query = %query, "no data point returned for query");
                continue;
            };
            for node in nodes {
                set_point(node, point, name, query);
            }
        }
    }
}

fn set_point(node: &NodeRef, point: &Point, name: &str, query: &Query) {
    let Some(origin) = node.as_origin() else {
        return;
    };
    if let Err(error) = origin.set_data_point(point.clone()) {
        tracing::warn!(origin = %name, query = %query, "data point rejected: {error}");
    }
}

/// Origin nodes reachable from `graphs` that the next pass would refresh.
pub fn stale_origins(graphs: &[NodeRef]) -> Vec<NodeRef> {
    collect_pending(graphs)
        .into_values()
        .flat_map(BTreeMap::into_values)
        .flatten()
        .collect()
}
