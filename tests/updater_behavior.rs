//! Behavior-driven tests for the origin updater
//!
//! These tests verify HOW an update pass batches, deduplicates and isolates
//! origin fetches, and what happens to cached points when origins misbehave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tickgraph_core::{
    FetchFuture, FreshnessPolicy, Node, NodeRef, Origin, OriginError, OriginNode, Pair, Point,
    PointError, Query, Tick, TickMedianNode, Updater, UpdaterConfig, UtcDateTime,
};
use tokio_util::sync::CancellationToken;

/// Origin answering every pair query with a fixed price, recording calls.
#[derive(Default)]
struct CountingOrigin {
    price: f64,
    delay: Duration,
    calls: AtomicUsize,
    queries: Mutex<Vec<Vec<Query>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CountingOrigin {
    fn new(price: f64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    fn slow(price: f64, delay: Duration, in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        Self {
            price,
            delay,
            in_flight,
            peak,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn batches(&self) -> Vec<Vec<Query>> {
        self.queries.lock().expect("queries lock is not poisoned").clone()
    }
}

impl Origin for CountingOrigin {
    fn fetch_data_points(&self, _cancel: CancellationToken, queries: Vec<Query>) -> FetchFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries
                .lock()
                .expect("queries lock is not poisoned")
                .push(queries.clone());

            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let now = UtcDateTime::now();
            Ok(queries
                .into_iter()
                .filter_map(|query| {
                    let pair = Pair::parse(query.as_str()).ok()?;
                    Some((query, Point::new(Tick::new(pair, self.price, 1.0), now)))
                })
                .collect())
        })
    }
}

struct PanickingOrigin;

impl Origin for PanickingOrigin {
    fn fetch_data_points(&self, _cancel: CancellationToken, queries: Vec<Query>) -> FetchFuture<'_> {
        Box::pin(async move {
            if queries.is_empty() {
                return Ok(HashMap::new());
            }
            panic!("origin adapter bug")
        })
    }
}

struct FailingOrigin;

impl Origin for FailingOrigin {
    fn fetch_data_points(&self, _cancel: CancellationToken, _queries: Vec<Query>) -> FetchFuture<'_> {
        Box::pin(async move { Err(OriginError::rate_limited("too many requests")) })
    }
}

/// Origin that only returns once its cancellation token fires.
struct WaitingOrigin;

impl Origin for WaitingOrigin {
    fn fetch_data_points(&self, cancel: CancellationToken, _queries: Vec<Query>) -> FetchFuture<'_> {
        Box::pin(async move {
            cancel.cancelled().await;
            Err(OriginError::cancelled())
        })
    }
}

fn origin_node(origin: &str, query: &str) -> Arc<OriginNode> {
    Arc::new(OriginNode::new(origin, query, FreshnessPolicy::default()))
}

fn median(children: Vec<NodeRef>) -> NodeRef {
    let mut node = TickMedianNode::new(1);
    node.add_nodes(children).expect("children attach");
    Arc::new(node)
}

// =============================================================================
// Updater: Batching and Deduplication
// =============================================================================

#[tokio::test]
async fn when_two_models_share_an_origin_query_system_fetches_it_once() {
    // Given: Two models that both read X for BTC/USD through separate nodes
    let origin = Arc::new(CountingOrigin::new(20_000.0));
    let updater = Updater::builder()
        .with_origin("x", origin.clone())
        .build()
        .expect("valid config");
    let left = origin_node("x", "BTC/USD");
    let right = origin_node("x", "BTC/USD");
    let graphs = vec![
        median(vec![left.clone() as NodeRef]),
        median(vec![right.clone() as NodeRef]),
    ];

    // When: One update pass runs over both models
    updater.update(&CancellationToken::new(), &graphs).await;

    // Then: Exactly one call carried the query once, and both nodes are filled
    assert_eq!(origin.calls(), 1);
    assert_eq!(origin.batches(), vec![vec![Query::from("BTC/USD")]]);
    assert!(left.data_point().is_valid());
    assert!(right.data_point().is_valid());
}

#[tokio::test]
async fn when_origin_has_many_queries_system_sends_one_batch() {
    // Given: One origin serving three pairs
    let origin = Arc::new(CountingOrigin::new(1.0));
    let updater = Updater::builder()
        .with_origin("x", origin.clone())
        .build()
        .expect("valid config");
    let graph = median(vec![
        origin_node("x", "BTC/USD") as NodeRef,
        origin_node("x", "ETH/USD") as NodeRef,
        origin_node("x", "SOL/USD") as NodeRef,
    ]);

    // When: The pass runs
    updater.update(&CancellationToken::new(), &[graph]).await;

    // Then: All queries travel in a single batch
    assert_eq!(origin.calls(), 1);
    assert_eq!(origin.batches()[0].len(), 3);
}

#[tokio::test]
async fn when_nodes_are_fresh_system_skips_the_origin() {
    // Given: A node already refreshed by a first pass
    let origin = Arc::new(CountingOrigin::new(1.0));
    let updater = Updater::builder()
        .with_origin("x", origin.clone())
        .build()
        .expect("valid config");
    let graph = median(vec![origin_node("x", "BTC/USD") as NodeRef]);
    updater.update(&CancellationToken::new(), &[graph.clone()]).await;

    // When: A second pass runs inside the freshness window
    updater.update(&CancellationToken::new(), &[graph]).await;

    // Then: No second call is made
    assert_eq!(origin.calls(), 1);
}

// =============================================================================
// Updater: Failure Isolation
// =============================================================================

#[tokio::test]
async fn when_one_origin_panics_system_updates_the_others() {
    let _ = tracing_subscriber::fmt::try_init();

    // Given: A healthy origin and one whose adapter panics
    let healthy = Arc::new(CountingOrigin::new(20_000.0));
    let updater = Updater::builder()
        .with_origin("healthy", healthy.clone())
        .with_origin("broken", Arc::new(PanickingOrigin))
        .build()
        .expect("valid config");
    let good = origin_node("healthy", "BTC/USD");
    let bad = origin_node("broken", "BTC/USD");
    let graph = median(vec![good.clone() as NodeRef, bad.clone() as NodeRef]);

    // When: The pass runs
    updater.update(&CancellationToken::new(), &[graph.clone()]).await;

    // Then: The healthy node is refreshed, the broken one stays expired
    assert!(good.data_point().is_valid());
    assert_eq!(bad.data_point().error, Some(PointError::Expired));
    assert!(graph.data_point().is_valid());
}

#[tokio::test]
async fn when_origin_returns_error_system_keeps_previous_point() {
    let _ = tracing_subscriber::fmt::try_init();

    // Given: A node whose good point is past its freshness window, and an
    // origin that now fails
    let stale_policy = FreshnessPolicy::new(Duration::ZERO, Duration::from_secs(300))
        .expect("valid policy");
    let stale = Arc::new(OriginNode::new("flaky", "ETH/USD", stale_policy));
    stale
        .set_data_point(Point::new(
            Tick::new(Pair::new("ETH", "USD"), 2.0, 1.0),
            UtcDateTime::now(),
        ))
        .expect("accepted");
    let updater = Updater::builder()
        .with_origin("flaky", Arc::new(FailingOrigin))
        .build()
        .expect("valid config");

    // When: The pass runs over the stale node
    updater
        .update(&CancellationToken::new(), &[stale.clone() as NodeRef])
        .await;

    // Then: The cached point is untouched
    assert!(stale.data_point().is_valid());
    assert_eq!(stale.data_point().value.map(|value| value.number()), Some(2.0));
}

#[tokio::test]
async fn when_origin_omits_a_query_system_leaves_that_node_stale() {
    let _ = tracing_subscriber::fmt::try_init();

    // Given: An origin that only understands pair queries
    let origin = Arc::new(CountingOrigin::new(5.0));
    let updater = Updater::builder()
        .with_origin("x", origin.clone())
        .build()
        .expect("valid config");
    let answered = origin_node("x", "BTC/USD");
    let omitted = origin_node("x", "not-a-pair");
    let graph = median(vec![answered.clone() as NodeRef, omitted.clone() as NodeRef]);

    // When: The pass runs
    updater.update(&CancellationToken::new(), &[graph]).await;

    // Then: Only the answered node is filled
    assert!(answered.data_point().is_valid());
    assert_eq!(omitted.data_point().error, Some(PointError::Expired));
}

#[tokio::test]
async fn when_origin_is_not_registered_system_skips_its_nodes() {
    let _ = tracing_subscriber::fmt::try_init();

    // Given: A node pointing at an origin the updater does not know
    let origin = Arc::new(CountingOrigin::new(5.0));
    let updater = Updater::builder()
        .with_origin("x", origin.clone())
        .build()
        .expect("valid config");
    let known = origin_node("x", "BTC/USD");
    let unknown = origin_node("y", "BTC/USD");
    let graph = median(vec![known.clone() as NodeRef, unknown.clone() as NodeRef]);

    // When: The pass runs
    updater.update(&CancellationToken::new(), &[graph]).await;

    // Then: The known origin is still refreshed
    assert!(known.data_point().is_valid());
    assert!(!unknown.data_point().is_valid());
}

// =============================================================================
// Updater: Concurrency and Cancellation
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn when_limit_is_two_system_never_runs_more_than_two_fetches() {
    // Given: Five slow origins sharing counters and a limit of two
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut builder = Updater::builder().with_max_concurrency(2);
    let mut children = Vec::new();
    for index in 0..5 {
        let name = format!("origin-{index}");
        let origin = CountingOrigin::slow(
            1.0,
            Duration::from_millis(50),
            in_flight.clone(),
            peak.clone(),
        );
        builder = builder.with_origin(name.clone(), Arc::new(origin));
        children.push(origin_node(&name, "BTC/USD") as NodeRef);
    }
    let updater = builder.build().expect("valid config");
    let nodes = children.clone();

    // When: All five origins are stale at once
    updater
        .update(&CancellationToken::new(), &[median(children)])
        .await;

    // Then: Every node is refreshed and at most two fetches overlapped
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak concurrency was {peak}");
    assert!(peak >= 1);
    assert!(nodes.iter().all(|node| node.data_point().is_valid()));
}

#[tokio::test]
async fn when_caller_cancels_system_returns_without_results() {
    // Given: An origin that waits for cancellation
    let updater = Updater::builder()
        .with_origin("slow", Arc::new(WaitingOrigin))
        .build()
        .expect("valid config");
    let node = origin_node("slow", "BTC/USD");
    let cancel = CancellationToken::new();

    // When: The caller cancels while the fetch is in flight
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    tokio::time::timeout(
        Duration::from_secs(5),
        updater.update(&cancel, &[node.clone() as NodeRef]),
    )
    .await
    .expect("update returns after cancellation");

    // Then: The node stays unfilled
    assert_eq!(node.data_point().error, Some(PointError::Expired));
}

#[test]
fn when_updater_config_is_loaded_from_json_system_applies_defaults() {
    // Given: A config document without a concurrency limit
    let config: UpdaterConfig = serde_json::from_str("{}").expect("config deserializes");

    // When/Then: The default of ten slots applies
    assert_eq!(config.max_concurrency, 10);
    let updater = Updater::builder().with_config(config).build().expect("valid config");
    assert_eq!(updater.config().max_concurrency, 10);
    assert!(updater.origin_names().is_empty());
}
