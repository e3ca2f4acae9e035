//! # Tickgraph Core
//!
//! Price graph engine: models are small DAGs whose leaves cache points
//! fetched from external origins and whose inner nodes derive prices from
//! their children.
//!
//! ## Overview
//!
//! - **Value/point data model** with per-node trace information
//! - **Node algebra**: reference, wrapper, alias, cross rate, median and
//!   deviation circuit breaker
//! - **Origin cache nodes** with freshness and expiry policies
//! - **Concurrent updater** that refreshes stale origins with one bounded
//!   fetch per origin
//! - **Provider** read facade over named models
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Pairs, ticks, values, timestamps and points |
//! | [`error`] | Core error types |
//! | [`node`] | `Node` trait and the node family |
//! | [`origin`] | `Origin` trait for external price sources |
//! | [`updater`] | Concurrent refresh of origin nodes |
//! | [`provider`] | Read API over named models |
//! | [`trace`] | Text tree rendering for debugging |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use tickgraph_core::{
//!     FreshnessPolicy, Node, NodeRef, OriginNode, Provider, ReferenceNode, StaticOrigin, Updater,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let updater = Updater::builder()
//!         .with_origin("static", Arc::new(StaticOrigin::default().with_value("usd", 1.0)))
//!         .build()?;
//!
//!     let leaf: NodeRef = Arc::new(OriginNode::new("static", "usd", FreshnessPolicy::default()));
//!     let mut model = ReferenceNode::new();
//!     model.add_nodes(vec![leaf])?;
//!
//!     let models = HashMap::from([("USD/USD".to_owned(), Arc::new(model) as NodeRef)]);
//!     let provider = Provider::new(models, Some(updater));
//!
//!     let point = provider.data_point(&CancellationToken::new(), "USD/USD").await?;
//!     assert_eq!(point.value.map(|value| value.number()), Some(1.0));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Provider       │
//! └────────┬────────┘
//!          │ update pass scoped to requested roots
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Updater        │────▶│ Origin (trait)   │
//! │  (semaphore)    │     │ one task/origin  │
//! └────────┬────────┘     └──────────────────┘
//!          │ set_data_point
//!          ▼
//! ┌─────────────────┐
//! │ OriginNode      │◀──── aggregator nodes read
//! │ (RwLock cache)  │      children on demand
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Computation never fails with `Err`: a node that cannot produce a value
//! returns a [`Point`] carrying a [`PointError`], and parents record it in
//! their sub-points.
//!
//! ```rust
//! use tickgraph_core::{Point, PointError};
//!
//! fn explain(point: &Point) -> &'static str {
//!     match &point.error {
//!         None => "ok",
//!         Some(PointError::Expired) => "origin data is too old",
//!         Some(PointError::Quorum { .. }) => "too few sources agree",
//!         Some(PointError::Deviation { .. }) => "price diverged from reference",
//!         Some(_) => "invalid",
//!     }
//! }
//!
//! assert_eq!(explain(&Point::from_error(PointError::Expired)), "origin data is too old");
//! ```

pub mod domain;
pub mod error;
pub mod node;
pub mod origin;
pub mod provider;
pub mod trace;
pub mod updater;

// Domain models
pub use domain::{merge_meta, Meta, Pair, Point, StaticValue, Tick, UtcDateTime, Value};

// Error types
pub use error::{CodecError, NodeError, PointError, ProviderError, ValidationError};

// Node family
pub use node::{
    walk, DevCircuitBreakerNode, FreshnessPolicy, Node, NodeRef, OriginNode, ReferenceNode,
    TickAliasNode, TickIndirectNode, TickMedianNode, WrapperNode, DEFAULT_DEVIATION_THRESHOLD,
};

// Origins
pub use origin::{FetchFuture, Origin, OriginError, OriginErrorKind, Query, StaticOrigin};

// Read facade
pub use provider::{ModelDesc, Provider};

// Updater
pub use updater::{
    stale_origins, Updater, UpdaterBuilder, UpdaterConfig, DEFAULT_MAX_CONCURRENCY,
};
