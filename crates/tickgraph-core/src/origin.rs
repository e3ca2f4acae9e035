//! Origin contract and query types.
//!
//! An origin is an external source of values (exchange API, on-chain
//! contract) addressed by name. The [`Updater`](crate::Updater) hands every
//! origin a batch of opaque [`Query`] keys and expects a map of points back.
//!
//! # Example Implementation
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use tickgraph_core::{
//!     FetchFuture, Origin, Pair, Point, Query, StaticValue, Tick, UtcDateTime,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct FixedPrice(f64);
//!
//! impl Origin for FixedPrice {
//!     fn fetch_data_points(&self, _cancel: CancellationToken, queries: Vec<Query>) -> FetchFuture<'_> {
//!         Box::pin(async move {
//!             let now = UtcDateTime::now();
//!             let mut points = HashMap::new();
//!             for query in queries {
//!                 let pair = Pair::parse(query.as_str()).unwrap_or_default();
//!                 points.insert(query, Point::new(Tick::new(pair, self.0, 0.0), now));
//!             }
//!             Ok(points)
//!         })
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{Pair, Point, StaticValue, UtcDateTime};

/// Origin-specific lookup key, usually a pair like `BTC/USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Pair> for Query {
    fn from(value: Pair) -> Self {
        Self(value.to_string())
    }
}

/// Origin-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginErrorKind {
    Unavailable,
    RateLimited,
    InvalidQuery,
    Cancelled,
    Internal,
}

/// Structured error returned by a whole origin batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginError {
    kind: OriginErrorKind,
    message: String,
    retryable: bool,
}

impl OriginError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: OriginErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: OriginErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self {
            kind: OriginErrorKind::InvalidQuery,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: OriginErrorKind::Cancelled,
            message: String::from("fetch cancelled before it could start"),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: OriginErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> OriginErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            OriginErrorKind::Unavailable => "origin.unavailable",
            OriginErrorKind::RateLimited => "origin.rate_limited",
            OriginErrorKind::InvalidQuery => "origin.invalid_query",
            OriginErrorKind::Cancelled => "origin.cancelled",
            OriginErrorKind::Internal => "origin.internal",
        }
    }
}

impl Display for OriginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for OriginError {}

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HashMap<Query, Point>, OriginError>> + Send + 'a>>;

/// External value source.
///
/// Implementations need not return an entry for every query; missing
/// entries leave the corresponding cache untouched. A top-level `Err` aborts
/// only this origin's batch for the current update pass.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as every fetch runs on its own task.
pub trait Origin: Send + Sync {
    /// Fetch points for all `queries` in one batch.
    ///
    /// `cancel` is triggered when the caller gives up on the update pass.
    fn fetch_data_points(&self, cancel: CancellationToken, queries: Vec<Query>) -> FetchFuture<'_>;
}

/// Origin serving constant numbers.
///
/// Queries found in the table resolve to their configured number; any other
/// query that parses as a number resolves to itself. Everything else is
/// omitted from the result.
#[derive(Debug, Clone, Default)]
pub struct StaticOrigin {
    values: HashMap<Query, f64>,
}

impl StaticOrigin {
    pub fn new(values: HashMap<Query, f64>) -> Self {
        Self { values }
    }

    pub fn with_value(mut self, query: impl Into<Query>, value: f64) -> Self {
        self.values.insert(query.into(), value);
        self
    }

    fn resolve(&self, query: &Query) -> Option<f64> {
        self.values
            .get(query)
            .copied()
            .or_else(|| query.as_str().trim().parse::<f64>().ok())
    }
}

impl Origin for StaticOrigin {
    fn fetch_data_points(&self, _cancel: CancellationToken, queries: Vec<Query>) -> FetchFuture<'_> {
        Box::pin(async move {
            let now = UtcDateTime::now();
            let points = queries
                .into_iter()
                .filter_map(|query| {
                    let value = self.resolve(&query)?;
                    Some((query, Point::new(StaticValue::new(value), now)))
                })
                .collect();
            Ok(points)
        })
    }
}
