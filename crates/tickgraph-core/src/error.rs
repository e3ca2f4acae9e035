use std::time::Duration;

use thiserror::Error;

use crate::{Pair, UtcDateTime};

/// Validation and contract errors exposed by `tickgraph-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("pair must have a non-empty base and quote")]
    EmptyPair,
    #[error("invalid pair '{value}', expected BASE/QUOTE")]
    InvalidPair { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be positive")]
    NonPositiveValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("freshness threshold {freshness:?} must not exceed expiry threshold {expiry:?}")]
    InvalidFreshness { freshness: Duration, expiry: Duration },
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,
}

/// Failure carried inside a [`Point`](crate::Point).
///
/// Nodes never return errors from `data_point`; they embed one of these in
/// the returned point instead, so a partially failed graph still yields a
/// point that explains what went wrong.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PointError {
    #[error("data point is expired")]
    Expired,
    #[error("data point has no value")]
    MissingValue,
    #[error("data point has no timestamp")]
    MissingTime,
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("invalid data point value, expected: {expected}, got: {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("{node} node has no child node attached")]
    MissingNode { node: &'static str },
    #[error("invalid data point in {node} node: {source}")]
    InvalidInput {
        node: &'static str,
        #[source]
        source: Box<PointError>,
    },

    #[error("pair mismatch: expected {expected}, got {found}")]
    PairMismatch { expected: Pair, found: Pair },
    #[error("unable to calculate cross rate for {left} and {right}")]
    CrossRate { left: Pair, right: Pair },
    #[error("not enough values to calculate median: got {valid}, need {min}")]
    Quorum { valid: usize, min: usize },
    #[error("deviation {deviation} exceeds threshold {threshold}")]
    Deviation { deviation: f64, threshold: f64 },

    #[error("origin fetch failed: {message}")]
    Fetch { message: String },
}

impl PointError {
    pub(crate) fn invalid_input(node: &'static str, source: PointError) -> Self {
        Self::InvalidInput {
            node,
            source: Box::new(source),
        }
    }
}

/// Errors returned by node construction and cache writes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    #[error("{node} node accepts at most {max} child node(s)")]
    Arity { node: &'static str, max: usize },
    #[error("origin node is a leaf and cannot have child nodes")]
    Leaf,
    #[error("data point at {incoming} is older than the cached data point at {cached}")]
    StalePoint {
        incoming: UtcDateTime,
        cached: UtcDateTime,
    },
    #[error("refusing to replace a valid data point with an invalid one: {reason}")]
    InvalidPoint { reason: PointError },
}

/// Errors returned by the read facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("model '{name}' not found")]
    ModelNotFound { name: String },
}

/// Binary codec errors for [`Value`](crate::Value).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
