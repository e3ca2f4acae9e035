use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{meta_type, Node, NodeRef};
use crate::{merge_meta, Meta, NodeError, Point, PointError, Query, UtcDateTime, ValidationError};

/// Age limits for a cached origin point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    /// Max age at which the cached point is current enough to skip a refresh.
    #[serde(with = "seconds")]
    pub freshness_threshold: Duration,
    /// Age beyond which the cached point is reported as expired.
    #[serde(with = "seconds")]
    pub expiry_threshold: Duration,
}

impl FreshnessPolicy {
    pub fn new(freshness_threshold: Duration, expiry_threshold: Duration) -> Result<Self, ValidationError> {
        if freshness_threshold > expiry_threshold {
            return Err(ValidationError::InvalidFreshness {
                freshness: freshness_threshold,
                expiry: expiry_threshold,
            });
        }
        Ok(Self {
            freshness_threshold,
            expiry_threshold,
        })
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            freshness_threshold: Duration::from_secs(60),
            expiry_threshold: Duration::from_secs(300),
        }
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Leaf node caching the last point fetched from one origin and query.
///
/// The cache is written only by the [`Updater`](crate::Updater) through
/// [`set_data_point`](OriginNode::set_data_point). Reads take the read lock,
/// so concurrent readers never block each other.
#[derive(Debug)]
pub struct OriginNode {
    origin: String,
    query: Query,
    policy: FreshnessPolicy,
    point: RwLock<Point>,
}

impl OriginNode {
    pub fn new(origin: impl Into<String>, query: impl Into<Query>, policy: FreshnessPolicy) -> Self {
        Self {
            origin: origin.into(),
            query: query.into(),
            policy,
            point: RwLock::new(Point::empty()),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// True while the cached point is younger than the freshness threshold.
    pub fn is_fresh(&self) -> bool {
        let point = self.point.read();
        self.is_fresh_at(&point, UtcDateTime::now())
    }

    /// True once the cached point is at least as old as the expiry threshold.
    pub fn is_expired(&self) -> bool {
        let point = self.point.read();
        self.is_expired_at(&point, UtcDateTime::now())
    }

    /// Replace the cached point.
    ///
    /// A valid cached point is never replaced by an invalid one, nor by a
    /// point older than itself. An invalid cached point is always replaced.
    /// On acceptance the node's own meta is merged over the point's meta.
    pub fn set_data_point(&self, point: Point) -> Result<(), NodeError> {
        let mut cached = self.point.write();

        if cached.is_valid() {
            if let Err(reason) = point.validate() {
                return Err(NodeError::InvalidPoint { reason });
            }
            if let (Some(incoming), Some(current)) = (point.time, cached.time) {
                if incoming < current {
                    return Err(NodeError::StalePoint {
                        incoming,
                        cached: current,
                    });
                }
            }
        }

        let meta = merge_meta(&point.meta, &self.meta());
        *cached = Point { meta, ..point };
        Ok(())
    }

    fn is_fresh_at(&self, point: &Point, now: UtcDateTime) -> bool {
        point
            .time
            .and_then(|time| time.checked_add(self.policy.freshness_threshold))
            .is_some_and(|fresh_until| now < fresh_until)
    }

    fn is_expired_at(&self, point: &Point, now: UtcDateTime) -> bool {
        match point.time {
            None => true,
            Some(time) => time
                .checked_add(self.policy.expiry_threshold)
                .is_some_and(|expires_at| now >= expires_at),
        }
    }

    fn expired_point(&self, now: UtcDateTime) -> Point {
        Point {
            time: Some(now),
            meta: self.meta(),
            error: Some(PointError::Expired),
            ..Point::default()
        }
    }
}

impl Node for OriginNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        if nodes.is_empty() {
            return Ok(());
        }
        Err(NodeError::Leaf)
    }

    fn nodes(&self) -> Vec<NodeRef> {
        Vec::new()
    }

    /// Cached point; an expired point without an error is rewritten in place
    /// into an expiry error before it is returned.
    fn data_point(&self) -> Point {
        let now = UtcDateTime::now();
        {
            let point = self.point.read();
            if point.error.is_some() || !self.is_expired_at(&point, now) {
                return point.clone();
            }
        }

        let mut point = self.point.write();
        if point.error.is_none() && self.is_expired_at(&point, now) {
            *point = self.expired_point(now);
        }
        point.clone()
    }

    fn meta(&self) -> Meta {
        let mut meta = meta_type("origin");
        meta.insert("origin".to_owned(), self.origin.clone().into());
        meta.insert("query".to_owned(), self.query.as_str().into());
        meta.insert(
            "freshness_threshold".to_owned(),
            self.policy.freshness_threshold.as_secs().into(),
        );
        meta.insert(
            "expiry_threshold".to_owned(),
            self.policy.expiry_threshold.as_secs().into(),
        );
        meta
    }

    fn as_origin(&self) -> Option<&OriginNode> {
        Some(self)
    }
}
