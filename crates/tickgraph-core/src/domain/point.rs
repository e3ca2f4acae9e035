use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::{PointError, UtcDateTime, Value};

/// Free-form annotations attached to points and nodes.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// A value observed or derived at a point in time.
///
/// A point is valid when it carries no error, has a value that passes its own
/// validation, and has a timestamp. `sub_points` records which child points
/// produced this one; it is informational and only used for tracing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Point {
    pub value: Option<Value>,
    pub time: Option<UtcDateTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_points: Vec<Point>,
    #[serde(skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<PointError>,
}

impl Point {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(value: impl Into<Value>, time: UtcDateTime) -> Self {
        Self {
            value: Some(value.into()),
            time: Some(time),
            ..Self::default()
        }
    }

    /// Point carrying only an error.
    pub fn from_error(error: PointError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: PointError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_sub_points(mut self, sub_points: Vec<Point>) -> Self {
        self.sub_points = sub_points;
        self
    }

    pub fn validate(&self) -> Result<(), PointError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let Some(value) = &self.value else {
            return Err(PointError::MissingValue);
        };
        value.validate()?;
        if self.time.is_none() {
            return Err(PointError::MissingTime);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Merge `overlay` into a copy of `base`; keys from `overlay` win.
pub fn merge_meta(base: &Meta, overlay: &Meta) -> Meta {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn serialize_error<S>(error: &Option<PointError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
