use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{CodecError, Tick, ValidationError};

/// Constant numeric value, used by origins with no real external source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticValue {
    pub value: f64,
}

impl StaticValue {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "value" });
        }
        Ok(())
    }
}

impl Display for StaticValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Static({})", self.value)
    }
}

/// Value carried by a [`Point`](crate::Point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Tick(Tick),
    Static(StaticValue),
}

impl Value {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tick(_) => "tick",
            Self::Static(_) => "static",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Tick(tick) => tick.validate(),
            Self::Static(value) => value.validate(),
        }
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            Self::Tick(tick) => Some(tick),
            Self::Static(_) => None,
        }
    }

    /// Numeric reading of the value: the price of a tick or the static number.
    pub fn number(&self) -> f64 {
        match self {
            Self::Tick(tick) => tick.price,
            Self::Static(value) => value.value,
        }
    }

    /// Encode as MessagePack.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick(tick) => tick.fmt(f),
            Self::Static(value) => value.fmt(f),
        }
    }
}

impl From<Tick> for Value {
    fn from(value: Tick) -> Self {
        Self::Tick(value)
    }
}

impl From<StaticValue> for Value {
    fn from(value: StaticValue) -> Self {
        Self::Static(value)
    }
}
