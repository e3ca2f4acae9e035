use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Asset pair such as `BTC/USD`.
///
/// Both sides are normalized to uppercase. The default value is the empty
/// pair, which never passes tick validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_ascii_uppercase(),
            quote: quote.as_ref().trim().to_ascii_uppercase(),
        }
    }

    /// Parse a `BASE/QUOTE` string.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPair);
        }

        let Some((base, quote)) = trimmed.split_once('/') else {
            return Err(ValidationError::InvalidPair {
                value: input.to_owned(),
            });
        };

        let pair = Self::new(base, quote);
        if pair.base.is_empty() || pair.quote.is_empty() || pair.quote.contains('/') {
            return Err(ValidationError::InvalidPair {
                value: input.to_owned(),
            });
        }

        Ok(pair)
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() || self.quote.is_empty()
    }

    /// Swap base and quote.
    pub fn invert(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

impl Display for Pair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Pair {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
