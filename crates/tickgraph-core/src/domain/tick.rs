use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Pair, ValidationError};

/// Priced asset pair with its trailing 24h volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub pair: Pair,
    pub price: f64,
    pub volume_24h: f64,
}

impl Tick {
    pub fn new(pair: Pair, price: f64, volume_24h: f64) -> Self {
        Self {
            pair,
            price,
            volume_24h,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pair.is_empty() {
            return Err(ValidationError::EmptyPair);
        }
        if !self.price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if self.price <= 0.0 {
            return Err(ValidationError::NonPositiveValue { field: "price" });
        }
        if !self.volume_24h.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "volume_24h",
            });
        }
        if self.volume_24h < 0.0 {
            return Err(ValidationError::NegativeValue {
                field: "volume_24h",
            });
        }
        Ok(())
    }
}

impl Display for Tick {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick({}, {}, {})", self.pair, self.price, self.volume_24h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc_usd() -> Pair {
        Pair::new("BTC", "USD")
    }

    #[test]
    fn accepts_positive_price_and_zero_volume() {
        Tick::new(btc_usd(), 20_000.0, 0.0)
            .validate()
            .expect("tick should be valid");
    }

    #[test]
    fn rejects_empty_pair() {
        let err = Tick::new(Pair::default(), 1.0, 0.0)
            .validate()
            .expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyPair);
    }

    #[test]
    fn rejects_non_positive_or_infinite_price() {
        for price in [0.0, -1.0] {
            let err = Tick::new(btc_usd(), price, 0.0)
                .validate()
                .expect_err("must fail");
            assert!(matches!(err, ValidationError::NonPositiveValue { .. }));
        }
        let err = Tick::new(btc_usd(), f64::INFINITY, 0.0)
            .validate()
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }

    #[test]
    fn rejects_negative_volume() {
        let err = Tick::new(btc_usd(), 1.0, -5.0)
            .validate()
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { .. }));
    }
}
