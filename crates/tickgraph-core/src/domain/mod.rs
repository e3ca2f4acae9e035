//! # Domain Models
//!
//! Data carried through the price graph.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Pair`] | Asset pair (`BTC/USD`) |
//! | [`Tick`] | Priced pair with 24h volume |
//! | [`StaticValue`] | Constant number |
//! | [`Value`] | Closed set of point values |
//! | [`Point`] | Value + time + provenance + error |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Values validate themselves and a [`Point`] is valid only when its value is
//! valid, it has a timestamp, and it carries no error:
//!
//! ```rust
//! use tickgraph_core::{Pair, Point, Tick, UtcDateTime};
//!
//! let point = Point::new(Tick::new(Pair::new("BTC", "USD"), 0.0, 0.0), UtcDateTime::now());
//! assert!(point.validate().is_err());
//! ```

mod pair;
mod point;
mod tick;
mod timestamp;
mod value;

pub use pair::Pair;
pub use point::{merge_meta, Meta, Point};
pub use tick::Tick;
pub use timestamp::UtcDateTime;
pub use value::{StaticValue, Value};
