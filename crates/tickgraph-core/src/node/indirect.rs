use super::{meta_type, Node, NodeRef};
use crate::{Meta, NodeError, Pair, Point, PointError, Tick, UtcDateTime, Value};

/// Derives a cross rate by chaining ticks that share an asset.
///
/// Children are folded left to right; `BTC/USDT` followed by `USDT/USD`
/// yields `BTC/USD`. Every child must be a valid tick, there is no partial
/// result.
#[derive(Default)]
pub struct TickIndirectNode {
    nodes: Vec<NodeRef>,
}

impl TickIndirectNode {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Node for TickIndirectNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        self.nodes.extend(nodes);
        Ok(())
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.nodes.clone()
    }

    fn data_point(&self) -> Point {
        let points: Vec<Point> = self.nodes.iter().map(|node| node.data_point()).collect();

        let result = collect_ticks(&points).and_then(|ticks| cross_rate(&points, &ticks));
        match result {
            Ok(point) => point.with_sub_points(points).with_meta(self.meta()),
            Err(error) => Point::from_error(error)
                .with_sub_points(points)
                .with_meta(self.meta()),
        }
    }

    fn meta(&self) -> Meta {
        meta_type("indirect")
    }
}

fn collect_ticks(points: &[Point]) -> Result<Vec<(&Tick, UtcDateTime)>, PointError> {
    points
        .iter()
        .map(|point| {
            point
                .validate()
                .map_err(|error| PointError::invalid_input("indirect", error))?;
            match (&point.value, point.time) {
                (Some(Value::Tick(tick)), Some(time)) => Ok((tick, time)),
                (value, _) => Err(PointError::TypeMismatch {
                    expected: "tick",
                    found: value.as_ref().map_or("none", Value::kind).to_owned(),
                }),
            }
        })
        .collect()
}

/// Fold the chain into a single point. Zero ticks give an empty point and a
/// single tick gives that child's point unchanged.
fn cross_rate(points: &[Point], ticks: &[(&Tick, UtcDateTime)]) -> Result<Point, PointError> {
    let Some(((first, first_time), rest)) = ticks.split_first() else {
        return Ok(Point::empty());
    };
    if rest.is_empty() {
        return Ok(points[0].clone());
    }

    let mut tick = (*first).clone();
    let mut time = *first_time;
    for (next, next_time) in rest {
        tick = cross_tick(&tick, next)?;
        time = time.min(*next_time);
    }
    Ok(Point::new(tick, time))
}

/// Resolve the implied pair and price of two ticks sharing an asset.
fn cross_tick(a: &Tick, b: &Tick) -> Result<Tick, PointError> {
    let (pair, price) = if a.pair.quote == b.pair.quote {
        // A/C, B/C => A/B
        let price = if b.price > 0.0 { a.price / b.price } else { 0.0 };
        (Pair::new(&a.pair.base, &b.pair.base), price)
    } else if a.pair.base == b.pair.base {
        // C/A, C/B => A/B
        let price = if a.price > 0.0 { b.price / a.price } else { 0.0 };
        (Pair::new(&a.pair.quote, &b.pair.quote), price)
    } else if a.pair.quote == b.pair.base {
        // A/C, C/B => A/B
        (Pair::new(&a.pair.base, &b.pair.quote), a.price * b.price)
    } else if a.pair.base == b.pair.quote {
        // C/A, B/C => A/B
        let price = if a.price > 0.0 && b.price > 0.0 {
            1.0 / (a.price * b.price)
        } else {
            0.0
        };
        (Pair::new(&a.pair.quote, &b.pair.base), price)
    } else {
        return Err(PointError::CrossRate {
            left: a.pair.clone(),
            right: b.pair.clone(),
        });
    };

    Ok(Tick::new(pair, price, 0.0))
}
