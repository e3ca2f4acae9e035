use super::{meta_type, Node, NodeRef};
use crate::{Meta, NodeError, Pair, Point, PointError, Tick, UtcDateTime, Value};

/// Median price of same-pair ticks with a minimum quorum.
///
/// Invalid children are skipped but still recorded as sub-points. The
/// result carries the earliest timestamp seen across all children and a
/// zero volume.
pub struct TickMedianNode {
    min_values: usize,
    nodes: Vec<NodeRef>,
}

impl TickMedianNode {
    pub fn new(min_values: usize) -> Self {
        Self {
            min_values,
            nodes: Vec::new(),
        }
    }

    pub fn min_values(&self) -> usize {
        self.min_values
    }

    fn failed(&self, time: Option<UtcDateTime>, points: Vec<Point>, error: PointError) -> Point {
        Point {
            time,
            sub_points: points,
            meta: self.meta(),
            error: Some(error),
            ..Point::default()
        }
    }
}

impl Node for TickMedianNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        self.nodes.extend(nodes);
        Ok(())
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.nodes.clone()
    }

    fn data_point(&self) -> Point {
        let points: Vec<Point> = self.nodes.iter().map(|node| node.data_point()).collect();
        let time = points.iter().filter_map(|point| point.time).min();

        let mut pair: Option<&Pair> = None;
        let mut prices = Vec::with_capacity(points.len());
        let mut mismatch = None;
        for point in points.iter().filter(|point| point.is_valid()) {
            let tick = match &point.value {
                Some(Value::Tick(tick)) => tick,
                other => {
                    mismatch = Some(PointError::TypeMismatch {
                        expected: "tick",
                        found: other.as_ref().map_or("none", Value::kind).to_owned(),
                    });
                    break;
                }
            };
            match pair {
                None => pair = Some(&tick.pair),
                Some(expected) if *expected != tick.pair => {
                    mismatch = Some(PointError::PairMismatch {
                        expected: expected.clone(),
                        found: tick.pair.clone(),
                    });
                    break;
                }
                Some(_) => {}
            }
            prices.push(tick.price);
        }
        if let Some(error) = mismatch {
            return self.failed(time, points, error);
        }

        let Some(pair) = pair.cloned() else {
            let error = PointError::Quorum {
                valid: 0,
                min: self.min_values,
            };
            return self.failed(time, points, error);
        };
        if prices.len() < self.min_values {
            let error = PointError::Quorum {
                valid: prices.len(),
                min: self.min_values,
            };
            return self.failed(time, points, error);
        }

        let price = median(&mut prices);
        Point {
            value: Some(Value::Tick(Tick::new(pair, price, 0.0))),
            time,
            sub_points: points,
            meta: self.meta(),
            error: None,
        }
    }

    fn meta(&self) -> Meta {
        let mut meta = meta_type("median");
        meta.insert("min_values".to_owned(), self.min_values.into());
        meta
    }
}

/// Median of a non-empty slice; the mean of the middle pair for even counts.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
