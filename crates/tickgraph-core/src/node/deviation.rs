use super::{meta_type, Node, NodeRef};
use crate::{Meta, NodeError, Point, PointError, Value};

/// Threshold used when no threshold node is attached (10%).
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 0.1;

const NODE: &str = "deviation circuit breaker";

/// Guards a price against a trusted reference.
///
/// Children fill fixed roles in attach order: price, reference, and an
/// optional threshold node whose numeric value overrides the configured
/// threshold. When `|price - reference| / reference` exceeds the threshold,
/// or either input is invalid, the node reports an error; otherwise it
/// passes the price through.
pub struct DevCircuitBreakerNode {
    threshold: f64,
    price: Option<NodeRef>,
    reference: Option<NodeRef>,
    threshold_node: Option<NodeRef>,
}

impl DevCircuitBreakerNode {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            price: None,
            reference: None,
            threshold_node: None,
        }
    }

    fn slots(&self) -> [&Option<NodeRef>; 3] {
        [&self.price, &self.reference, &self.threshold_node]
    }

    fn threshold(&self, sub_points: &mut Vec<Point>) -> Result<f64, PointError> {
        let Some(node) = &self.threshold_node else {
            return Ok(self.threshold);
        };
        let point = node.data_point();
        let threshold = point
            .validate()
            .map(|()| point.value.as_ref().map_or(f64::NAN, Value::number));
        sub_points.push(point);
        threshold.map_err(|error| PointError::invalid_input(NODE, error))
    }
}

impl Default for DevCircuitBreakerNode {
    fn default() -> Self {
        Self::new(DEFAULT_DEVIATION_THRESHOLD)
    }
}

impl Node for DevCircuitBreakerNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        let used = self.slots().iter().filter(|slot| slot.is_some()).count();
        if used + nodes.len() > 3 {
            return Err(NodeError::Arity { node: NODE, max: 3 });
        }
        for node in nodes {
            let slot = [&mut self.price, &mut self.reference, &mut self.threshold_node]
                .into_iter()
                .find(|slot| slot.is_none());
            if let Some(slot) = slot {
                *slot = Some(node);
            }
        }
        Ok(())
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.slots().into_iter().flatten().cloned().collect()
    }

    fn data_point(&self) -> Point {
        let (Some(price_node), Some(reference_node)) = (&self.price, &self.reference) else {
            return Point::from_error(PointError::MissingNode { node: NODE }).with_meta(self.meta());
        };

        let price_point = price_node.data_point();
        let reference_point = reference_node.data_point();
        let value = price_point.value.clone();
        let time = price_point.time;

        let checked = price_point
            .validate()
            .and_then(|()| reference_point.validate())
            .map_err(|error| PointError::invalid_input(NODE, error));
        let price = price_point.value.as_ref().map_or(f64::NAN, Value::number);
        let reference = reference_point.value.as_ref().map_or(f64::NAN, Value::number);

        let mut sub_points = vec![price_point, reference_point];
        let outcome = checked
            .and_then(|()| self.threshold(&mut sub_points))
            .and_then(|threshold| {
                let deviation = if reference == 0.0 {
                    f64::INFINITY
                } else {
                    ((price - reference) / reference).abs()
                };
                if deviation > threshold {
                    Err(PointError::Deviation {
                        deviation,
                        threshold,
                    })
                } else {
                    Ok(())
                }
            });

        Point {
            value,
            time,
            sub_points,
            meta: self.meta(),
            error: outcome.err(),
        }
    }

    fn meta(&self) -> Meta {
        let mut meta = meta_type("deviation_circuit_breaker");
        meta.insert("threshold".to_owned(), self.threshold.into());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::{fixed, tick_point, ts};
    use crate::StaticValue;

    fn breaker(threshold: f64, points: Vec<Point>) -> DevCircuitBreakerNode {
        let mut node = DevCircuitBreakerNode::new(threshold);
        node.add_nodes(points.into_iter().map(fixed).collect())
            .expect("attach");
        node
    }

    #[test]
    fn passes_price_within_threshold() {
        let price = tick_point("BTC/USD", 10.0, 0);
        let point = breaker(0.1, vec![price.clone(), tick_point("BTC/USD", 10.6, 0)]).data_point();

        assert!(point.is_valid(), "unexpected error: {:?}", point.error);
        assert_eq!(point.value, price.value);
        assert_eq!(point.time, price.time);
        assert_eq!(point.sub_points.len(), 2);
    }

    #[test]
    fn trips_when_deviation_exceeds_threshold() {
        let point = breaker(
            0.1,
            vec![tick_point("BTC/USD", 10.0, 0), tick_point("BTC/USD", 12.0, 0)],
        )
        .data_point();

        match point.error {
            Some(PointError::Deviation {
                deviation,
                threshold,
            }) => {
                assert!((deviation - 2.0 / 12.0).abs() < 1e-12);
                assert_eq!(threshold, 0.1);
            }
            other => panic!("expected deviation error, got {other:?}"),
        }
    }

    #[test]
    fn threshold_node_overrides_default() {
        let point = breaker(
            0.1,
            vec![
                tick_point("BTC/USD", 10.0, 0),
                tick_point("BTC/USD", 12.0, 0),
                Point::new(StaticValue::new(0.25), ts(0)),
            ],
        )
        .data_point();
        assert!(point.is_valid(), "unexpected error: {:?}", point.error);
        assert_eq!(point.sub_points.len(), 3);
    }

    #[test]
    fn invalid_reference_trips_breaker() {
        let point = breaker(
            0.1,
            vec![tick_point("BTC/USD", 10.0, 0), Point::from_error(PointError::Expired)],
        )
        .data_point();
        assert_eq!(
            point.error,
            Some(PointError::invalid_input(NODE, PointError::Expired))
        );
    }

    #[test]
    fn invalid_price_trips_breaker() {
        let point = breaker(
            0.1,
            vec![tick_point("BTC/USD", 0.0, 0), tick_point("BTC/USD", 10.0, 0)],
        )
        .data_point();
        assert!(matches!(point.error, Some(PointError::InvalidInput { .. })));
    }

    #[test]
    fn accepts_at_most_three_children() {
        let mut node = breaker(0.1, vec![Point::empty(), Point::empty()]);
        node.add_nodes(vec![fixed(Point::empty())])
            .expect("third child is the threshold");
        let err = node
            .add_nodes(vec![fixed(Point::empty())])
            .expect_err("fourth child must fail");
        assert_eq!(err, NodeError::Arity { node: NODE, max: 3 });
        assert_eq!(node.nodes().len(), 3);
    }

    #[test]
    fn missing_reference_is_reported() {
        let point = breaker(0.1, vec![tick_point("BTC/USD", 10.0, 0)]).data_point();
        assert_eq!(point.error, Some(PointError::MissingNode { node: NODE }));
    }
}
