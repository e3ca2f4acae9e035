use super::{attach_single, meta_type, Node, NodeRef};
use crate::{Meta, NodeError, Pair, Point, PointError, Value};

/// Relabels its child's tick with an alias pair; price and volume are kept.
pub struct TickAliasNode {
    alias: Pair,
    node: Option<NodeRef>,
}

impl TickAliasNode {
    pub fn new(alias: Pair) -> Self {
        Self { alias, node: None }
    }

    pub fn alias(&self) -> &Pair {
        &self.alias
    }
}

impl Node for TickAliasNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        attach_single(&mut self.node, nodes, "alias")
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.iter().cloned().collect()
    }

    fn data_point(&self) -> Point {
        let Some(node) = &self.node else {
            return Point::from_error(PointError::MissingNode { node: "alias" })
                .with_meta(self.meta());
        };

        let point = node.data_point();
        let value = match &point.value {
            Some(Value::Tick(tick)) => {
                let mut tick = tick.clone();
                tick.pair = self.alias.clone();
                Some(Value::Tick(tick))
            }
            // Propagate the child's own failure rather than masking it.
            None if point.error.is_some() => None,
            other => {
                let error = PointError::TypeMismatch {
                    expected: "tick",
                    found: other.as_ref().map_or("none", Value::kind).to_owned(),
                };
                return Point {
                    time: point.time,
                    meta: self.meta(),
                    error: Some(error),
                    sub_points: vec![point],
                    ..Point::default()
                };
            }
        };

        Point {
            value,
            time: point.time,
            error: point.error.clone(),
            sub_points: vec![point],
            meta: self.meta(),
        }
    }

    fn meta(&self) -> Meta {
        let mut meta = meta_type("alias");
        meta.insert("alias".to_owned(), self.alias.to_string().into());
        meta
    }
}
