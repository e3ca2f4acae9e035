use super::{attach_single, meta_type, Node, NodeRef};
use crate::{Meta, NodeError, Point, PointError};

/// Embeds another model's root in this graph.
///
/// The child is attached once at construction; the node forwards its point
/// and records it as the single sub-point.
#[derive(Default)]
pub struct ReferenceNode {
    node: Option<NodeRef>,
}

impl ReferenceNode {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Node for ReferenceNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        attach_single(&mut self.node, nodes, "reference")
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.iter().cloned().collect()
    }

    fn data_point(&self) -> Point {
        let Some(node) = &self.node else {
            return Point::from_error(PointError::MissingNode { node: "reference" })
                .with_meta(self.meta());
        };

        let point = node.data_point();
        Point {
            value: point.value.clone(),
            time: point.time,
            error: point.error.clone(),
            sub_points: vec![point],
            meta: self.meta(),
        }
    }

    fn meta(&self) -> Meta {
        meta_type("reference")
    }
}
