use super::{attach_single, Node, NodeRef};
use crate::{Meta, NodeError, Point, PointError};

/// Forwards its child's point with a static meta map in place of the
/// child's own, so structurally identical subgraphs trace differently.
pub struct WrapperNode {
    node: Option<NodeRef>,
    meta: Meta,
}

impl WrapperNode {
    pub fn new(meta: Meta) -> Self {
        Self { node: None, meta }
    }
}

impl Node for WrapperNode {
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError> {
        attach_single(&mut self.node, nodes, "wrapper")
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.iter().cloned().collect()
    }

    fn data_point(&self) -> Point {
        let Some(node) = &self.node else {
            return Point::from_error(PointError::MissingNode { node: "wrapper" })
                .with_meta(self.meta());
        };
        node.data_point().with_meta(self.meta())
    }

    fn meta(&self) -> Meta {
        self.meta.clone()
    }
}
