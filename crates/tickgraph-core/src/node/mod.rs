//! # Graph Nodes
//!
//! Every element of a price graph implements [`Node`]. Leaves are
//! [`OriginNode`]s caching values from external origins; everything else
//! derives its point from its children on each read.
//!
//! | Node | Children | Produces |
//! |------|----------|----------|
//! | [`OriginNode`] | none | cached origin point |
//! | [`ReferenceNode`] | 1 | another model's point |
//! | [`WrapperNode`] | 1 | child point with static meta |
//! | [`TickAliasNode`] | 1 | tick renamed to an alias pair |
//! | [`TickIndirectNode`] | 0..N | cross rate of a tick chain |
//! | [`TickMedianNode`] | 0..N | median of same-pair ticks |
//! | [`DevCircuitBreakerNode`] | 2..3 | price guarded by a reference |
//!
//! Graphs are assembled bottom-up by an external builder and are immutable
//! once shared: `add_nodes` needs `&mut self`, so it can only run before a
//! node is wrapped in a [`NodeRef`]. The only runtime-mutable state is the
//! cached point inside each [`OriginNode`].

mod alias;
mod deviation;
mod indirect;
mod median;
mod origin;
mod reference;
mod wrapper;

use std::collections::HashSet;
use std::sync::Arc;

use crate::{Meta, NodeError, Point};

pub use alias::TickAliasNode;
pub use deviation::{DevCircuitBreakerNode, DEFAULT_DEVIATION_THRESHOLD};
pub use indirect::TickIndirectNode;
pub use median::TickMedianNode;
pub use origin::{FreshnessPolicy, OriginNode};
pub use reference::ReferenceNode;
pub use wrapper::WrapperNode;

/// Shared handle to a node in a graph.
pub type NodeRef = Arc<dyn Node>;

/// Polymorphic unit of computation in a price graph.
pub trait Node: Send + Sync {
    /// Attach children. Fails when the node's arity would be exceeded.
    fn add_nodes(&mut self, nodes: Vec<NodeRef>) -> Result<(), NodeError>;

    /// Children in the order they were attached.
    fn nodes(&self) -> Vec<NodeRef>;

    /// Current point. Failures are reported inside the point, never raised.
    fn data_point(&self) -> Point;

    /// Static description of the node.
    fn meta(&self) -> Meta;

    /// Downcast hook used by the updater to find cache leaves.
    fn as_origin(&self) -> Option<&OriginNode> {
        None
    }
}

/// Visit every node reachable from `roots` once, depth-first, parents before
/// children.
pub fn walk<F>(roots: &[NodeRef], mut visit: F)
where
    F: FnMut(&NodeRef),
{
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeRef> = roots.iter().rev().cloned().collect();

    while let Some(node) = stack.pop() {
        if !seen.insert(node_key(&node)) {
            continue;
        }
        visit(&node);
        stack.extend(node.nodes().into_iter().rev());
    }
}

fn node_key(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as *const () as usize
}

pub(crate) fn meta_type(kind: &str) -> Meta {
    Meta::from([("type".to_owned(), serde_json::Value::from(kind))])
}

/// Attach exactly one child to a single-child node.
pub(crate) fn attach_single(
    slot: &mut Option<NodeRef>,
    nodes: Vec<NodeRef>,
    node: &'static str,
) -> Result<(), NodeError> {
    if nodes.is_empty() {
        return Ok(());
    }
    if slot.is_some() || nodes.len() > 1 {
        return Err(NodeError::Arity { node, max: 1 });
    }
    *slot = nodes.into_iter().next();
    Ok(())
}
