//! The mid-level IR consumed by instruction selection.
//!
//! Nodes form an SSA-like dataflow graph: each node has an operator kind
//! (with inline parameters), an ordered input list, and zero or more
//! projections for secondary outputs. The graph is built by earlier phases;
//! this pass only reads it. Use lists are maintained so the selector can
//! decide whether a node is covered by its sole consumer.

pub mod matchers;
pub mod operators;

pub use operators::Operator;

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

/// An opaque reference to a node in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node, "n");

/// An opaque reference to a basic block, as assigned by the scheduler.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

#[derive(Clone)]
struct NodeData {
    op: Operator,
    inputs: SmallVec<[Node; 2]>,
}

/// The dataflow graph of one function.
#[derive(Clone, Default)]
pub struct Graph {
    nodes: PrimaryMap<Node, NodeData>,
    uses: SecondaryMap<Node, SmallVec<[Node; 4]>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Inputs must already exist; the new node is recorded as
    /// a use of each of them.
    pub fn add(&mut self, op: Operator, inputs: &[Node]) -> Node {
        let node = self.nodes.push(NodeData {
            op,
            inputs: SmallVec::from_slice(inputs),
        });
        for &input in inputs {
            self.uses[input].push(node);
        }
        node
    }

    pub fn op(&self, node: Node) -> &Operator {
        &self.nodes[node].op
    }

    pub fn input(&self, node: Node, index: usize) -> Node {
        self.nodes[node].inputs[index]
    }

    pub fn inputs(&self, node: Node) -> &[Node] {
        &self.nodes[node].inputs
    }

    pub fn input_count(&self, node: Node) -> usize {
        self.nodes[node].inputs.len()
    }

    /// All nodes that list `node` among their inputs.
    pub fn uses(&self, node: Node) -> &[Node] {
        &self.uses[node]
    }

    pub fn use_count(&self, node: Node) -> usize {
        self.uses[node].len()
    }

    /// Find the user of `node` that projects secondary output `index`, if
    /// any.
    pub fn find_projection(&self, node: Node, index: u32) -> Option<Node> {
        self.uses(node)
            .iter()
            .copied()
            .find(|&user| matches!(*self.op(user), Operator::Projection(i) if i == index))
    }

    /// All nodes, in creation (scheduling) order.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::operators::Operator;

    #[test]
    fn uses_and_projections() {
        let mut g = Graph::new();
        let a = g.add(Operator::Parameter(0), &[]);
        let b = g.add(Operator::Parameter(1), &[]);
        let add = g.add(Operator::Int32AddWithOverflow, &[a, b]);
        let p0 = g.add(Operator::Projection(0), &[add]);
        let p1 = g.add(Operator::Projection(1), &[add]);

        assert_eq!(g.use_count(a), 1);
        assert_eq!(g.uses(add), &[p0, p1]);
        assert_eq!(g.find_projection(add, 0), Some(p0));
        assert_eq!(g.find_projection(add, 1), Some(p1));
        assert_eq!(g.find_projection(add, 2), None);
    }
}
