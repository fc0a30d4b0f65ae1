//! Thin views over nodes used by the selection rules.
//!
//! A matcher does not own or copy anything; it just fixes the left/right
//! decomposition of a binary node and exposes constant-valued helpers.

use crate::ir::{Graph, Node, Operator};

/// Integer constant payload of `node`, if it is one.
pub fn int32_constant(graph: &Graph, node: Node) -> Option<i32> {
    match *graph.op(node) {
        Operator::Int32Constant(v) => Some(v),
        _ => None,
    }
}

/// Like [`int32_constant`], widened; also accepts 64-bit constants.
pub fn int_constant(graph: &Graph, node: Node) -> Option<i64> {
    match *graph.op(node) {
        Operator::Int32Constant(v) => Some(i64::from(v)),
        Operator::Int64Constant(v) => Some(v),
        _ => None,
    }
}

/// Whether `node` is a floating-point constant whose bit pattern is zero
/// (positive zero of either width).
pub fn float_constant_is_bit_zero(graph: &Graph, node: Node) -> bool {
    match *graph.op(node) {
        Operator::Float32Constant(v) => v.to_bits() == 0,
        Operator::Float64Constant(v) => v.to_bits() == 0,
        _ => false,
    }
}

/// Whether `node` is a floating-point constant comparing equal to zero
/// (this includes negative zero, unlike the bit-pattern check).
pub fn float_constant_is_zero(graph: &Graph, node: Node) -> bool {
    match *graph.op(node) {
        Operator::Float32Constant(v) => v == 0.0,
        Operator::Float64Constant(v) => v == 0.0,
        _ => false,
    }
}

/// A view over a binary operation, fixing which input is "left" and which is
/// "right".
pub struct BinopMatcher<'g> {
    graph: &'g Graph,
    left: Node,
    right: Node,
}

impl<'g> BinopMatcher<'g> {
    pub fn new(graph: &'g Graph, node: Node) -> Self {
        Self {
            graph,
            left: graph.input(node, 0),
            right: graph.input(node, 1),
        }
    }

    /// Like [`BinopMatcher::new`], but puts a constant left input on the
    /// right when the right input is not a constant. Used by comparison
    /// normalization, where the caller commutes the condition to match.
    pub fn with_swapped_constant(graph: &'g Graph, node: Node) -> Self {
        let mut m = Self::new(graph, node);
        if int_constant(graph, m.left).is_some() && int_constant(graph, m.right).is_none() {
            core::mem::swap(&mut m.left, &mut m.right);
        }
        m
    }

    pub fn left(&self) -> Node {
        self.left
    }

    pub fn right(&self) -> Node {
        self.right
    }

    pub fn left_value(&self) -> Option<i32> {
        int32_constant(self.graph, self.left)
    }

    pub fn right_value(&self) -> Option<i32> {
        int32_constant(self.graph, self.right)
    }

    pub fn right_is(&self, value: i32) -> bool {
        self.right_value() == Some(value)
    }

    pub fn right_in_range(&self, low: i32, high: i32) -> bool {
        matches!(self.right_value(), Some(v) if v >= low && v <= high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_constant_moves_left_constant_right() {
        let mut g = Graph::new();
        let c = g.add(Operator::Int32Constant(7), &[]);
        let p = g.add(Operator::Parameter(0), &[]);
        let cmp = g.add(Operator::Int32LessThan, &[c, p]);

        let m = BinopMatcher::new(&g, cmp);
        assert_eq!(m.left(), c);

        let m = BinopMatcher::with_swapped_constant(&g, cmp);
        assert_eq!(m.left(), p);
        assert_eq!(m.right_value(), Some(7));
    }
}
