//! Flag conditions and the continuation that consumes them.
//!
//! A comparison does not pick its consumer; it produces flags and hands the
//! continuation to the emitter. The continuation says whether the flags feed
//! a branch, materialize a boolean, guard a deoptimization exit, or guard a
//! trap, and it can be negated or commuted in place while the fuser walks
//! the graph.

use crate::ir::operators::{DeoptimizeParameters, TrapCode};
use crate::ir::{Block, Node};

/// Condition under which the flags "fire".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagsCondition {
    Equal,
    NotEqual,
    SignedLessThan,
    SignedGreaterThanOrEqual,
    SignedLessThanOrEqual,
    SignedGreaterThan,
    UnsignedLessThan,
    UnsignedGreaterThanOrEqual,
    UnsignedLessThanOrEqual,
    UnsignedGreaterThan,
    Overflow,
    NotOverflow,
    StackPointerGreaterThan,
}

impl FlagsCondition {
    /// The condition that holds exactly when `self` does not.
    pub fn negated(self) -> Self {
        use FlagsCondition::*;
        match self {
            Equal => NotEqual,
            NotEqual => Equal,
            SignedLessThan => SignedGreaterThanOrEqual,
            SignedGreaterThanOrEqual => SignedLessThan,
            SignedLessThanOrEqual => SignedGreaterThan,
            SignedGreaterThan => SignedLessThanOrEqual,
            UnsignedLessThan => UnsignedGreaterThanOrEqual,
            UnsignedGreaterThanOrEqual => UnsignedLessThan,
            UnsignedLessThanOrEqual => UnsignedGreaterThan,
            UnsignedGreaterThan => UnsignedLessThanOrEqual,
            Overflow => NotOverflow,
            NotOverflow => Overflow,
            StackPointerGreaterThan => {
                unreachable!("stack pointer comparison has no negated form")
            }
        }
    }

    /// The condition after swapping the comparison's operands.
    pub fn commuted(self) -> Self {
        use FlagsCondition::*;
        match self {
            Equal | NotEqual | Overflow | NotOverflow => self,
            SignedLessThan => SignedGreaterThan,
            SignedGreaterThanOrEqual => SignedLessThanOrEqual,
            SignedLessThanOrEqual => SignedGreaterThanOrEqual,
            SignedGreaterThan => SignedLessThan,
            UnsignedLessThan => UnsignedGreaterThan,
            UnsignedGreaterThanOrEqual => UnsignedLessThanOrEqual,
            UnsignedLessThanOrEqual => UnsignedGreaterThanOrEqual,
            UnsignedGreaterThan => UnsignedLessThan,
            StackPointerGreaterThan => {
                unreachable!("stack pointer comparison has no commuted form")
            }
        }
    }
}

/// Deferred consumer of a comparison's flags.
#[derive(Clone, Debug, PartialEq)]
pub enum FlagsContinuation {
    /// The instruction produces a plain value; no flags are consumed.
    None,
    /// Materialize 0/1 into `result`'s register.
    Set {
        condition: FlagsCondition,
        result: Node,
    },
    /// Branch to `true_block` when the condition holds, else `false_block`.
    Branch {
        condition: FlagsCondition,
        true_block: Block,
        false_block: Block,
    },
    /// Take a deoptimization exit when the condition holds.
    Deoptimize {
        condition: FlagsCondition,
        params: DeoptimizeParameters,
    },
    /// Trap when the condition holds.
    Trap {
        condition: FlagsCondition,
        trap: TrapCode,
    },
}

impl FlagsContinuation {
    pub fn for_set(condition: FlagsCondition, result: Node) -> Self {
        FlagsContinuation::Set { condition, result }
    }

    pub fn for_branch(condition: FlagsCondition, true_block: Block, false_block: Block) -> Self {
        FlagsContinuation::Branch {
            condition,
            true_block,
            false_block,
        }
    }

    pub fn for_deoptimize(condition: FlagsCondition, params: DeoptimizeParameters) -> Self {
        FlagsContinuation::Deoptimize { condition, params }
    }

    pub fn for_trap(condition: FlagsCondition, trap: TrapCode) -> Self {
        FlagsContinuation::Trap { condition, trap }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FlagsContinuation::None)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, FlagsContinuation::Set { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, FlagsContinuation::Branch { .. })
    }

    pub fn is_deoptimize(&self) -> bool {
        matches!(self, FlagsContinuation::Deoptimize { .. })
    }

    pub fn is_trap(&self) -> bool {
        matches!(self, FlagsContinuation::Trap { .. })
    }

    /// The condition, for continuations that carry one.
    pub fn condition(&self) -> FlagsCondition {
        match self {
            FlagsContinuation::Set { condition, .. }
            | FlagsContinuation::Branch { condition, .. }
            | FlagsContinuation::Deoptimize { condition, .. }
            | FlagsContinuation::Trap { condition, .. } => *condition,
            FlagsContinuation::None => unreachable!("continuation carries no condition"),
        }
    }

    fn condition_mut(&mut self) -> &mut FlagsCondition {
        match self {
            FlagsContinuation::Set { condition, .. }
            | FlagsContinuation::Branch { condition, .. }
            | FlagsContinuation::Deoptimize { condition, .. }
            | FlagsContinuation::Trap { condition, .. } => condition,
            FlagsContinuation::None => unreachable!("continuation carries no condition"),
        }
    }

    /// Invert the polarity of the continuation in place.
    pub fn negate(&mut self) {
        let c = self.condition_mut();
        *c = c.negated();
    }

    /// Account for the comparison's operands having been swapped.
    pub fn commute(&mut self) {
        let c = self.condition_mut();
        *c = c.commuted();
    }

    /// Replace the condition with `condition`, preserving an outer inversion:
    /// if the continuation was folded through an odd number of `== 0` tests
    /// its condition reads `Equal`, and the new condition is negated to
    /// match.
    pub fn overwrite_and_negate_if_equal(&mut self, condition: FlagsCondition) {
        let negate = self.condition() == FlagsCondition::Equal;
        *self.condition_mut() = condition;
        if negate {
            self.negate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn negate_is_an_involution() {
        use FlagsCondition::*;
        for c in [
            Equal,
            NotEqual,
            SignedLessThan,
            SignedGreaterThanOrEqual,
            SignedLessThanOrEqual,
            SignedGreaterThan,
            UnsignedLessThan,
            UnsignedGreaterThanOrEqual,
            UnsignedLessThanOrEqual,
            UnsignedGreaterThan,
            Overflow,
            NotOverflow,
        ] {
            assert_eq!(c.negated().negated(), c);
        }
    }

    #[test]
    fn continuation_negate_negate_is_identity() {
        let node = Node::new(0);
        let mut cont = FlagsContinuation::for_set(FlagsCondition::UnsignedLessThan, node);
        let orig = cont.clone();
        cont.negate();
        assert_ne!(cont, orig);
        cont.negate();
        assert_eq!(cont, orig);
    }

    #[test]
    fn commute_swaps_strictness_sides() {
        use FlagsCondition::*;
        assert_eq!(SignedLessThan.commuted(), SignedGreaterThan);
        assert_eq!(UnsignedLessThanOrEqual.commuted(), UnsignedGreaterThanOrEqual);
        assert_eq!(Equal.commuted(), Equal);
        assert_eq!(Overflow.commuted(), Overflow);
    }

    #[test]
    fn overwrite_preserves_outer_inversion() {
        let node = Node::new(0);
        // An even number of `== 0` folds leaves the condition at NotEqual;
        // the overwrite installs the new condition unchanged.
        let mut cont = FlagsContinuation::for_set(FlagsCondition::NotEqual, node);
        cont.overwrite_and_negate_if_equal(FlagsCondition::SignedLessThan);
        assert_eq!(cont.condition(), FlagsCondition::SignedLessThan);

        // An odd number leaves Equal; the overwrite negates.
        let mut cont = FlagsContinuation::for_set(FlagsCondition::Equal, node);
        cont.overwrite_and_negate_if_equal(FlagsCondition::SignedLessThan);
        assert_eq!(cont.condition(), FlagsCondition::SignedGreaterThanOrEqual);
    }
}
