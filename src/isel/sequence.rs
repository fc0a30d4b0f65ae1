//! The emitted instruction stream and its constant pool.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::ir::operators::MachineRepresentation;
use crate::ir::Block;
use crate::isa::riscv32::opcodes::InstructionCode;
use crate::isel::flags::FlagsContinuation;
use crate::isel::operands::{ImmIndex, InstructionOperand, VirtualReg};

/// A constant pool entry.
///
/// Floating-point values are stored by bit pattern so entries are comparable
/// and the pool can deduplicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Int32(i32),
    Int64(i64),
    Float32(u32),
    Float64(u64),
    /// A branch target, for jump tables and binary-search dispatch.
    Label(Block),
}

impl Constant {
    pub fn from_f32(value: f32) -> Self {
        Constant::Float32(value.to_bits())
    }

    pub fn from_f64(value: f64) -> Self {
        Constant::Float64(value.to_bits())
    }
}

/// One emitted instruction, still in virtual-register form.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    code: InstructionCode,
    outputs: SmallVec<[InstructionOperand; 2]>,
    inputs: SmallVec<[InstructionOperand; 8]>,
    temps: SmallVec<[InstructionOperand; 4]>,
    flags: FlagsContinuation,
    is_call: bool,
}

impl Instruction {
    pub(crate) fn new(
        code: InstructionCode,
        outputs: SmallVec<[InstructionOperand; 2]>,
        inputs: SmallVec<[InstructionOperand; 8]>,
        temps: SmallVec<[InstructionOperand; 4]>,
        flags: FlagsContinuation,
    ) -> Self {
        Self {
            code,
            outputs,
            inputs,
            temps,
            flags,
            is_call: false,
        }
    }

    pub fn code(&self) -> InstructionCode {
        self.code
    }

    pub fn outputs(&self) -> &[InstructionOperand] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[InstructionOperand] {
        &self.inputs
    }

    pub fn temps(&self) -> &[InstructionOperand] {
        &self.temps
    }

    pub fn output(&self, index: usize) -> InstructionOperand {
        self.outputs[index]
    }

    pub fn input(&self, index: usize) -> InstructionOperand {
        self.inputs[index]
    }

    pub fn flags(&self) -> &FlagsContinuation {
        &self.flags
    }

    pub fn is_call(&self) -> bool {
        self.is_call
    }

    /// Mark this instruction as clobbering caller-saved registers.
    pub fn mark_as_call(&mut self) -> &mut Self {
        self.is_call = true;
        self
    }
}

/// The append-only output of the selection pass, plus the bookkeeping the
/// register allocator reads: the constant pool, constant-valued virtual
/// registers, and representation hints.
#[derive(Default)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
    constants: PrimaryMap<ImmIndex, Constant>,
    constant_index: HashMap<Constant, ImmIndex>,
    next_vreg: u32,
    /// Virtual registers whose value is a rematerializable constant.
    constant_vregs: HashMap<VirtualReg, Constant>,
    /// Representation overrides (float results read back from the stack).
    representations: HashMap<VirtualReg, MachineRepresentation>,
}

impl InstructionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, inst: Instruction) -> &mut Instruction {
        self.instructions.push(inst);
        self.instructions.last_mut().unwrap()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Intern `constant`, returning its pool index.
    pub fn add_immediate(&mut self, constant: Constant) -> ImmIndex {
        if let Some(&index) = self.constant_index.get(&constant) {
            return index;
        }
        let index = self.constants.push(constant);
        self.constant_index.insert(constant, index);
        index
    }

    pub fn constant(&self, index: ImmIndex) -> Constant {
        self.constants[index]
    }

    /// The constant pool, in index order.
    pub fn constants(&self) -> impl Iterator<Item = Constant> + '_ {
        self.constants.values().copied()
    }

    pub fn next_virtual_register(&mut self) -> VirtualReg {
        let vreg = VirtualReg::from_u32(self.next_vreg);
        self.next_vreg += 1;
        vreg
    }

    pub fn virtual_register_count(&self) -> u32 {
        self.next_vreg
    }

    /// Record that `vreg` holds `constant`, so the allocator may
    /// rematerialize instead of spilling.
    pub fn register_constant(&mut self, vreg: VirtualReg, constant: Constant) {
        self.constant_vregs.insert(vreg, constant);
    }

    pub fn constant_of(&self, vreg: VirtualReg) -> Option<Constant> {
        self.constant_vregs.get(&vreg).copied()
    }

    pub fn set_representation(&mut self, vreg: VirtualReg, rep: MachineRepresentation) {
        self.representations.insert(vreg, rep);
    }

    pub fn representation_of(&self, vreg: VirtualReg) -> Option<MachineRepresentation> {
        self.representations.get(&vreg).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_pool_deduplicates() {
        let mut seq = InstructionSequence::new();
        let a = seq.add_immediate(Constant::Int32(42));
        let b = seq.add_immediate(Constant::Int32(42));
        let c = seq.add_immediate(Constant::Int32(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(seq.constant(c), Constant::Int32(43));
    }

    #[test]
    fn float_constants_compare_by_bits() {
        let mut seq = InstructionSequence::new();
        let pos = seq.add_immediate(Constant::from_f64(0.0));
        let neg = seq.add_immediate(Constant::from_f64(-0.0));
        assert_ne!(pos, neg);
    }
}
