//! Lowering rules for RISC-V 32: one selection rule per mid-IR operator.
//!
//! The dispatcher is a single closed match over the operator vocabulary.
//! Rules fold a neighbouring node only behind `can_cover`; the immediate
//! forms are chosen through the per-opcode range table in
//! [`super::opcodes::immediate_fits`].

use smallvec::SmallVec;

use crate::ir::matchers::{self, BinopMatcher};
use crate::ir::operators::{
    CallDescriptor, CallKind, LinkageLocation, LoadRepresentation, MachineRepresentation,
    MachineType, Operator, RecordWriteMode, StackCheckKind, StoreRepresentation, SwitchInfo,
    TruncateKind, WriteBarrierKind,
};
use crate::ir::Node;
use crate::isa::riscv32::opcodes::{
    immediate_fits, AddressingMode, ArchOpcode, AtomicWidth, InstructionCode,
};
use crate::isa::riscv32::regs::{a0, a1, a2, fa0, fa1, t0};
use crate::isel::{
    Constant, FlagsCondition, FlagsContinuation, InstructionOperand, InstructionSelector,
};
use crate::{trace, unsupported, CodegenError, CodegenResult};

/// An argument or result value paired with where the linkage puts it.
#[derive(Clone, Copy)]
pub(crate) struct PushParameter {
    pub node: Option<Node>,
    pub location: LinkageLocation,
}

const POINTER_SIZE_LOG2: u32 = 2;
/// Slots reserved at the bottom of a C frame's argument area.
const C_ARG_SLOT_COUNT: i32 = 0;

impl InstructionSelector<'_> {
    // Target-specific operand construction -----------------------------------

    pub(crate) fn can_be_immediate(&self, node: Node, code: InstructionCode) -> bool {
        match matchers::int_constant(self.graph, node) {
            Some(value) => immediate_fits(code, value),
            None => false,
        }
    }

    /// An immediate if `node` is a constant fitting `code`'s immediate
    /// field, otherwise a register.
    pub(crate) fn use_operand(&mut self, node: Node, code: InstructionCode) -> InstructionOperand {
        if self.can_be_immediate(node, code) {
            self.use_immediate(node)
        } else {
            self.use_register(node)
        }
    }

    /// Use the zero register if the node is the zero constant (integer zero
    /// or a zero float bit pattern), otherwise assign a register.
    pub(crate) fn use_register_or_immediate_zero(&mut self, node: Node) -> InstructionOperand {
        if matchers::int_constant(self.graph, node) == Some(0)
            || matchers::float_constant_is_bit_zero(self.graph, node)
        {
            self.use_immediate(node)
        } else {
            self.use_register(node)
        }
    }

    // Shape helpers ----------------------------------------------------------

    pub(crate) fn visit_rr(&mut self, opcode: ArchOpcode, node: Node) {
        let dst = self.define_as_register(node);
        let src = self.use_register(self.graph.input(node, 0));
        self.emit(opcode, &[dst], &[src], &[]);
    }

    pub(crate) fn visit_rri(&mut self, opcode: ArchOpcode, node: Node, imm: i32) {
        let dst = self.define_as_register(node);
        let src = self.use_register(self.graph.input(node, 0));
        let imm = self.temp_immediate(imm);
        self.emit(opcode, &[dst], &[src, imm], &[]);
    }

    pub(crate) fn visit_rrir(&mut self, opcode: ArchOpcode, node: Node, imm: i32) {
        let dst = self.define_as_register(node);
        let a = self.use_register(self.graph.input(node, 0));
        let imm = self.temp_immediate(imm);
        let b = self.use_register(self.graph.input(node, 1));
        self.emit(opcode, &[dst], &[a, imm, b], &[]);
    }

    pub(crate) fn visit_rrr(&mut self, opcode: ArchOpcode, node: Node) {
        let dst = self.define_as_register(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_register(self.graph.input(node, 1));
        self.emit(opcode, &[dst], &[a, b], &[]);
    }

    pub(crate) fn visit_unique_rrr(&mut self, opcode: ArchOpcode, node: Node) {
        let dst = self.define_as_register(node);
        let a = self.use_unique_register(self.graph.input(node, 0));
        let b = self.use_unique_register(self.graph.input(node, 1));
        self.emit(opcode, &[dst], &[a, b], &[]);
    }

    pub(crate) fn visit_rrrr(&mut self, opcode: ArchOpcode, node: Node) {
        let dst = self.define_same_as_first(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_register(self.graph.input(node, 1));
        let c = self.use_register(self.graph.input(node, 2));
        self.emit(opcode, &[dst], &[a, b, c], &[]);
    }

    pub(crate) fn visit_rro(&mut self, opcode: ArchOpcode, node: Node) {
        let code = InstructionCode::new(opcode);
        let dst = self.define_as_register(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_operand(self.graph.input(node, 1), code);
        self.emit(code, &[dst], &[a, b], &[]);
    }

    // Binops -----------------------------------------------------------------

    fn visit_binop_with_cont(
        &mut self,
        node: Node,
        opcode: ArchOpcode,
        has_reverse_opcode: bool,
        reverse_opcode: ArchOpcode,
        cont: FlagsContinuation,
    ) {
        let m = BinopMatcher::new(self.graph, node);
        let code = InstructionCode::new(opcode);
        let reverse_code = InstructionCode::new(reverse_opcode);
        let mut inputs: SmallVec<[InstructionOperand; 2]> = SmallVec::new();
        let code = if self.can_be_immediate(m.right(), code) {
            inputs.push(self.use_register_or_immediate_zero(m.left()));
            inputs.push(self.use_immediate(m.right()));
            code
        } else if has_reverse_opcode && self.can_be_immediate(m.left(), reverse_code) {
            inputs.push(self.use_register_or_immediate_zero(m.right()));
            inputs.push(self.use_immediate(m.left()));
            reverse_code
        } else {
            let a = self.use_register(m.left());
            let b = self.use_operand(m.right(), code);
            inputs.push(a);
            inputs.push(b);
            code
        };

        // A deoptimizing user keeps its inputs live past the instruction, so
        // the result must not clobber the first input's register.
        let output = if cont.is_deoptimize() {
            self.define_same_as_first(node)
        } else {
            self.define_as_register(node)
        };

        self.emit_with_continuation(code, &[output], &inputs, &[], cont);
    }

    fn visit_binop(
        &mut self,
        node: Node,
        opcode: ArchOpcode,
        has_reverse_opcode: bool,
        reverse_opcode: ArchOpcode,
    ) {
        self.visit_binop_with_cont(
            node,
            opcode,
            has_reverse_opcode,
            reverse_opcode,
            FlagsContinuation::None,
        );
    }

    // Bitwise and shift rewrites ---------------------------------------------

    fn visit_word32_xor(&mut self, node: Node) {
        let m = BinopMatcher::with_swapped_constant(self.graph, node);
        if matches!(self.graph.op(m.left()), Operator::Word32Or)
            && self.can_cover(node, m.left())
            && m.right_is(-1)
        {
            let mleft = BinopMatcher::with_swapped_constant(self.graph, m.left());
            if mleft.right_value().is_none() {
                let dst = self.define_as_register(node);
                let a = self.use_register(mleft.left());
                let b = self.use_register(mleft.right());
                self.emit(ArchOpcode::Nor, &[dst], &[a, b], &[]);
                return;
            }
        }
        if m.right_is(-1) {
            // Use Nor for bit negation and eliminate loading the all-ones
            // constant.
            let dst = self.define_as_register(node);
            let a = self.use_register(m.left());
            let zero = self.temp_immediate(0);
            self.emit(ArchOpcode::Nor, &[dst], &[a, zero], &[]);
            return;
        }
        self.visit_binop(node, ArchOpcode::Xor, true, ArchOpcode::Xor);
    }

    fn visit_word32_shl(&mut self, node: Node) {
        let m = BinopMatcher::new(self.graph, node);
        if matches!(self.graph.op(m.left()), Operator::Word32And)
            && self.can_cover(node, m.left())
            && m.right_in_range(1, 31)
        {
            let mleft = BinopMatcher::with_swapped_constant(self.graph, m.left());
            // Match Shl(And(x, mask), imm) where the mask is a contiguous
            // run rooted at bit 0 and the shift pushes it off the top.
            if let Some(mask) = mleft.right_value() {
                let mask = mask as u32;
                let mask_width = mask.count_ones();
                let mask_msb = mask.leading_zeros();
                if mask_width != 0 && mask_msb + mask_width == 32 {
                    let shift = m.right_value().unwrap() as u32;
                    debug_assert_eq!(0, mask.trailing_zeros());
                    debug_assert_ne!(0, shift);
                    if shift + mask_width >= 32 {
                        // The mask reaches or extends beyond the top bit once
                        // shifted; only the shift is needed.
                        let dst = self.define_as_register(node);
                        let src = self.use_register(mleft.left());
                        let imm = self.use_immediate(m.right());
                        self.emit(ArchOpcode::Shl32, &[dst], &[src, imm], &[]);
                        return;
                    }
                }
            }
        }
        self.visit_rro(ArchOpcode::Shl32, node);
    }

    fn visit_word32_sar(&mut self, node: Node) {
        let m = BinopMatcher::new(self.graph, node);
        if matches!(self.graph.op(m.left()), Operator::Word32Shl) && self.can_cover(node, m.left())
        {
            let mleft = BinopMatcher::new(self.graph, m.left());
            if let (Some(sar), Some(shl)) = (m.right_value(), mleft.right_value()) {
                if sar == shl && sar == 16 {
                    self.visit_rr_with_input(ArchOpcode::SignExtendShort, node, mleft.left());
                    return;
                } else if sar == shl && sar == 24 {
                    self.visit_rr_with_input(ArchOpcode::SignExtendByte, node, mleft.left());
                    return;
                } else if sar == shl && sar == 32 {
                    let dst = self.define_as_register(node);
                    let src = self.use_register(mleft.left());
                    let zero = self.temp_immediate(0);
                    self.emit(ArchOpcode::Shl32, &[dst], &[src, zero], &[]);
                    return;
                }
            }
        }
        self.visit_rro(ArchOpcode::Sar32, node);
    }

    fn visit_rr_with_input(&mut self, opcode: ArchOpcode, node: Node, input: Node) {
        let dst = self.define_as_register(node);
        let src = self.use_register(input);
        self.emit(opcode, &[dst], &[src], &[]);
    }

    fn visit_int32_mul(&mut self, node: Node) {
        let m = BinopMatcher::with_swapped_constant(self.graph, node);
        if let Some(value) = m.right_value() {
            if value > 0 {
                let value = value as u32;
                if value.is_power_of_two() {
                    let dst = self.define_as_register(node);
                    let src = self.use_register(m.left());
                    let shift = self.temp_immediate(value.trailing_zeros() as i32);
                    self.emit(ArchOpcode::Shl32, &[dst], &[src, shift], &[]);
                    return;
                }
                if (value + 1).is_power_of_two() {
                    let temp = self.temp_register();
                    let src = self.use_register(m.left());
                    let shift = self.temp_immediate((value + 1).trailing_zeros() as i32);
                    self.emit(ArchOpcode::Shl32, &[temp], &[src, shift], &[]);
                    let dst = self.define_as_register(node);
                    let src = self.use_register(m.left());
                    self.emit(ArchOpcode::Sub, &[dst], &[temp, src], &[]);
                    return;
                }
            }
        }
        self.visit_rrr(ArchOpcode::Mul32, node);
    }

    fn visit_div_mod(&mut self, node: Node, opcode: ArchOpcode, same_as_first: bool) {
        let m = BinopMatcher::new(self.graph, node);
        let dst = if same_as_first {
            self.define_same_as_first(node)
        } else {
            self.define_as_register(node)
        };
        let a = self.use_register(m.left());
        let b = self.use_register(m.right());
        self.emit(opcode, &[dst], &[a, b], &[]);
    }

    // Memory -----------------------------------------------------------------

    fn load_opcode(&self, rep: LoadRepresentation) -> CodegenResult<ArchOpcode> {
        Ok(match rep.rep {
            MachineRepresentation::Float32 => ArchOpcode::LoadFloat,
            MachineRepresentation::Float64 => ArchOpcode::LoadDouble,
            MachineRepresentation::Bit | MachineRepresentation::Word8 => {
                if rep.is_unsigned() {
                    ArchOpcode::Lbu
                } else {
                    ArchOpcode::Lb
                }
            }
            MachineRepresentation::Word16 => {
                if rep.is_unsigned() {
                    ArchOpcode::Lhu
                } else {
                    ArchOpcode::Lh
                }
            }
            MachineRepresentation::TaggedSigned
            | MachineRepresentation::TaggedPointer
            | MachineRepresentation::Tagged
            | MachineRepresentation::Word32 => ArchOpcode::Lw,
            MachineRepresentation::Simd128 => ArchOpcode::RvvLd,
            rep => {
                return Err(CodegenError::UnsupportedRepresentation(format!(
                    "{rep:?} load"
                )))
            }
        })
    }

    fn store_opcode(&self, rep: MachineRepresentation) -> CodegenResult<ArchOpcode> {
        Ok(match rep {
            MachineRepresentation::Float32 => ArchOpcode::StoreFloat,
            MachineRepresentation::Float64 => ArchOpcode::StoreDouble,
            MachineRepresentation::Bit | MachineRepresentation::Word8 => ArchOpcode::Sb,
            MachineRepresentation::Word16 => ArchOpcode::Sh,
            MachineRepresentation::TaggedSigned
            | MachineRepresentation::TaggedPointer
            | MachineRepresentation::Tagged
            | MachineRepresentation::Word32 => ArchOpcode::Sw,
            MachineRepresentation::Simd128 => ArchOpcode::RvvSt,
            rep => {
                return Err(CodegenError::UnsupportedRepresentation(format!(
                    "{rep:?} store"
                )))
            }
        })
    }

    /// Pick the addressing mode for a load and emit it: root-relative when
    /// the base is a resolved external reference, base+immediate when the
    /// index fits, otherwise materialize the address into a scratch.
    pub(crate) fn emit_load(&mut self, node: Node, code: InstructionCode) {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);

        if let Operator::ExternalConstant(reference) = *self.graph.op(base) {
            if let (Some(index_value), Some(root_offset)) = (
                matchers::int_constant(self.graph, index),
                self.root_register_offset(reference),
            ) {
                let delta = index_value + i64::from(root_offset);
                // The combined delta is limited by the immediate operand.
                if let Ok(delta) = i32::try_from(delta) {
                    trace!("emit_load: {} root-relative, delta {}", node, delta);
                    let dst = self.define_as_register(node);
                    let imm = self.temp_immediate(delta);
                    self.emit(
                        code.with_addressing_mode(AddressingMode::RootImm),
                        &[dst],
                        &[imm],
                        &[],
                    );
                    return;
                }
            }
        }

        if self.can_be_immediate(index, code) {
            let dst = self.define_as_register(node);
            let base = self.use_register(base);
            let imm = self.use_immediate(index);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[dst],
                &[base, imm],
                &[],
            );
        } else {
            let addr = self.temp_register();
            let index = self.use_register(index);
            let base = self.use_register(base);
            self.emit(ArchOpcode::Add, &[addr], &[index, base], &[]);
            // Emit the desired load opcode, using the temp address.
            let dst = self.define_as_register(node);
            let zero = self.temp_immediate(0);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[dst],
                &[addr, zero],
                &[],
            );
        }
    }

    fn visit_store(&mut self, node: Node, rep: StoreRepresentation) -> CodegenResult<()> {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let value = self.graph.input(node, 2);
        let barrier = rep.write_barrier_kind;

        if barrier != WriteBarrierKind::NoWriteBarrier && !self.flags().disable_write_barriers() {
            debug_assert!(rep.rep.can_be_tagged_pointer());
            let inputs = [
                self.use_unique_register(base),
                self.use_unique_register(index),
                self.use_unique_register(value),
            ];
            let temps = [self.temp_register(), self.temp_register()];
            let mode = RecordWriteMode::from_write_barrier_kind(barrier);
            let code = InstructionCode::new(ArchOpcode::ArchStoreWithWriteBarrier)
                .with_misc(mode.encode());
            self.emit(code, &[], &inputs, &temps);
            return Ok(());
        }

        let code = InstructionCode::new(self.store_opcode(rep.rep)?);
        self.emit_store_operands(code, base, index, value);
        Ok(())
    }

    fn emit_store_operands(
        &mut self,
        code: InstructionCode,
        base: Node,
        index: Node,
        value: Node,
    ) {
        if self.can_be_immediate(index, code) {
            let b = self.use_register(base);
            let i = self.use_immediate(index);
            let v = self.use_register_or_immediate_zero(value);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[],
                &[b, i, v],
                &[],
            );
        } else {
            let addr = self.temp_register();
            let i = self.use_register(index);
            let b = self.use_register(base);
            self.emit(ArchOpcode::Add, &[addr], &[i, b], &[]);
            let zero = self.temp_immediate(0);
            let v = self.use_register_or_immediate_zero(value);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[],
                &[addr, zero, v],
                &[],
            );
        }
    }

    fn visit_unaligned_load(&mut self, node: Node, rep: LoadRepresentation) -> CodegenResult<()> {
        let opcode = match rep.rep {
            MachineRepresentation::Float32 => ArchOpcode::ULoadFloat,
            MachineRepresentation::Float64 => ArchOpcode::ULoadDouble,
            MachineRepresentation::Word8 => {
                if rep.is_unsigned() {
                    ArchOpcode::Lbu
                } else {
                    ArchOpcode::Lb
                }
            }
            MachineRepresentation::Word16 => {
                if rep.is_unsigned() {
                    ArchOpcode::Ulhu
                } else {
                    ArchOpcode::Ulh
                }
            }
            MachineRepresentation::TaggedSigned
            | MachineRepresentation::TaggedPointer
            | MachineRepresentation::Tagged
            | MachineRepresentation::Word32 => ArchOpcode::Ulw,
            MachineRepresentation::Simd128 => ArchOpcode::RvvLd,
            rep => {
                return Err(CodegenError::UnsupportedRepresentation(format!(
                    "{rep:?} unaligned load"
                )))
            }
        };
        self.emit_load(node, InstructionCode::new(opcode));
        Ok(())
    }

    fn visit_unaligned_store(&mut self, node: Node, rep: MachineRepresentation) -> CodegenResult<()> {
        let opcode = match rep {
            MachineRepresentation::Float32 => ArchOpcode::UStoreFloat,
            MachineRepresentation::Float64 => ArchOpcode::UStoreDouble,
            MachineRepresentation::Word8 => ArchOpcode::Sb,
            MachineRepresentation::Word16 => ArchOpcode::Ush,
            MachineRepresentation::TaggedSigned
            | MachineRepresentation::TaggedPointer
            | MachineRepresentation::Tagged
            | MachineRepresentation::Word32 => ArchOpcode::Usw,
            MachineRepresentation::Simd128 => ArchOpcode::RvvSt,
            rep => {
                return Err(CodegenError::UnsupportedRepresentation(format!(
                    "{rep:?} unaligned store"
                )))
            }
        };
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let value = self.graph.input(node, 2);
        self.emit_store_operands(InstructionCode::new(opcode), base, index, value);
        Ok(())
    }

    fn visit_stack_slot(&mut self, node: Node, size: u32, alignment: u32) {
        let slot = self.frame_mut().allocate_spill_slot(size, alignment);
        let dst = self.define_as_register(node);
        let slot = self.temp_immediate(slot);
        let alignment = self.temp_immediate(alignment as i32);
        self.emit(ArchOpcode::ArchStackSlot, &[dst], &[slot, alignment], &[]);
    }

    // Compare and branch fusion ----------------------------------------------

    fn visit_compare(
        &mut self,
        code: InstructionCode,
        left: InstructionOperand,
        right: InstructionOperand,
        cont: &FlagsContinuation,
    ) {
        self.emit_with_continuation(code, &[], &[left, right], &[], cont.clone());
    }

    fn emit_word_compare_zero_operand(
        &mut self,
        value: InstructionOperand,
        cont: &FlagsContinuation,
    ) {
        self.emit_with_continuation(ArchOpcode::CmpZero, &[], &[value], &[], cont.clone());
    }

    fn emit_word_compare_zero(&mut self, value: Node, cont: &FlagsContinuation) {
        let value = self.use_register_or_immediate_zero(value);
        self.emit_word_compare_zero_operand(value, cont);
    }

    fn visit_float32_compare(&mut self, node: Node, cont: &FlagsContinuation) {
        let m = BinopMatcher::new(self.graph, node);
        let lhs = if matchers::float_constant_is_zero(self.graph, m.left()) {
            self.use_immediate(m.left())
        } else {
            self.use_register(m.left())
        };
        let rhs = if matchers::float_constant_is_zero(self.graph, m.right()) {
            self.use_immediate(m.right())
        } else {
            self.use_register(m.right())
        };
        self.visit_compare(InstructionCode::new(ArchOpcode::CmpS), lhs, rhs, cont);
    }

    fn visit_float64_compare(&mut self, node: Node, cont: &FlagsContinuation) {
        let m = BinopMatcher::new(self.graph, node);
        let lhs = if matchers::float_constant_is_zero(self.graph, m.left()) {
            self.use_immediate(m.left())
        } else {
            self.use_register(m.left())
        };
        let rhs = if matchers::float_constant_is_zero(self.graph, m.right()) {
            self.use_immediate(m.right())
        } else {
            self.use_register(m.right())
        };
        self.visit_compare(InstructionCode::new(ArchOpcode::CmpD), lhs, rhs, cont);
    }

    /// Normalize a word comparison's operands and emit it. A constant left
    /// operand moves right (commuting the condition); whether the right
    /// operand may stay an immediate then depends on the condition and on
    /// how the flags are consumed.
    fn visit_word_compare_with_opcode(
        &mut self,
        node: Node,
        opcode: ArchOpcode,
        cont: &mut FlagsContinuation,
    ) {
        let code = InstructionCode::new(opcode);
        let mut left = self.graph.input(node, 0);
        let mut right = self.graph.input(node, 1);
        // If one of the two inputs is an immediate, make sure it's on the
        // right.
        if !self.can_be_immediate(right, code) && self.can_be_immediate(left, code) {
            cont.commute();
            core::mem::swap(&mut left, &mut right);
        }

        if !self.can_be_immediate(right, code) {
            let l = self.use_register(left);
            let r = self.use_register(right);
            self.visit_compare(code, l, r, cont);
            return;
        }

        if opcode == ArchOpcode::Tst {
            let l = self.use_register(left);
            let r = self.use_immediate(right);
            self.visit_compare(code, l, r, cont);
            return;
        }

        let right_is_zero = matchers::int_constant(self.graph, right) == Some(0);
        match cont.condition() {
            FlagsCondition::Equal | FlagsCondition::NotEqual => {
                if cont.is_set() {
                    let l = self.use_register(left);
                    let r = self.use_immediate(right);
                    self.visit_compare(code, l, r, cont);
                } else if right_is_zero {
                    let l = self.use_register_or_immediate_zero(left);
                    self.emit_word_compare_zero_operand(l, cont);
                } else {
                    let l = self.use_register(left);
                    let r = self.use_register(right);
                    self.visit_compare(code, l, r, cont);
                }
            }
            FlagsCondition::SignedLessThan
            | FlagsCondition::SignedGreaterThanOrEqual
            | FlagsCondition::UnsignedLessThan
            | FlagsCondition::UnsignedGreaterThanOrEqual => {
                if right_is_zero {
                    let l = self.use_register_or_immediate_zero(left);
                    self.emit_word_compare_zero_operand(l, cont);
                } else {
                    let l = self.use_register(left);
                    let r = self.use_immediate(right);
                    self.visit_compare(code, l, r, cont);
                }
            }
            _ => {
                if right_is_zero {
                    let l = self.use_register_or_immediate_zero(left);
                    self.emit_word_compare_zero_operand(l, cont);
                } else {
                    let l = self.use_register(left);
                    let r = self.use_register(right);
                    self.visit_compare(code, l, r, cont);
                }
            }
        }
    }

    fn visit_word_compare(&mut self, node: Node, cont: &mut FlagsContinuation) {
        self.visit_word_compare_with_opcode(node, ArchOpcode::Cmp, cont);
    }

    /// Fuse a chain of zero-tests and the final flags producer into one
    /// instruction. `value` is the condition input of `user`.
    pub(crate) fn visit_word_compare_zero(
        &mut self,
        mut user: Node,
        mut value: Node,
        cont: &mut FlagsContinuation,
    ) {
        // Combine with comparisons against 0 by inverting the polarity.
        while self.can_cover(user, value) {
            let is_zero_test = match self.graph.op(value) {
                Operator::Word32Equal => {
                    BinopMatcher::with_swapped_constant(self.graph, value).right_is(0)
                }
                Operator::Word64Equal => {
                    let m = BinopMatcher::with_swapped_constant(self.graph, value);
                    matchers::int_constant(self.graph, m.right()) == Some(0)
                }
                _ => false,
            };
            if !is_zero_test {
                break;
            }
            user = value;
            value = BinopMatcher::with_swapped_constant(self.graph, value).left();
            cont.negate();
        }

        if self.can_cover(user, value) {
            match *self.graph.op(value) {
                Operator::Word32Equal => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::Equal);
                    return self.visit_word_compare(value, cont);
                }
                Operator::Int32LessThan => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::SignedLessThan);
                    return self.visit_word_compare(value, cont);
                }
                Operator::Int32LessThanOrEqual => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::SignedLessThanOrEqual);
                    return self.visit_word_compare(value, cont);
                }
                Operator::Uint32LessThan => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThan);
                    return self.visit_word_compare(value, cont);
                }
                Operator::Uint32LessThanOrEqual => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThanOrEqual);
                    return self.visit_word_compare(value, cont);
                }
                Operator::Float32Equal => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::Equal);
                    return self.visit_float32_compare(value, cont);
                }
                Operator::Float32LessThan => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThan);
                    return self.visit_float32_compare(value, cont);
                }
                Operator::Float32LessThanOrEqual => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThanOrEqual);
                    return self.visit_float32_compare(value, cont);
                }
                Operator::Float64Equal => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::Equal);
                    return self.visit_float64_compare(value, cont);
                }
                Operator::Float64LessThan => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThan);
                    return self.visit_float64_compare(value, cont);
                }
                Operator::Float64LessThanOrEqual => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::UnsignedLessThanOrEqual);
                    return self.visit_float64_compare(value, cont);
                }
                Operator::Projection(1) => {
                    // The overflow output of an <op>WithOverflow node. It can
                    // only be combined if the value output is unused or
                    // scheduled after this instruction.
                    let producer = self.graph.input(value, 0);
                    let result = self.graph.find_projection(producer, 0);
                    if result.is_none() || self.is_defined(result.unwrap()) {
                        match *self.graph.op(producer) {
                            Operator::Int32AddWithOverflow => {
                                cont.overwrite_and_negate_if_equal(FlagsCondition::Overflow);
                                return self.visit_binop_with_cont(
                                    producer,
                                    ArchOpcode::AddOvf,
                                    false,
                                    ArchOpcode::AddOvf,
                                    cont.clone(),
                                );
                            }
                            Operator::Int32SubWithOverflow => {
                                cont.overwrite_and_negate_if_equal(FlagsCondition::Overflow);
                                return self.visit_binop_with_cont(
                                    producer,
                                    ArchOpcode::SubOvf,
                                    false,
                                    ArchOpcode::SubOvf,
                                    cont.clone(),
                                );
                            }
                            Operator::Int32MulWithOverflow => {
                                cont.overwrite_and_negate_if_equal(FlagsCondition::Overflow);
                                return self.visit_binop_with_cont(
                                    producer,
                                    ArchOpcode::MulOvf32,
                                    false,
                                    ArchOpcode::MulOvf32,
                                    cont.clone(),
                                );
                            }
                            _ => {}
                        }
                    }
                }
                Operator::Word32And => {
                    return self.visit_word_compare_with_opcode(value, ArchOpcode::Tst, cont);
                }
                Operator::StackPointerGreaterThan(_) => {
                    cont.overwrite_and_negate_if_equal(FlagsCondition::StackPointerGreaterThan);
                    return self.visit_stack_pointer_greater_than(value, cont);
                }
                _ => {}
            }
        }

        // Continuation could not be combined with a compare, emit a compare
        // against 0.
        self.emit_word_compare_zero(value, cont);
    }

    fn visit_stack_pointer_greater_than(&mut self, node: Node, cont: &FlagsContinuation) {
        let Operator::StackPointerGreaterThan(kind) = *self.graph.op(node) else {
            unreachable!("stack check without kind");
        };
        let code = InstructionCode::new(ArchOpcode::ArchStackPointerGreaterThan)
            .with_misc(kind.encode());
        let value = self.graph.input(node, 0);

        // A function-entry check applies an offset to the limit and needs a
        // temp; the input must not alias it.
        if kind == StackCheckKind::JsFunctionEntry {
            let input = self.use_unique_register(value);
            let temp = self.temp_register();
            self.emit_with_continuation(code, &[], &[input], &[temp], cont.clone());
        } else {
            let input = self.use_register(value);
            self.emit_with_continuation(code, &[], &[input], &[], cont.clone());
        }
    }

    fn visit_word32_equal(&mut self, node: Node) {
        let mut cont = FlagsContinuation::for_set(FlagsCondition::Equal, node);
        let m = BinopMatcher::with_swapped_constant(self.graph, node);
        if m.right_is(0) {
            return self.visit_word_compare_zero(node, m.left(), &mut cont);
        }
        self.visit_word_compare(node, &mut cont);
    }

    fn visit_comparison_for_set(&mut self, node: Node, condition: FlagsCondition) {
        let mut cont = FlagsContinuation::for_set(condition, node);
        self.visit_word_compare(node, &mut cont);
    }

    // Switches ---------------------------------------------------------------

    fn visit_switch(&mut self, node: Node, sw: &SwitchInfo) {
        let value_operand = self.use_register(self.graph.input(node, 0));

        if self.flags().enable_jump_tables() {
            const MAX_TABLE_SWITCH_VALUE_RANGE: u64 = 2 << 16;
            let table_space_cost = 10 + 2 * sw.value_range();
            let table_time_cost: u64 = 3;
            let lookup_space_cost = 2 + 2 * sw.case_count() as u64;
            let lookup_time_cost = sw.case_count() as u64;
            if sw.case_count() > 0
                && table_space_cost + 3 * table_time_cost
                    <= lookup_space_cost + 3 * lookup_time_cost
                && sw.min_value > i32::MIN
                && sw.value_range() <= MAX_TABLE_SWITCH_VALUE_RANGE
            {
                let mut index_operand = value_operand;
                if sw.min_value != 0 {
                    // Rebase the value so the table starts at zero.
                    index_operand = self.temp_register();
                    let min = self.temp_immediate(sw.min_value);
                    self.emit(ArchOpcode::Sub, &[index_operand], &[value_operand, min], &[]);
                }
                return self.emit_table_switch(sw, index_operand);
            }
        }

        self.emit_binary_search_switch(sw, value_operand);
    }

    // Atomics ----------------------------------------------------------------

    fn visit_atomic_load(&mut self, node: Node, opcode: ArchOpcode, width: AtomicWidth) {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let code = InstructionCode::new(opcode).with_atomic_width(width);
        if self.can_be_immediate(index, code) {
            let dst = self.define_as_register(node);
            let b = self.use_register(base);
            let i = self.use_immediate(index);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[dst],
                &[b, i],
                &[],
            );
        } else {
            let addr = self.temp_register();
            let i = self.use_register(index);
            let b = self.use_register(base);
            self.emit(ArchOpcode::Add, &[addr], &[i, b], &[]);
            let dst = self.define_as_register(node);
            let zero = self.temp_immediate(0);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[dst],
                &[addr, zero],
                &[],
            );
        }
    }

    fn visit_atomic_store(&mut self, node: Node, opcode: ArchOpcode, width: AtomicWidth) {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let value = self.graph.input(node, 2);
        let code = InstructionCode::new(opcode).with_atomic_width(width);
        if self.can_be_immediate(index, code) {
            let b = self.use_register(base);
            let i = self.use_immediate(index);
            let v = self.use_register_or_immediate_zero(value);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[],
                &[b, i, v],
                &[],
            );
        } else {
            let addr = self.temp_register();
            let i = self.use_register(index);
            let b = self.use_register(base);
            self.emit(ArchOpcode::Add, &[addr], &[i, b], &[]);
            let zero = self.temp_immediate(0);
            let v = self.use_register_or_immediate_zero(value);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[],
                &[addr, zero, v],
                &[],
            );
        }
    }

    fn visit_atomic_exchange(&mut self, node: Node, opcode: ArchOpcode, width: AtomicWidth) {
        let inputs = [
            self.use_unique_register(self.graph.input(node, 0)),
            self.use_unique_register(self.graph.input(node, 1)),
            self.use_unique_register(self.graph.input(node, 2)),
        ];
        let outputs = [self.define_as_unique_register(node)];
        let temps = [
            self.temp_register(),
            self.temp_register(),
            self.temp_register(),
        ];
        let code = InstructionCode::new(opcode)
            .with_addressing_mode(AddressingMode::BaseImm)
            .with_atomic_width(width);
        self.emit(code, &outputs, &inputs, &temps);
    }

    fn visit_atomic_compare_exchange(&mut self, node: Node, opcode: ArchOpcode, width: AtomicWidth) {
        let inputs = [
            self.use_unique_register(self.graph.input(node, 0)),
            self.use_unique_register(self.graph.input(node, 1)),
            self.use_unique_register(self.graph.input(node, 2)),
            self.use_unique_register(self.graph.input(node, 3)),
        ];
        let outputs = [self.define_as_unique_register(node)];
        let temps = [
            self.temp_register(),
            self.temp_register(),
            self.temp_register(),
        ];
        let code = InstructionCode::new(opcode)
            .with_addressing_mode(AddressingMode::BaseImm)
            .with_atomic_width(width);
        self.emit(code, &outputs, &inputs, &temps);
    }

    fn visit_atomic_binop(&mut self, node: Node, opcode: ArchOpcode, width: AtomicWidth) {
        let inputs = [
            self.use_unique_register(self.graph.input(node, 0)),
            self.use_unique_register(self.graph.input(node, 1)),
            self.use_unique_register(self.graph.input(node, 2)),
        ];
        let outputs = [self.define_as_unique_register(node)];
        // The LL/SC retry loop needs a status register, a result register,
        // and masking temps.
        let temps = [
            self.temp_register(),
            self.temp_register(),
            self.temp_register(),
            self.temp_register(),
        ];
        let code = InstructionCode::new(opcode)
            .with_addressing_mode(AddressingMode::BaseImm)
            .with_atomic_width(width);
        self.emit(code, &outputs, &inputs, &temps);
    }

    fn visit_word32_atomic_pair_load(&mut self, node: Node) {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let code = InstructionCode::new(ArchOpcode::Word32AtomicPairLoad)
            .with_addressing_mode(AddressingMode::BaseImm);
        let inputs = [self.use_register(base), self.use_register(index)];
        let mut temps: SmallVec<[InstructionOperand; 4]> = SmallVec::new();
        temps.push(self.temp_fixed_register(t0()));
        let mut outputs: SmallVec<[InstructionOperand; 2]> = SmallVec::new();
        // The halves come back in a0/a1; unused halves still clobber them.
        if let Some(projection0) = self.graph.find_projection(node, 0) {
            outputs.push(self.define_as_fixed(projection0, a0()));
        } else {
            temps.push(self.temp_fixed_register(a0()));
        }
        if let Some(projection1) = self.graph.find_projection(node, 1) {
            outputs.push(self.define_as_fixed(projection1, a1()));
        } else {
            temps.push(self.temp_fixed_register(a1()));
        }
        self.emit(code, &outputs, &inputs, &temps);
    }

    fn visit_word32_atomic_pair_store(&mut self, node: Node) {
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let value_low = self.graph.input(node, 2);
        let value_high = self.graph.input(node, 3);
        let inputs = [
            self.use_register(base),
            self.use_register(index),
            self.use_fixed(value_low, a1()),
            self.use_fixed(value_high, a2()),
        ];
        let temps = [
            self.temp_fixed_register(a0()),
            self.temp_register(),
            self.temp_register(),
        ];
        let code = InstructionCode::new(ArchOpcode::Word32AtomicPairStore)
            .with_addressing_mode(AddressingMode::BaseImm);
        self.emit(code, &[], &inputs, &temps);
    }

    // Pair arithmetic --------------------------------------------------------

    fn visit_int32_pair_binop(&mut self, node: Node, pair_opcode: ArchOpcode, single_opcode: ArchOpcode) {
        if let Some(projection1) = self.graph.find_projection(node, 1) {
            // Unique inputs so none of them shares a register with an output.
            let inputs = [
                self.use_unique_register(self.graph.input(node, 0)),
                self.use_unique_register(self.graph.input(node, 1)),
                self.use_unique_register(self.graph.input(node, 2)),
                self.use_unique_register(self.graph.input(node, 3)),
            ];
            let outputs = [
                self.define_as_register(node),
                self.define_as_register(projection1),
            ];
            self.emit(pair_opcode, &outputs, &inputs, &[]);
        } else {
            // The high word of the result is not used, so we emit the standard
            // 32 bit instruction.
            let dst = self.define_same_as_first(node);
            let a = self.use_register(self.graph.input(node, 0));
            let b = self.use_register(self.graph.input(node, 2));
            self.emit(single_opcode, &[dst], &[a, b], &[]);
        }
    }

    fn visit_word32_pair_shift(&mut self, node: Node, opcode: ArchOpcode) {
        let shift = self.graph.input(node, 2);
        let shift_operand = if matchers::int32_constant(self.graph, shift).is_some() {
            self.use_immediate(shift)
        } else {
            self.use_unique_register(shift)
        };
        // Unique inputs so none of them shares a register with an output.
        let inputs = [
            self.use_unique_register(self.graph.input(node, 0)),
            self.use_unique_register(self.graph.input(node, 1)),
            shift_operand,
        ];

        let mut outputs: SmallVec<[InstructionOperand; 2]> = SmallVec::new();
        let mut temps: SmallVec<[InstructionOperand; 4]> = SmallVec::new();
        outputs.push(self.define_as_register(node));
        if let Some(projection1) = self.graph.find_projection(node, 1) {
            outputs.push(self.define_as_register(projection1));
        } else {
            temps.push(self.temp_register());
        }
        self.emit(opcode, &outputs, &inputs, &temps);
    }

    // Projections ------------------------------------------------------------

    fn visit_projection(&mut self, node: Node, index: u32) {
        let producer = self.graph.input(node, 0);
        match self.graph.op(producer) {
            Operator::Int32AddWithOverflow
            | Operator::Int32SubWithOverflow
            | Operator::Int32MulWithOverflow
            | Operator::Int32PairAdd
            | Operator::Int32PairSub
            | Operator::Int32PairMul
            | Operator::Word32PairShl
            | Operator::Word32PairShr
            | Operator::Word32PairSar => {
                if index == 0 {
                    // The primary output is the producer's own value.
                    self.rename(node, producer);
                } else {
                    debug_assert_eq!(index, 1);
                }
                self.mark_as_used(producer);
            }
            // The pair atomics define their projections themselves.
            Operator::Word32AtomicPairLoad => {}
            _ => {}
        }
    }

    // Overflow arithmetic ----------------------------------------------------

    fn visit_int32_with_overflow(&mut self, node: Node, opcode: ArchOpcode) {
        if let Some(ovf) = self.graph.find_projection(node, 1) {
            let cont = FlagsContinuation::for_set(FlagsCondition::Overflow, ovf);
            return self.visit_binop_with_cont(node, opcode, false, opcode, cont);
        }
        self.visit_binop(node, opcode, false, opcode);
    }

    // Calls ------------------------------------------------------------------

    fn visit_call(&mut self, node: Node, descriptor: &CallDescriptor) {
        let arguments: Vec<PushParameter> = descriptor
            .param_locations
            .iter()
            .enumerate()
            .map(|(i, location)| PushParameter {
                node: Some(self.graph.input(node, i + 1)),
                location: *location,
            })
            .collect();
        let stack_arguments: Vec<PushParameter> = arguments
            .iter()
            .copied()
            .filter(|p| p.location.is_caller_frame_slot())
            .collect();
        self.emit_prepare_arguments(&stack_arguments, descriptor);

        let mut inputs: SmallVec<[InstructionOperand; 8]> = SmallVec::new();
        inputs.push(self.use_register(self.graph.input(node, 0)));
        for argument in &arguments {
            if let LinkageLocation::Register(reg, _) = argument.location {
                if let Some(n) = argument.node {
                    inputs.push(self.use_fixed(n, reg));
                }
            }
        }

        let mut outputs: SmallVec<[InstructionOperand; 2]> = SmallVec::new();
        let mut results: Vec<PushParameter> = Vec::new();
        for (i, location) in descriptor.return_locations.iter().enumerate() {
            let result_node = if i == 0 {
                Some(node)
            } else {
                self.graph.find_projection(node, i as u32)
            };
            match *location {
                LinkageLocation::Register(reg, _) => {
                    if let Some(n) = result_node {
                        outputs.push(self.define_as_fixed(n, reg));
                    }
                }
                LinkageLocation::CallerFrameSlot { .. } => results.push(PushParameter {
                    node: result_node,
                    location: *location,
                }),
            }
        }

        let code = match descriptor.kind {
            CallKind::CFunction => InstructionCode::new(ArchOpcode::ArchCallCFunction)
                .with_misc(descriptor.parameter_count() as u32),
            CallKind::CodeObject => InstructionCode::new(ArchOpcode::ArchCallCodeObject),
        };
        self.emit(code, &outputs, &inputs, &[]).mark_as_call();

        self.emit_prepare_results(&results, descriptor);
    }

    /// Claim stack space and poke the stack-located arguments into their
    /// slots.
    fn emit_prepare_arguments(&mut self, arguments: &[PushParameter], descriptor: &CallDescriptor) {
        if descriptor.is_c_function_call() {
            let code = InstructionCode::new(ArchOpcode::ArchPrepareCallCFunction)
                .with_misc(descriptor.parameter_count() as u32);
            self.emit(code, &[], &[], &[]);

            // Poke any stack arguments.
            let mut slot = C_ARG_SLOT_COUNT;
            for argument in arguments {
                if let Some(n) = argument.node {
                    let value = self.use_register(n);
                    let offset = self.temp_immediate(slot << POINTER_SIZE_LOG2);
                    self.emit(ArchOpcode::StoreToStackSlot, &[], &[value, offset], &[]);
                    slot += 1;
                }
            }
        } else {
            if descriptor.parameter_slot_count() > 0 {
                let claim = self.temp_immediate((arguments.len() as i32) << POINTER_SIZE_LOG2);
                self.emit(ArchOpcode::StackClaim, &[], &[claim], &[]);
            }
            for (n, argument) in arguments.iter().enumerate() {
                if let Some(node) = argument.node {
                    let value = self.use_register(node);
                    let offset = self.temp_immediate((n as i32) << POINTER_SIZE_LOG2);
                    self.emit(ArchOpcode::StoreToStackSlot, &[], &[value, offset], &[]);
                }
            }
        }
    }

    /// Read caller-frame results back with `Peek`, stepping by each result's
    /// size in pointer words. Float results are marked so the allocator
    /// picks the FP file.
    fn emit_prepare_results(&mut self, results: &[PushParameter], descriptor: &CallDescriptor) {
        let mut reverse_slot: i32 = 1;
        for result in results {
            debug_assert!(result.location.is_caller_frame_slot());
            if let Some(node) = result.node {
                debug_assert!(!descriptor.is_c_function_call());
                let output = self.define_as_register(node);
                let rep = result.location.representation();
                if matches!(
                    rep,
                    MachineRepresentation::Float32 | MachineRepresentation::Float64
                ) {
                    if let Some(vreg) = output.vreg() {
                        self.sequence_mut().set_representation(vreg, rep);
                    }
                }
                let slot = self.temp_immediate(reverse_slot);
                self.emit(ArchOpcode::Peek, &[output], &[slot], &[]);
            }
            reverse_slot += result.location.size_in_pointers();
        }
    }

    // Fixed-register float libcalls ------------------------------------------

    fn visit_float64_libcall_binop(&mut self, node: Node, opcode: ArchOpcode) {
        let dst = self.define_as_fixed(node, fa0());
        let a = self.use_fixed(self.graph.input(node, 0), fa0());
        let b = self.use_fixed(self.graph.input(node, 1), fa1());
        self.emit(opcode, &[dst], &[a, b], &[]).mark_as_call();
    }

    fn visit_float64_libcall_unop(&mut self, node: Node, opcode: ArchOpcode) {
        let dst = self.define_as_fixed(node, fa0());
        let a = self.use_fixed(self.graph.input(node, 0), fa1());
        self.emit(opcode, &[dst], &[a], &[]).mark_as_call();
    }

    // Dispatcher -------------------------------------------------------------

    /// Lower one node. The single entry point of the selection rules.
    pub(crate) fn visit(&mut self, node: Node) -> CodegenResult<()> {
        use ArchOpcode as A;
        let op = self.graph.op(node).clone();
        match op {
            Operator::Parameter(_) => {
                // Defined by the prologue, outside this pass.
                self.define_as_register(node);
            }
            Operator::Int32Constant(v) => self.visit_constant(node, Constant::Int32(v)),
            Operator::Int64Constant(v) => self.visit_constant(node, Constant::Int64(v)),
            Operator::Float32Constant(v) => self.visit_constant(node, Constant::from_f32(v)),
            Operator::Float64Constant(v) => self.visit_constant(node, Constant::from_f64(v)),
            Operator::ExternalConstant(_) => {
                // Materialized at the use site.
                self.define_as_register(node);
            }
            Operator::Projection(index) => self.visit_projection(node, index),

            Operator::Word32And => self.visit_binop(node, A::And, true, A::And),
            Operator::Word32Or => self.visit_binop(node, A::Or, true, A::Or),
            Operator::Word32Xor => self.visit_word32_xor(node),
            Operator::Word32Shl => self.visit_word32_shl(node),
            Operator::Word32Shr => self.visit_rro(A::Shr32, node),
            Operator::Word32Sar => self.visit_word32_sar(node),
            Operator::Word32Rol => unsupported!("Word32Rol"),
            Operator::Word32Ror => self.visit_rro(A::Ror32, node),
            Operator::Word32Clz => self.visit_rr(A::Clz32, node),
            Operator::Word32Ctz => self.visit_rr(A::Ctz32, node),
            Operator::Word32Popcnt => self.visit_rr(A::Popcnt32, node),
            Operator::Word32ReverseBits => unsupported!("Word32ReverseBits"),
            Operator::Word32ReverseBytes => self.visit_rr(A::ByteSwap32, node),
            Operator::Word64ReverseBytes => unsupported!("Word64ReverseBytes"),
            Operator::Simd128ReverseBytes => unsupported!("Simd128ReverseBytes"),

            Operator::Int32Add => self.visit_binop(node, A::Add, true, A::Add),
            Operator::Int32Sub => self.visit_binop(node, A::Sub, false, A::Sub),
            Operator::Int32Mul => self.visit_int32_mul(node),
            Operator::Int32MulHigh => self.visit_rrr(A::MulHigh32, node),
            Operator::Uint32MulHigh => self.visit_rrr(A::MulHighU32, node),
            Operator::Int32Div => self.visit_div_mod(node, A::Div32, true),
            Operator::Uint32Div => self.visit_div_mod(node, A::DivU32, true),
            Operator::Int32Mod => self.visit_div_mod(node, A::Mod32, false),
            Operator::Uint32Mod => self.visit_div_mod(node, A::ModU32, false),
            Operator::Int32AddWithOverflow => self.visit_int32_with_overflow(node, A::AddOvf),
            Operator::Int32SubWithOverflow => self.visit_int32_with_overflow(node, A::SubOvf),
            Operator::Int32MulWithOverflow => self.visit_int32_with_overflow(node, A::MulOvf32),
            Operator::Int32AbsWithOverflow => unsupported!("Int32AbsWithOverflow"),
            Operator::Int64AbsWithOverflow => unsupported!("Int64AbsWithOverflow"),
            Operator::SignExtendWord8ToInt32 => self.visit_rr(A::SignExtendByte, node),
            Operator::SignExtendWord16ToInt32 => self.visit_rr(A::SignExtendShort, node),

            Operator::Word32Equal => self.visit_word32_equal(node),
            Operator::Word64Equal => unsupported!("Word64Equal"),
            Operator::Int32LessThan => {
                self.visit_comparison_for_set(node, FlagsCondition::SignedLessThan)
            }
            Operator::Int32LessThanOrEqual => {
                self.visit_comparison_for_set(node, FlagsCondition::SignedLessThanOrEqual)
            }
            Operator::Uint32LessThan => {
                self.visit_comparison_for_set(node, FlagsCondition::UnsignedLessThan)
            }
            Operator::Uint32LessThanOrEqual => {
                self.visit_comparison_for_set(node, FlagsCondition::UnsignedLessThanOrEqual)
            }

            Operator::Int32PairAdd => self.visit_int32_pair_binop(node, A::AddPair, A::Add),
            Operator::Int32PairSub => self.visit_int32_pair_binop(node, A::SubPair, A::Sub),
            Operator::Int32PairMul => self.visit_int32_pair_binop(node, A::MulPair, A::Mul32),
            Operator::Word32PairShl => self.visit_word32_pair_shift(node, A::ShlPair),
            Operator::Word32PairShr => self.visit_word32_pair_shift(node, A::ShrPair),
            Operator::Word32PairSar => self.visit_word32_pair_shift(node, A::SarPair),

            Operator::ChangeFloat32ToFloat64 => self.visit_rr(A::CvtDS, node),
            Operator::RoundInt32ToFloat32 => self.visit_rr(A::CvtSW, node),
            Operator::RoundUint32ToFloat32 => self.visit_rr(A::CvtSUw, node),
            Operator::ChangeInt32ToFloat64 => self.visit_rr(A::CvtDW, node),
            Operator::ChangeUint32ToFloat64 => self.visit_rr(A::CvtDUw, node),
            Operator::TruncateFloat32ToInt32(kind) => {
                self.visit_truncate_with_kind(node, A::TruncWS, kind)
            }
            Operator::TruncateFloat32ToUint32(kind) => {
                self.visit_truncate_with_kind(node, A::TruncUwS, kind)
            }
            Operator::ChangeFloat64ToInt32 => self.visit_change_float64_to_int32(node),
            Operator::ChangeFloat64ToUint32 => self.visit_rr(A::TruncUwD, node),
            Operator::TruncateFloat64ToUint32 => self.visit_rr(A::TruncUwD, node),
            Operator::TruncateFloat64ToFloat32 => self.visit_truncate_float64_to_float32(node),
            Operator::TruncateFloat64ToWord32 => self.visit_rr(A::ArchTruncateDoubleToI, node),
            Operator::RoundFloat64ToInt32 => self.visit_rr(A::TruncWD, node),
            Operator::BitcastFloat32ToInt32 => self.visit_rr(A::BitcastFloat32ToInt32, node),
            Operator::BitcastInt32ToFloat32 => self.visit_rr(A::BitcastInt32ToFloat32, node),

            Operator::Float32Add => self.visit_rrr(A::AddS, node),
            Operator::Float32Sub => self.visit_rrr(A::SubS, node),
            Operator::Float32Mul => self.visit_rrr(A::MulS, node),
            Operator::Float32Div => self.visit_rrr(A::DivS, node),
            Operator::Float32Max => self.visit_rrr(A::Float32Max, node),
            Operator::Float32Min => self.visit_rrr(A::Float32Min, node),
            Operator::Float32Abs => self.visit_rr(A::AbsS, node),
            Operator::Float32Sqrt => self.visit_rr(A::SqrtS, node),
            Operator::Float32Neg => self.visit_rr(A::NegS, node),
            Operator::Float32RoundDown => self.visit_rr(A::Float32RoundDown, node),
            Operator::Float32RoundUp => self.visit_rr(A::Float32RoundUp, node),
            Operator::Float32RoundTruncate => self.visit_rr(A::Float32RoundTruncate, node),
            Operator::Float32RoundTiesEven => self.visit_rr(A::Float32RoundTiesEven, node),
            Operator::Float32Equal => {
                let cont = FlagsContinuation::for_set(FlagsCondition::Equal, node);
                self.visit_float32_compare(node, &cont);
            }
            Operator::Float32LessThan => {
                let cont =
                    FlagsContinuation::for_set(FlagsCondition::UnsignedLessThan, node);
                self.visit_float32_compare(node, &cont);
            }
            Operator::Float32LessThanOrEqual => {
                let cont =
                    FlagsContinuation::for_set(FlagsCondition::UnsignedLessThanOrEqual, node);
                self.visit_float32_compare(node, &cont);
            }

            Operator::Float64Add => self.visit_rrr(A::AddD, node),
            Operator::Float64Sub => self.visit_rrr(A::SubD, node),
            Operator::Float64Mul => self.visit_rrr(A::MulD, node),
            Operator::Float64Div => self.visit_rrr(A::DivD, node),
            Operator::Float64Mod => self.visit_float64_libcall_binop(node, A::ModD),
            Operator::Float64Max => self.visit_rrr(A::Float64Max, node),
            Operator::Float64Min => self.visit_rrr(A::Float64Min, node),
            Operator::Float64Abs => self.visit_rr(A::AbsD, node),
            Operator::Float64Sqrt => self.visit_rr(A::SqrtD, node),
            Operator::Float64Neg => self.visit_rr(A::NegD, node),
            Operator::Float64RoundDown => unsupported!("Float64RoundDown"),
            Operator::Float64RoundUp => unsupported!("Float64RoundUp"),
            Operator::Float64RoundTruncate => unsupported!("Float64RoundTruncate"),
            Operator::Float64RoundTiesAway => unsupported!("Float64RoundTiesAway"),
            Operator::Float64RoundTiesEven => unsupported!("Float64RoundTiesEven"),
            Operator::Float64Equal => {
                let cont = FlagsContinuation::for_set(FlagsCondition::Equal, node);
                self.visit_float64_compare(node, &cont);
            }
            Operator::Float64LessThan => {
                let cont =
                    FlagsContinuation::for_set(FlagsCondition::UnsignedLessThan, node);
                self.visit_float64_compare(node, &cont);
            }
            Operator::Float64LessThanOrEqual => {
                let cont =
                    FlagsContinuation::for_set(FlagsCondition::UnsignedLessThanOrEqual, node);
                self.visit_float64_compare(node, &cont);
            }
            Operator::Float64Atan2 => self.visit_float64_libcall_binop(node, A::Ieee754Float64Atan2),
            Operator::Float64Pow => self.visit_float64_libcall_binop(node, A::Ieee754Float64Pow),
            Operator::Float64Sin => self.visit_float64_libcall_unop(node, A::Ieee754Float64Sin),
            Operator::Float64Cos => self.visit_float64_libcall_unop(node, A::Ieee754Float64Cos),
            Operator::Float64Exp => self.visit_float64_libcall_unop(node, A::Ieee754Float64Exp),
            Operator::Float64Log => self.visit_float64_libcall_unop(node, A::Ieee754Float64Log),
            Operator::Float64ExtractLowWord32 => self.visit_rr(A::Float64ExtractLowWord32, node),
            Operator::Float64ExtractHighWord32 => self.visit_rr(A::Float64ExtractHighWord32, node),
            Operator::Float64InsertLowWord32 => {
                self.visit_float64_insert_word32(node, A::Float64InsertLowWord32)
            }
            Operator::Float64InsertHighWord32 => {
                self.visit_float64_insert_word32(node, A::Float64InsertHighWord32)
            }
            Operator::Float64SilenceNaN => self.visit_rr(A::Float64SilenceNaN, node),

            Operator::Load(rep) => {
                let opcode = self.load_opcode(rep)?;
                self.emit_load(node, InstructionCode::new(opcode));
            }
            Operator::Store(rep) => self.visit_store(node, rep)?,
            Operator::UnalignedLoad(rep) => self.visit_unaligned_load(node, rep)?,
            Operator::UnalignedStore(rep) => self.visit_unaligned_store(node, rep)?,
            Operator::ProtectedLoad(_) => unsupported!("ProtectedLoad"),
            Operator::ProtectedStore(_) => unsupported!("ProtectedStore"),
            Operator::StackSlot(rep) => self.visit_stack_slot(node, rep.size, rep.alignment),

            Operator::Branch { on_true, on_false } => {
                let mut cont =
                    FlagsContinuation::for_branch(FlagsCondition::NotEqual, on_true, on_false);
                let value = self.graph.input(node, 0);
                self.visit_word_compare_zero(node, value, &mut cont);
            }
            Operator::Goto(target) => {
                let label = self.use_label(target);
                self.emit(A::ArchJmp, &[], &[label], &[]);
            }
            Operator::Switch(ref sw) => self.visit_switch(node, sw),
            Operator::DeoptimizeIf(params) => {
                let mut cont =
                    FlagsContinuation::for_deoptimize(FlagsCondition::NotEqual, params);
                let value = self.graph.input(node, 0);
                self.visit_word_compare_zero(node, value, &mut cont);
            }
            Operator::DeoptimizeUnless(params) => {
                let mut cont = FlagsContinuation::for_deoptimize(FlagsCondition::Equal, params);
                let value = self.graph.input(node, 0);
                self.visit_word_compare_zero(node, value, &mut cont);
            }
            Operator::TrapIf(trap) => {
                let mut cont = FlagsContinuation::for_trap(FlagsCondition::NotEqual, trap);
                let value = self.graph.input(node, 0);
                self.visit_word_compare_zero(node, value, &mut cont);
            }
            Operator::TrapUnless(trap) => {
                let mut cont = FlagsContinuation::for_trap(FlagsCondition::Equal, trap);
                let value = self.graph.input(node, 0);
                self.visit_word_compare_zero(node, value, &mut cont);
            }
            Operator::StackPointerGreaterThan(_) => {
                let cont =
                    FlagsContinuation::for_set(FlagsCondition::StackPointerGreaterThan, node);
                self.visit_stack_pointer_greater_than(node, &cont);
            }
            Operator::AbortCSADcheck => {
                let input = self.use_fixed(self.graph.input(node, 0), a0());
                self.emit(A::ArchAbortCSADcheck, &[], &[input], &[]);
            }
            Operator::MemoryBarrier => {
                self.emit(A::Sync, &[], &[], &[]);
            }
            Operator::Call(ref descriptor) => self.visit_call(node, descriptor),
            Operator::Return => {
                if self.graph.input_count(node) > 0 {
                    let value = self.use_fixed(self.graph.input(node, 0), a0());
                    self.emit(A::ArchRet, &[], &[value], &[]);
                } else {
                    self.emit(A::ArchRet, &[], &[], &[]);
                }
            }

            Operator::Word32AtomicLoad(rep) => {
                let opcode = match rep.rep {
                    MachineRepresentation::Word8 => {
                        if rep.is_unsigned() {
                            A::AtomicLoadUint8
                        } else {
                            A::AtomicLoadInt8
                        }
                    }
                    MachineRepresentation::Word16 => {
                        if rep.is_unsigned() {
                            A::AtomicLoadUint16
                        } else {
                            A::AtomicLoadInt16
                        }
                    }
                    MachineRepresentation::TaggedSigned
                    | MachineRepresentation::TaggedPointer
                    | MachineRepresentation::Tagged
                    | MachineRepresentation::Word32 => A::AtomicLoadWord32,
                    rep => {
                        return Err(CodegenError::UnsupportedRepresentation(format!(
                            "{rep:?} atomic load"
                        )))
                    }
                };
                self.visit_atomic_load(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicStore(rep) => {
                let opcode = match rep {
                    MachineRepresentation::Word8 => A::AtomicStoreWord8,
                    MachineRepresentation::Word16 => A::AtomicStoreWord16,
                    MachineRepresentation::TaggedSigned
                    | MachineRepresentation::TaggedPointer
                    | MachineRepresentation::Tagged
                    | MachineRepresentation::Word32 => A::AtomicStoreWord32,
                    rep => {
                        return Err(CodegenError::UnsupportedRepresentation(format!(
                            "{rep:?} atomic store"
                        )))
                    }
                };
                self.visit_atomic_store(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicExchange(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicExchangeInt8,
                        A::AtomicExchangeUint8,
                        A::AtomicExchangeInt16,
                        A::AtomicExchangeUint16,
                        A::AtomicExchangeWord32,
                    ],
                );
                self.visit_atomic_exchange(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicCompareExchange(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicCompareExchangeInt8,
                        A::AtomicCompareExchangeUint8,
                        A::AtomicCompareExchangeInt16,
                        A::AtomicCompareExchangeUint16,
                        A::AtomicCompareExchangeWord32,
                    ],
                );
                self.visit_atomic_compare_exchange(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicAdd(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicAddInt8,
                        A::AtomicAddUint8,
                        A::AtomicAddInt16,
                        A::AtomicAddUint16,
                        A::AtomicAddWord32,
                    ],
                );
                self.visit_atomic_binop(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicSub(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicSubInt8,
                        A::AtomicSubUint8,
                        A::AtomicSubInt16,
                        A::AtomicSubUint16,
                        A::AtomicSubWord32,
                    ],
                );
                self.visit_atomic_binop(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicAnd(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicAndInt8,
                        A::AtomicAndUint8,
                        A::AtomicAndInt16,
                        A::AtomicAndUint16,
                        A::AtomicAndWord32,
                    ],
                );
                self.visit_atomic_binop(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicOr(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicOrInt8,
                        A::AtomicOrUint8,
                        A::AtomicOrInt16,
                        A::AtomicOrUint16,
                        A::AtomicOrWord32,
                    ],
                );
                self.visit_atomic_binop(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicXor(ty) => {
                let opcode = atomic_op_by_type(
                    ty,
                    [
                        A::AtomicXorInt8,
                        A::AtomicXorUint8,
                        A::AtomicXorInt16,
                        A::AtomicXorUint16,
                        A::AtomicXorWord32,
                    ],
                );
                self.visit_atomic_binop(node, opcode, AtomicWidth::Word32);
            }
            Operator::Word32AtomicPairLoad => self.visit_word32_atomic_pair_load(node),
            Operator::Word32AtomicPairStore => self.visit_word32_atomic_pair_store(node),
            Operator::Word32AtomicPairAdd => unsupported!("Word32AtomicPairAdd"),
            Operator::Word32AtomicPairSub => unsupported!("Word32AtomicPairSub"),
            Operator::Word32AtomicPairAnd => unsupported!("Word32AtomicPairAnd"),
            Operator::Word32AtomicPairOr => unsupported!("Word32AtomicPairOr"),
            Operator::Word32AtomicPairXor => unsupported!("Word32AtomicPairXor"),
            Operator::Word32AtomicPairExchange => unsupported!("Word32AtomicPairExchange"),
            Operator::Word32AtomicPairCompareExchange => {
                unsupported!("Word32AtomicPairCompareExchange")
            }

            op => return self.visit_simd(node, op),
        }
        Ok(())
    }

    fn visit_constant(&mut self, node: Node, constant: Constant) {
        let output = self.define_as_register(node);
        if let Some(vreg) = output.vreg() {
            self.sequence_mut().register_constant(vreg, constant);
        }
    }

    fn visit_truncate_with_kind(&mut self, node: Node, opcode: ArchOpcode, kind: TruncateKind) {
        let mut code = InstructionCode::new(opcode);
        if kind == TruncateKind::SetOverflowToMin {
            code = code.with_misc(1);
        }
        let dst = self.define_as_register(node);
        let src = self.use_register(self.graph.input(node, 0));
        self.emit(code, &[dst], &[src], &[]);
    }

    fn visit_change_float64_to_int32(&mut self, node: Node) {
        let value = self.graph.input(node, 0);
        if self.can_cover(node, value)
            && matches!(self.graph.op(value), Operator::ChangeFloat32ToFloat64)
        {
            // Match the float32 -> float64 -> int32 representation change
            // path.
            let dst = self.define_as_register(node);
            let src = self.use_register(self.graph.input(value, 0));
            self.emit(ArchOpcode::TruncWS, &[dst], &[src], &[]);
            return;
        }
        self.visit_rr(ArchOpcode::TruncWD, node);
    }

    fn visit_truncate_float64_to_float32(&mut self, node: Node) {
        let value = self.graph.input(node, 0);
        // Match TruncateFloat64ToFloat32(ChangeInt32ToFloat64) to the direct
        // int32 -> float32 conversion.
        if self.can_cover(node, value)
            && matches!(self.graph.op(value), Operator::ChangeInt32ToFloat64)
        {
            let dst = self.define_as_register(node);
            let src = self.use_register(self.graph.input(value, 0));
            self.emit(ArchOpcode::CvtSW, &[dst], &[src], &[]);
            return;
        }
        self.visit_rr(ArchOpcode::CvtSD, node);
    }

    fn visit_float64_insert_word32(&mut self, node: Node, opcode: ArchOpcode) {
        let dst = self.define_same_as_first(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_register(self.graph.input(node, 1));
        self.emit(opcode, &[dst], &[a, b], &[]);
    }
}

fn atomic_op_by_type(ty: MachineType, opcodes: [ArchOpcode; 5]) -> ArchOpcode {
    match ty {
        MachineType::Int8 => opcodes[0],
        MachineType::Uint8 => opcodes[1],
        MachineType::Int16 => opcodes[2],
        MachineType::Uint16 => opcodes[3],
        MachineType::Int32 | MachineType::Uint32 => opcodes[4],
    }
}
