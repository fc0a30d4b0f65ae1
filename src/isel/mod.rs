//! Instruction selection: state, driver, and operand construction.
//!
//! The selector is driven externally over one function's nodes in *reverse*
//! scheduling order, the order in which the surrounding pipeline emits
//! instructions. Visiting users before their operands is what lets a rule
//! fold an operand into its sole consumer: a node that was consumed by a
//! fold is never demanded as a register and therefore never visited on its
//! own.

pub mod flags;
pub mod frame;
pub mod operands;
pub mod sequence;

use std::collections::HashMap;

use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{EntitySet, SecondaryMap};
use regalloc2::PReg;
use smallvec::SmallVec;

use crate::ir::operators::{ExternalReference, Operator, SwitchInfo};
use crate::ir::{Block, Graph, Node};
use crate::isa::riscv32::opcodes::{ArchOpcode, InstructionCode};
use crate::isa::riscv32::settings as riscv_settings;
use crate::settings::Flags;
use crate::trace;
use crate::CodegenResult;

pub use flags::{FlagsCondition, FlagsContinuation};
pub use frame::Frame;
pub use operands::{InstructionOperand, TempKind, UnallocatedPolicy, VirtualReg};
pub use sequence::{Constant, Instruction, InstructionSequence};

/// The host VM's mapping from external references to offsets off the root
/// register. References that are absent cannot be addressed root-relative.
#[derive(Clone, Default)]
pub struct RootsTable {
    offsets: HashMap<ExternalReference, i32>,
}

impl RootsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, reference: ExternalReference, offset: i32) {
        self.offsets.insert(reference, offset);
    }

    pub fn offset_for(&self, reference: ExternalReference) -> Option<i32> {
        self.offsets.get(&reference).copied()
    }
}

/// The instruction-selection pass over one function.
pub struct InstructionSelector<'a> {
    pub(crate) graph: &'a Graph,
    frame: &'a mut Frame,
    flags: Flags,
    isa_flags: riscv_settings::Flags,
    roots: RootsTable,
    seq: InstructionSequence,
    defined: EntitySet<Node>,
    used: EntitySet<Node>,
    vregs: SecondaryMap<Node, PackedOption<VirtualReg>>,
}

impl<'a> InstructionSelector<'a> {
    pub fn new(
        graph: &'a Graph,
        frame: &'a mut Frame,
        flags: Flags,
        isa_flags: riscv_settings::Flags,
        roots: RootsTable,
    ) -> Self {
        Self {
            graph,
            frame,
            flags,
            isa_flags,
            roots,
            seq: InstructionSequence::new(),
            defined: EntitySet::new(),
            used: EntitySet::new(),
            vregs: SecondaryMap::new(),
        }
    }

    /// Run selection over `order`, the reverse scheduling order of the
    /// function (users before operands). Instructions are appended in
    /// visitation order, grouped per node; the consuming pass restores
    /// execution order per block.
    pub fn select(&mut self, order: &[Node]) -> CodegenResult<()> {
        for &node in order {
            if !self.is_used(node) || self.is_defined(node) {
                continue;
            }
            trace!("select {} = {:?}", node, self.graph.op(node));
            self.visit(node)?;
        }
        Ok(())
    }

    /// Take the finished instruction sequence.
    pub fn finish(self) -> InstructionSequence {
        self.seq
    }

    pub(crate) fn sequence_mut(&mut self) -> &mut InstructionSequence {
        &mut self.seq
    }

    pub(crate) fn flags(&self) -> &Flags {
        &self.flags
    }

    /// The target flags this selector was constructed with.
    pub fn isa_flags(&self) -> &riscv_settings::Flags {
        &self.isa_flags
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        &mut *self.frame
    }

    pub(crate) fn root_register_offset(&self, reference: ExternalReference) -> Option<i32> {
        self.roots.offset_for(reference)
    }

    // Node bookkeeping ------------------------------------------------------

    /// Whether `node` has produced its value (or has been consumed by a
    /// fold) already. With the reverse walk this is equivalent to "scheduled
    /// after the node currently being visited".
    pub fn is_defined(&self, node: Node) -> bool {
        self.defined.contains(node)
    }

    pub(crate) fn mark_as_defined(&mut self, node: Node) {
        self.defined.insert(node);
    }

    fn is_used(&self, node: Node) -> bool {
        self.graph.op(node).has_effects() || self.used.contains(node)
    }

    pub(crate) fn mark_as_used(&mut self, node: Node) {
        self.used.insert(node);
    }

    /// Whether `user` may fold `value` into itself. Only the sole consumer
    /// of a not-yet-defined node may do so; every fold in the selection
    /// rules is guarded by this predicate.
    pub fn can_cover(&self, user: Node, value: Node) -> bool {
        let uses = self.graph.uses(value);
        !self.is_defined(value) && uses.len() == 1 && uses[0] == user
    }

    fn virtual_register(&mut self, node: Node) -> VirtualReg {
        if let Some(vreg) = self.vregs[node].expand() {
            return vreg;
        }
        let vreg = self.seq.next_virtual_register();
        self.vregs[node] = vreg.into();
        vreg
    }

    /// Alias `node`'s value to `target`'s virtual register without emitting
    /// anything (projection 0 of a fused operation).
    pub(crate) fn rename(&mut self, node: Node, target: Node) {
        let vreg = self.virtual_register(target);
        self.vregs[node] = vreg.into();
        self.mark_as_defined(node);
    }

    // Operand construction --------------------------------------------------

    pub(crate) fn use_register(&mut self, node: Node) -> InstructionOperand {
        self.mark_as_used(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::AnyRegister,
            vreg,
        }
    }

    pub(crate) fn use_unique_register(&mut self, node: Node) -> InstructionOperand {
        self.mark_as_used(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::UniqueRegister,
            vreg,
        }
    }

    pub(crate) fn use_fixed(&mut self, node: Node, reg: PReg) -> InstructionOperand {
        self.mark_as_used(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::FixedRegister(reg),
            vreg,
        }
    }

    /// The immediate form of a constant node's payload.
    pub(crate) fn use_immediate(&mut self, node: Node) -> InstructionOperand {
        let constant = match *self.graph.op(node) {
            Operator::Int32Constant(v) => Constant::Int32(v),
            Operator::Int64Constant(v) => Constant::Int64(v),
            Operator::Float32Constant(v) => Constant::from_f32(v),
            Operator::Float64Constant(v) => Constant::from_f64(v),
            ref op => unreachable!("use_immediate on non-constant {:?}", op),
        };
        self.use_immediate_value(constant)
    }

    pub(crate) fn use_immediate_value(&mut self, constant: Constant) -> InstructionOperand {
        InstructionOperand::Immediate(self.seq.add_immediate(constant))
    }

    pub(crate) fn temp_immediate(&mut self, value: i32) -> InstructionOperand {
        self.use_immediate_value(Constant::Int32(value))
    }

    pub(crate) fn use_immediate64(&mut self, value: i64) -> InstructionOperand {
        self.use_immediate_value(Constant::Int64(value))
    }

    pub(crate) fn use_label(&mut self, block: Block) -> InstructionOperand {
        self.use_immediate_value(Constant::Label(block))
    }

    pub(crate) fn define_as_register(&mut self, node: Node) -> InstructionOperand {
        self.mark_as_defined(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::AnyRegister,
            vreg,
        }
    }

    pub(crate) fn define_as_unique_register(&mut self, node: Node) -> InstructionOperand {
        self.mark_as_defined(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::UniqueRegister,
            vreg,
        }
    }

    pub(crate) fn define_same_as_first(&mut self, node: Node) -> InstructionOperand {
        self.mark_as_defined(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::SameAsFirstInput,
            vreg,
        }
    }

    pub(crate) fn define_as_fixed(&mut self, node: Node, reg: PReg) -> InstructionOperand {
        self.mark_as_defined(node);
        let vreg = self.virtual_register(node);
        InstructionOperand::Unallocated {
            policy: UnallocatedPolicy::FixedRegister(reg),
            vreg,
        }
    }

    pub(crate) fn temp_register(&mut self) -> InstructionOperand {
        InstructionOperand::Temp {
            kind: TempKind::Register,
            vreg: self.seq.next_virtual_register(),
        }
    }

    pub(crate) fn temp_fixed_register(&mut self, reg: PReg) -> InstructionOperand {
        InstructionOperand::Temp {
            kind: TempKind::FixedRegister(reg),
            vreg: self.seq.next_virtual_register(),
        }
    }

    pub(crate) fn temp_simd128_register(&mut self) -> InstructionOperand {
        InstructionOperand::Temp {
            kind: TempKind::Simd128Register,
            vreg: self.seq.next_virtual_register(),
        }
    }

    pub(crate) fn temp_fp_register(&mut self, reg: PReg) -> InstructionOperand {
        InstructionOperand::Temp {
            kind: TempKind::FpRegister(reg),
            vreg: self.seq.next_virtual_register(),
        }
    }

    // Emission --------------------------------------------------------------

    pub(crate) fn emit(
        &mut self,
        code: impl Into<InstructionCode>,
        outputs: &[InstructionOperand],
        inputs: &[InstructionOperand],
        temps: &[InstructionOperand],
    ) -> &mut Instruction {
        self.emit_with_continuation(code, outputs, inputs, temps, FlagsContinuation::None)
    }

    pub(crate) fn emit_with_continuation(
        &mut self,
        code: impl Into<InstructionCode>,
        outputs: &[InstructionOperand],
        inputs: &[InstructionOperand],
        temps: &[InstructionOperand],
        cont: FlagsContinuation,
    ) -> &mut Instruction {
        let mut outputs: SmallVec<[InstructionOperand; 2]> = SmallVec::from_slice(outputs);
        // A boolean-materializing continuation defines the result node on
        // the same instruction.
        if let FlagsContinuation::Set { result, .. } = &cont {
            let result = *result;
            outputs.push(self.define_as_register(result));
        }
        let inst = Instruction::new(
            code.into(),
            outputs,
            SmallVec::from_slice(inputs),
            SmallVec::from_slice(temps),
            cont,
        );
        self.seq.push(inst)
    }

    // Switch dispatch -------------------------------------------------------

    /// Emit a jump-table dispatch: the (rebased) index, then one label per
    /// value in the range, with holes pointing at the default target.
    pub(crate) fn emit_table_switch(&mut self, sw: &SwitchInfo, index_operand: InstructionOperand) {
        let mut inputs: SmallVec<[InstructionOperand; 8]> = SmallVec::new();
        inputs.push(index_operand);
        inputs.push(self.use_label(sw.default_branch));
        for value in i64::from(sw.min_value)..=i64::from(sw.max_value) {
            let target = sw
                .cases
                .iter()
                .find(|c| i64::from(c.value) == value)
                .map(|c| c.branch)
                .unwrap_or(sw.default_branch);
            inputs.push(self.use_label(target));
        }
        self.emit(ArchOpcode::ArchTableSwitch, &[], &inputs, &[]);
    }

    /// Emit a balanced-tree dispatch: the value, the default label, then
    /// (case value, case label) pairs sorted by value.
    pub(crate) fn emit_binary_search_switch(
        &mut self,
        sw: &SwitchInfo,
        value_operand: InstructionOperand,
    ) {
        let mut cases = sw.cases.clone();
        cases.sort_by_key(|c| c.value);
        let mut inputs: SmallVec<[InstructionOperand; 8]> = SmallVec::new();
        inputs.push(value_operand);
        inputs.push(self.use_label(sw.default_branch));
        for case in &cases {
            inputs.push(self.temp_immediate(case.value));
            inputs.push(self.use_label(case.branch));
        }
        self.emit(ArchOpcode::ArchBinarySearchSwitch, &[], &inputs, &[]);
    }
}
