//! End-to-end selection tests: build a small graph, run the selector over
//! its reverse scheduling order, and check the emitted stream.

use crate::ir::operators::{
    CaseInfo, ExternalReference, LoadRepresentation, MachineRepresentation, MachineType, Operator,
    StackSlotRepresentation, StoreRepresentation, SwitchInfo, WriteBarrierKind,
};
use crate::ir::{Block, Graph, Node};
use crate::isa::riscv32::opcodes::{AddressingMode, ArchOpcode};
use crate::isa::riscv32::settings as riscv_settings;
use crate::isel::{
    Constant, FlagsCondition, FlagsContinuation, Frame, InstructionOperand, InstructionSelector,
    InstructionSequence, RootsTable, UnallocatedPolicy,
};
use crate::settings::{Builder, Flags};

fn run(graph: &Graph) -> InstructionSequence {
    run_with(graph, Flags::default(), RootsTable::new())
}

fn run_with(graph: &Graph, flags: Flags, roots: RootsTable) -> InstructionSequence {
    let mut frame = Frame::new();
    let mut selector = InstructionSelector::new(
        graph,
        &mut frame,
        flags,
        riscv_settings::Flags::default(),
        roots,
    );
    let mut order: Vec<Node> = graph.nodes().collect();
    order.reverse();
    selector.select(&order).expect("selection failed");
    selector.finish()
}

fn opcodes(seq: &InstructionSequence) -> Vec<ArchOpcode> {
    seq.instructions()
        .iter()
        .map(|inst| inst.code().arch_opcode())
        .collect()
}

fn constant_of(seq: &InstructionSequence, operand: InstructionOperand) -> Constant {
    match operand {
        InstructionOperand::Immediate(index) => seq.constant(index),
        other => panic!("expected an immediate, got {:?}", other),
    }
}

fn word32_load() -> LoadRepresentation {
    LoadRepresentation::new(MachineRepresentation::Word32, false)
}

#[test]
fn add_with_small_immediate() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c5 = g.add(Operator::Int32Constant(5), &[]);
    let add = g.add(Operator::Int32Add, &[p0, c5]);
    g.add(Operator::Return, &[add]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Add]);
    let add = &seq.instructions()[1];
    assert_eq!(add.code().addressing_mode(), AddressingMode::None);
    assert_eq!(constant_of(&seq, add.input(1)), Constant::Int32(5));
}

#[test]
fn add_with_out_of_range_immediate_uses_a_register() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let big = g.add(Operator::Int32Constant(4096), &[]);
    let add = g.add(Operator::Int32Add, &[p0, big]);
    g.add(Operator::Return, &[add]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Add]);
    let add = &seq.instructions()[1];
    assert!(add.input(1).is_unallocated());
    // The operand register is backed by a rematerializable constant.
    let vreg = add.input(1).vreg().unwrap();
    assert_eq!(seq.constant_of(vreg), Some(Constant::Int32(4096)));
}

#[test]
fn commuted_immediate_moves_to_the_right() {
    let mut g = Graph::new();
    let c5 = g.add(Operator::Int32Constant(5), &[]);
    let p0 = g.add(Operator::Parameter(0), &[]);
    let add = g.add(Operator::Int32Add, &[c5, p0]);
    g.add(Operator::Return, &[add]);

    let seq = run(&g);
    let add = &seq.instructions()[1];
    assert!(add.input(0).is_unallocated());
    assert_eq!(constant_of(&seq, add.input(1)), Constant::Int32(5));
}

#[test]
fn shift_over_contiguous_mask_drops_the_mask() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let mask = g.add(Operator::Int32Constant(0xFFFF), &[]);
    let and = g.add(Operator::Word32And, &[p0, mask]);
    let c16 = g.add(Operator::Int32Constant(16), &[]);
    let shl = g.add(Operator::Word32Shl, &[and, c16]);
    g.add(Operator::Return, &[shl]);

    let seq = run(&g);
    // The mask is shifted out entirely, so only the shift survives.
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Shl32]);
    let shl = &seq.instructions()[1];
    assert_eq!(constant_of(&seq, shl.input(1)), Constant::Int32(16));
}

#[test]
fn narrow_mask_under_shift_is_kept() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let mask = g.add(Operator::Int32Constant(0xFF), &[]);
    let and = g.add(Operator::Word32And, &[p0, mask]);
    let c4 = g.add(Operator::Int32Constant(4), &[]);
    let shl = g.add(Operator::Word32Shl, &[and, c4]);
    g.add(Operator::Return, &[shl]);

    let seq = run(&g);
    // 4 + 8 < 32: the masked bits survive the shift, so both stay.
    assert_eq!(
        opcodes(&seq),
        [ArchOpcode::ArchRet, ArchOpcode::Shl32, ArchOpcode::And]
    );
}

#[test]
fn multiply_by_power_of_two_becomes_a_shift() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c8 = g.add(Operator::Int32Constant(8), &[]);
    let mul = g.add(Operator::Int32Mul, &[p0, c8]);
    g.add(Operator::Return, &[mul]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Shl32]);
    let shl = &seq.instructions()[1];
    assert_eq!(constant_of(&seq, shl.input(1)), Constant::Int32(3));
}

#[test]
fn multiply_by_seven_is_shift_and_subtract() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c7 = g.add(Operator::Int32Constant(7), &[]);
    let mul = g.add(Operator::Int32Mul, &[p0, c7]);
    g.add(Operator::Return, &[mul]);

    let seq = run(&g);
    assert_eq!(
        opcodes(&seq),
        [ArchOpcode::ArchRet, ArchOpcode::Shl32, ArchOpcode::Sub]
    );
    let shl = &seq.instructions()[1];
    assert_eq!(constant_of(&seq, shl.input(1)), Constant::Int32(3));
    // The subtract consumes the shifted temp and the original value.
    let sub = &seq.instructions()[2];
    assert_eq!(sub.input(0).vreg(), shl.output(0).vreg());
}

#[test]
fn xor_with_minus_one_uses_nor() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let m1 = g.add(Operator::Int32Constant(-1), &[]);
    let xor = g.add(Operator::Word32Xor, &[p0, m1]);
    g.add(Operator::Return, &[xor]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Nor]);
    let nor = &seq.instructions()[1];
    assert_eq!(constant_of(&seq, nor.input(1)), Constant::Int32(0));
}

#[test]
fn sar_of_shl_by_sixteen_is_a_sign_extension() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c16a = g.add(Operator::Int32Constant(16), &[]);
    let shl = g.add(Operator::Word32Shl, &[p0, c16a]);
    let c16b = g.add(Operator::Int32Constant(16), &[]);
    let sar = g.add(Operator::Word32Sar, &[shl, c16b]);
    g.add(Operator::Return, &[sar]);

    let seq = run(&g);
    assert_eq!(
        opcodes(&seq),
        [ArchOpcode::ArchRet, ArchOpcode::SignExtendShort]
    );
}

#[test]
fn double_negation_folds_into_branch_polarity() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c0a = g.add(Operator::Int32Constant(0), &[]);
    let eq1 = g.add(Operator::Word32Equal, &[p0, c0a]);
    let c0b = g.add(Operator::Int32Constant(0), &[]);
    let eq2 = g.add(Operator::Word32Equal, &[eq1, c0b]);
    let on_true = Block::from_u32(1);
    let on_false = Block::from_u32(2);
    g.add(Operator::Branch { on_true, on_false }, &[eq2]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::CmpZero]);
    // Two negations cancel: the branch polarity is unchanged.
    assert_eq!(
        *seq.instructions()[0].flags(),
        FlagsContinuation::for_branch(FlagsCondition::NotEqual, on_true, on_false)
    );
}

#[test]
fn compare_zero_negation_law() {
    // Branching on `x == 0` is the same instruction as branching on `x`
    // with the polarity flipped.
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c0 = g.add(Operator::Int32Constant(0), &[]);
    let eq = g.add(Operator::Word32Equal, &[p0, c0]);
    let on_true = Block::from_u32(1);
    let on_false = Block::from_u32(2);
    let branch = g.add(Operator::Branch { on_true, on_false }, &[eq]);

    let folded = {
        let mut frame = Frame::new();
        let mut selector = InstructionSelector::new(
            &g,
            &mut frame,
            Flags::default(),
            riscv_settings::Flags::default(),
            RootsTable::new(),
        );
        let mut cont =
            FlagsContinuation::for_branch(FlagsCondition::NotEqual, on_true, on_false);
        selector.visit_word_compare_zero(branch, eq, &mut cont);
        selector.finish()
    };
    let negated = {
        let mut frame = Frame::new();
        let mut selector = InstructionSelector::new(
            &g,
            &mut frame,
            Flags::default(),
            riscv_settings::Flags::default(),
            RootsTable::new(),
        );
        let mut cont =
            FlagsContinuation::for_branch(FlagsCondition::NotEqual, on_true, on_false);
        cont.negate();
        selector.visit_word_compare_zero(branch, p0, &mut cont);
        selector.finish()
    };
    assert_eq!(folded.instructions(), negated.instructions());
}

#[test]
fn overflow_branch_fuses_into_one_instruction() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let p1 = g.add(Operator::Parameter(1), &[]);
    let add = g.add(Operator::Int32AddWithOverflow, &[p0, p1]);
    let ovf = g.add(Operator::Projection(1), &[add]);
    let on_true = Block::from_u32(1);
    let on_false = Block::from_u32(2);
    g.add(Operator::Branch { on_true, on_false }, &[ovf]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::AddOvf]);
    assert_eq!(
        *seq.instructions()[0].flags(),
        FlagsContinuation::for_branch(FlagsCondition::Overflow, on_true, on_false)
    );
}

#[test]
fn deoptimizing_binop_output_is_same_as_first() {
    use crate::ir::operators::{DeoptimizeParameters, DeoptimizeReason, FeedbackSource};
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let p1 = g.add(Operator::Parameter(1), &[]);
    let add = g.add(Operator::Int32AddWithOverflow, &[p0, p1]);
    let ovf = g.add(Operator::Projection(1), &[add]);
    let params = DeoptimizeParameters {
        reason: DeoptimizeReason::Overflow,
        feedback: FeedbackSource(0),
    };
    g.add(Operator::DeoptimizeIf(params), &[ovf]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::AddOvf]);
    let inst = &seq.instructions()[0];
    assert_eq!(
        inst.output(0).policy(),
        Some(UnallocatedPolicy::SameAsFirstInput)
    );
    assert!(matches!(
        *inst.flags(),
        FlagsContinuation::Deoptimize {
            condition: FlagsCondition::Overflow,
            ..
        }
    ));
}

#[test]
fn root_relative_load_uses_the_combined_delta() {
    let reference = ExternalReference(7);
    let mut roots = RootsTable::new();
    roots.define(reference, 0x100);

    let mut g = Graph::new();
    let base = g.add(Operator::ExternalConstant(reference), &[]);
    let index = g.add(Operator::Int32Constant(8), &[]);
    g.add(Operator::Load(word32_load()), &[base, index]);

    let seq = run_with(&g, Flags::default(), roots);
    assert_eq!(opcodes(&seq), [ArchOpcode::Lw]);
    let load = &seq.instructions()[0];
    assert_eq!(load.code().addressing_mode(), AddressingMode::RootImm);
    assert_eq!(constant_of(&seq, load.input(0)), Constant::Int32(0x108));
}

#[test]
fn unresolved_external_base_falls_back_to_base_offset() {
    let mut g = Graph::new();
    let base = g.add(Operator::ExternalConstant(ExternalReference(7)), &[]);
    let index = g.add(Operator::Int32Constant(8), &[]);
    g.add(Operator::Load(word32_load()), &[base, index]);

    // No roots table entry: the reference is not addressable off the root
    // register.
    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::Lw]);
    assert_eq!(
        seq.instructions()[0].code().addressing_mode(),
        AddressingMode::BaseImm
    );
}

#[test]
fn load_with_large_index_materializes_the_address() {
    let mut g = Graph::new();
    let base = g.add(Operator::Parameter(0), &[]);
    let index = g.add(Operator::Parameter(1), &[]);
    g.add(Operator::Load(word32_load()), &[base, index]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::Add, ArchOpcode::Lw]);
    let load = &seq.instructions()[1];
    assert_eq!(load.code().addressing_mode(), AddressingMode::BaseImm);
    assert_eq!(constant_of(&seq, load.input(1)), Constant::Int32(0));
}

#[test]
fn write_barrier_store_uses_unique_registers() {
    let mut g = Graph::new();
    let base = g.add(Operator::Parameter(0), &[]);
    let index = g.add(Operator::Parameter(1), &[]);
    let value = g.add(Operator::Parameter(2), &[]);
    let rep = StoreRepresentation {
        rep: MachineRepresentation::TaggedPointer,
        write_barrier_kind: WriteBarrierKind::FullWriteBarrier,
    };
    g.add(Operator::Store(rep), &[base, index, value]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchStoreWithWriteBarrier]);
    let store = &seq.instructions()[0];
    for input in store.inputs() {
        assert_eq!(input.policy(), Some(UnallocatedPolicy::UniqueRegister));
    }
    assert_eq!(store.temps().len(), 2);
    // Misc carries the record-write mode for a full barrier.
    assert_eq!(store.code().misc(), 3);
}

#[test]
fn disabled_write_barriers_store_plainly() {
    let mut g = Graph::new();
    let base = g.add(Operator::Parameter(0), &[]);
    let index = g.add(Operator::Int32Constant(4), &[]);
    let value = g.add(Operator::Int32Constant(0), &[]);
    let rep = StoreRepresentation {
        rep: MachineRepresentation::TaggedPointer,
        write_barrier_kind: WriteBarrierKind::FullWriteBarrier,
    };
    g.add(Operator::Store(rep), &[base, index, value]);

    let flags = Flags::new(Builder::new().disable_write_barriers(true));
    let seq = run_with(&g, flags, RootsTable::new());
    assert_eq!(opcodes(&seq), [ArchOpcode::Sw]);
    let store = &seq.instructions()[0];
    // A zero value is materialized through the zero register.
    assert_eq!(constant_of(&seq, store.input(2)), Constant::Int32(0));
}

fn switch_graph(case_values: std::ops::RangeInclusive<i32>) -> (Graph, SwitchInfo) {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let cases: Vec<CaseInfo> = case_values
        .clone()
        .enumerate()
        .map(|(i, value)| CaseInfo {
            value,
            branch: Block::from_u32(i as u32 + 1),
        })
        .collect();
    let sw = SwitchInfo {
        min_value: *case_values.start(),
        max_value: *case_values.end(),
        cases,
        default_branch: Block::from_u32(0),
    };
    g.add(Operator::Switch(Box::new(sw.clone())), &[p0]);
    (g, sw)
}

#[test]
fn dense_switch_uses_a_jump_table() {
    // Six dense cases: table cost 10+2*6+9 = 31 <= lookup cost 2+2*6+3*6 =
    // 32.
    let (g, _) = switch_graph(0..=5);
    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchTableSwitch]);
}

#[test]
fn small_switch_uses_binary_search() {
    // Five cases tip the cost model the other way (29 > 27).
    let (g, _) = switch_graph(0..=4);
    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchBinarySearchSwitch]);
}

#[test]
fn rebased_jump_table_subtracts_the_minimum() {
    let (g, _) = switch_graph(5..=10);
    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::Sub, ArchOpcode::ArchTableSwitch]);
    let sub = &seq.instructions()[0];
    assert_eq!(constant_of(&seq, sub.input(1)), Constant::Int32(5));
}

#[test]
fn jump_tables_can_be_disabled() {
    let (g, _) = switch_graph(0..=5);
    let flags = Flags::new(Builder::new().enable_jump_tables(false));
    let seq = run_with(&g, flags, RootsTable::new());
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchBinarySearchSwitch]);
}

#[test]
fn atomic_binop_shape() {
    let mut g = Graph::new();
    let base = g.add(Operator::Parameter(0), &[]);
    let index = g.add(Operator::Parameter(1), &[]);
    let value = g.add(Operator::Parameter(2), &[]);
    g.add(
        Operator::Word32AtomicAdd(MachineType::Int32),
        &[base, index, value],
    );

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::AtomicAddWord32]);
    let inst = &seq.instructions()[0];
    for input in inst.inputs() {
        assert_eq!(input.policy(), Some(UnallocatedPolicy::UniqueRegister));
    }
    assert_eq!(inst.output(0).policy(), Some(UnallocatedPolicy::UniqueRegister));
    // LL/SC loop scratch: status, result, and masking temps.
    assert_eq!(inst.temps().len(), 4);
    assert_eq!(inst.code().addressing_mode(), AddressingMode::BaseImm);
}

#[test]
fn pair_shift_with_unused_high_half_takes_a_temp() {
    let mut g = Graph::new();
    let low = g.add(Operator::Parameter(0), &[]);
    let high = g.add(Operator::Parameter(1), &[]);
    let shift = g.add(Operator::Int32Constant(8), &[]);
    let pair = g.add(Operator::Word32PairShl, &[low, high, shift]);
    g.add(Operator::Return, &[pair]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::ShlPair]);
    let inst = &seq.instructions()[1];
    assert_eq!(inst.outputs().len(), 1);
    assert_eq!(inst.temps().len(), 1);
    assert_eq!(constant_of(&seq, inst.input(2)), Constant::Int32(8));
}

#[test]
fn pair_add_without_high_half_degrades_to_add() {
    let mut g = Graph::new();
    let a_low = g.add(Operator::Parameter(0), &[]);
    let a_high = g.add(Operator::Parameter(1), &[]);
    let b_low = g.add(Operator::Parameter(2), &[]);
    let b_high = g.add(Operator::Parameter(3), &[]);
    let pair = g.add(Operator::Int32PairAdd, &[a_low, a_high, b_low, b_high]);
    g.add(Operator::Return, &[pair]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::Add]);
    assert_eq!(
        seq.instructions()[1].output(0).policy(),
        Some(UnallocatedPolicy::SameAsFirstInput)
    );
}

#[test]
fn float_less_than_uses_unsigned_condition() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let p1 = g.add(Operator::Parameter(1), &[]);
    let lt = g.add(Operator::Float64LessThan, &[p0, p1]);
    g.add(Operator::Return, &[lt]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::CmpD]);
    let cmp = &seq.instructions()[1];
    assert!(matches!(
        *cmp.flags(),
        FlagsContinuation::Set {
            condition: FlagsCondition::UnsignedLessThan,
            ..
        }
    ));
    // The boolean is materialized on the compare itself.
    assert_eq!(cmp.outputs().len(), 1);
}

#[test]
fn out_of_range_shift_amount_stays_in_a_register() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c40 = g.add(Operator::Int32Constant(40), &[]);
    let shl = g.add(Operator::Word32Shl, &[p0, c40]);
    g.add(Operator::Return, &[shl]);

    let seq = run(&g);
    let shl = &seq.instructions()[1];
    assert!(shl.input(1).is_unallocated());
}

#[test]
fn stack_slot_allocates_from_the_frame() {
    let mut g = Graph::new();
    let slot = g.add(
        Operator::StackSlot(StackSlotRepresentation {
            size: 8,
            alignment: 8,
        }),
        &[],
    );
    g.add(Operator::Return, &[slot]);

    let seq = run(&g);
    assert_eq!(opcodes(&seq), [ArchOpcode::ArchRet, ArchOpcode::ArchStackSlot]);
    let inst = &seq.instructions()[1];
    assert_eq!(constant_of(&seq, inst.input(0)), Constant::Int32(1));
    assert_eq!(constant_of(&seq, inst.input(1)), Constant::Int32(8));
}

#[test]
fn unsupported_operator_fails_selection() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let rol = g.add(Operator::Word32Rol, &[p0]);
    g.add(Operator::Return, &[rol]);

    let mut frame = Frame::new();
    let mut selector = InstructionSelector::new(
        &g,
        &mut frame,
        Flags::default(),
        riscv_settings::Flags::default(),
        RootsTable::new(),
    );
    let mut order: Vec<Node> = g.nodes().collect();
    order.reverse();
    let err = selector.select(&order).unwrap_err();
    assert!(matches!(err, crate::CodegenError::Unsupported(_)));
}

#[test]
fn rejected_representation_fails_selection() {
    let mut g = Graph::new();
    let base = g.add(Operator::Parameter(0), &[]);
    let index = g.add(Operator::Int32Constant(0), &[]);
    g.add(
        Operator::Load(LoadRepresentation::new(
            MachineRepresentation::Word64,
            false,
        )),
        &[base, index],
    );

    let mut frame = Frame::new();
    let mut selector = InstructionSelector::new(
        &g,
        &mut frame,
        Flags::default(),
        riscv_settings::Flags::default(),
        RootsTable::new(),
    );
    let mut order: Vec<Node> = g.nodes().collect();
    order.reverse();
    let err = selector.select(&order).unwrap_err();
    assert!(matches!(
        err,
        crate::CodegenError::UnsupportedRepresentation(_)
    ));
}

#[test]
fn selection_is_deterministic() {
    let mut g = Graph::new();
    let p0 = g.add(Operator::Parameter(0), &[]);
    let c5 = g.add(Operator::Int32Constant(5), &[]);
    let add = g.add(Operator::Int32Add, &[p0, c5]);
    let c7 = g.add(Operator::Int32Constant(7), &[]);
    let mul = g.add(Operator::Int32Mul, &[add, c7]);
    g.add(Operator::Return, &[mul]);

    let first = run(&g);
    let second = run(&g);
    assert_eq!(first.instructions(), second.instructions());
    assert_eq!(
        first.constants().collect::<Vec<_>>(),
        second.constants().collect::<Vec<_>>()
    );
}
