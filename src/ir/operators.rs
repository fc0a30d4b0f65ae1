//! The mid-IR operator vocabulary and the payload types operators carry.
//!
//! Operators are a closed sum. Parameters (constant values, machine
//! representations, lane indices, switch shapes) ride inline on the variant
//! rather than in a side table, so a selection rule can destructure
//! everything it needs from the node's operator alone.

use crate::ir::Block;

/// How a value is represented in a machine word (or vector register).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineRepresentation {
    None,
    Bit,
    Word8,
    Word16,
    Word32,
    Word64,
    Float32,
    Float64,
    Simd128,
    TaggedSigned,
    TaggedPointer,
    Tagged,
    CompressedPointer,
    Compressed,
    SandboxedPointer,
    MapWord,
}

impl MachineRepresentation {
    /// Whether a store of this representation may need a write barrier.
    pub fn can_be_tagged_pointer(self) -> bool {
        matches!(
            self,
            MachineRepresentation::Tagged
                | MachineRepresentation::TaggedPointer
                | MachineRepresentation::TaggedSigned
        )
    }
}

/// A machine representation together with its signedness, as used by loads
/// and sub-word atomics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
}

/// What a load produces: a representation plus whether sub-word values are
/// zero- or sign-extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadRepresentation {
    pub rep: MachineRepresentation,
    pub unsigned: bool,
}

impl LoadRepresentation {
    pub fn new(rep: MachineRepresentation, unsigned: bool) -> Self {
        Self { rep, unsigned }
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }
}

/// The write-barrier obligation attached to a store by earlier phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteBarrierKind {
    NoWriteBarrier,
    AssertNoWriteBarrier,
    MapWriteBarrier,
    PointerWriteBarrier,
    EphemeronKeyWriteBarrier,
    FullWriteBarrier,
}

/// The record-write mode handed to the write-barrier stub, derived from
/// [`WriteBarrierKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordWriteMode {
    ValueIsMap,
    ValueIsPointer,
    ValueIsEphemeronKey,
    ValueIsAny,
}

impl RecordWriteMode {
    pub fn from_write_barrier_kind(kind: WriteBarrierKind) -> Self {
        match kind {
            WriteBarrierKind::MapWriteBarrier => RecordWriteMode::ValueIsMap,
            WriteBarrierKind::PointerWriteBarrier => RecordWriteMode::ValueIsPointer,
            WriteBarrierKind::EphemeronKeyWriteBarrier => RecordWriteMode::ValueIsEphemeronKey,
            WriteBarrierKind::FullWriteBarrier => RecordWriteMode::ValueIsAny,
            WriteBarrierKind::NoWriteBarrier | WriteBarrierKind::AssertNoWriteBarrier => {
                unreachable!("no record-write mode for {:?}", kind)
            }
        }
    }

    pub fn encode(self) -> u32 {
        match self {
            RecordWriteMode::ValueIsMap => 0,
            RecordWriteMode::ValueIsPointer => 1,
            RecordWriteMode::ValueIsEphemeronKey => 2,
            RecordWriteMode::ValueIsAny => 3,
        }
    }
}

/// What a store writes and which barrier it owes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreRepresentation {
    pub rep: MachineRepresentation,
    pub write_barrier_kind: WriteBarrierKind,
}

/// Shape of a stack slot requested by a `StackSlot` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackSlotRepresentation {
    pub size: u32,
    pub alignment: u32,
}

/// Overflow behavior of a float-to-int truncation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TruncateKind {
    ArchitectureDefault,
    SetOverflowToMin,
}

/// Which kind of stack check a `StackPointerGreaterThan` node implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackCheckKind {
    JsFunctionEntry,
    JsIterationBody,
    CodeStubAssembler,
    Wasm,
}

impl StackCheckKind {
    pub fn encode(self) -> u32 {
        match self {
            StackCheckKind::JsFunctionEntry => 0,
            StackCheckKind::JsIterationBody => 1,
            StackCheckKind::CodeStubAssembler => 2,
            StackCheckKind::Wasm => 3,
        }
    }
}

/// Why a deoptimization exit was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeoptimizeReason {
    Overflow,
    DivisionByZero,
    Hole,
    LostPrecision,
    MinusZero,
    NotAHeapNumber,
    OutOfBounds,
    WrongInstanceType,
}

/// Opaque reference to the feedback slot blamed for a deoptimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackSource(pub u32);

/// Parameters of a conditional deoptimization exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeoptimizeParameters {
    pub reason: DeoptimizeReason,
    pub feedback: FeedbackSource,
}

/// A code identifying the cause of a conditional trap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCode {
    StackOverflow,
    HeapOutOfBounds,
    IndirectCallToNull,
    IntegerOverflow,
    IntegerDivisionByZero,
    BadConversionToInteger,
    UnreachableCodeReached,
    TableOutOfBounds,
}

/// An index into the host VM's external-reference table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExternalReference(pub u32);

/// One `case` of a `Switch` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaseInfo {
    pub value: i32,
    pub branch: Block,
}

/// Shape of a `Switch` node: its cases, value bounds, and default target.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchInfo {
    pub cases: Vec<CaseInfo>,
    pub min_value: i32,
    pub max_value: i32,
    pub default_branch: Block,
}

impl SwitchInfo {
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn value_range(&self) -> u64 {
        1 + (i64::from(self.max_value) - i64::from(self.min_value)) as u64
    }
}

/// The widening/splatting shape of a SIMD load-transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadTransformation {
    S128Load8Splat,
    S128Load16Splat,
    S128Load32Splat,
    S128Load64Splat,
    S128Load8x8S,
    S128Load8x8U,
    S128Load16x4S,
    S128Load16x4U,
    S128Load32x2S,
    S128Load32x2U,
    S128Load32Zero,
    S128Load64Zero,
}

/// Parameters of a SIMD load-lane or store-lane access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneParameters {
    pub rep: MachineRepresentation,
    pub laneidx: u8,
}

/// Which convention a call follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// A call to a C function with the native calling convention.
    CFunction,
    /// A call to generated code (JS or stub linkage).
    CodeObject,
}

/// Where the linkage places a parameter or return value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkageLocation {
    /// In a fixed register chosen by the calling convention.
    Register(regalloc2::PReg, MachineRepresentation),
    /// In the caller's frame, `slot` pointer-words into the argument area.
    CallerFrameSlot {
        slot: i32,
        rep: MachineRepresentation,
    },
}

impl LinkageLocation {
    pub fn is_caller_frame_slot(&self) -> bool {
        matches!(self, LinkageLocation::CallerFrameSlot { .. })
    }

    pub fn representation(&self) -> MachineRepresentation {
        match *self {
            LinkageLocation::Register(_, rep) => rep,
            LinkageLocation::CallerFrameSlot { rep, .. } => rep,
        }
    }

    /// Size of the value in pointer words.
    pub fn size_in_pointers(&self) -> i32 {
        match self.representation() {
            MachineRepresentation::Float64 | MachineRepresentation::Word64 => 2,
            _ => 1,
        }
    }
}

/// Everything the selector needs to know about a call site.
#[derive(Clone, Debug, PartialEq)]
pub struct CallDescriptor {
    pub kind: CallKind,
    /// Locations of the parameters, in argument order. The callee itself is
    /// input 0 of the call node and is not listed here.
    pub param_locations: Vec<LinkageLocation>,
    /// Locations of the results, in result order.
    pub return_locations: Vec<LinkageLocation>,
}

impl CallDescriptor {
    pub fn is_c_function_call(&self) -> bool {
        self.kind == CallKind::CFunction
    }

    pub fn parameter_count(&self) -> usize {
        self.param_locations.len()
    }

    /// Number of parameters passed on the stack.
    pub fn parameter_slot_count(&self) -> usize {
        self.param_locations
            .iter()
            .filter(|l| l.is_caller_frame_slot())
            .count()
    }
}

/// The operator kind of a mid-IR node, with its inline parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    // Leaves.
    Parameter(u32),
    Int32Constant(i32),
    Int64Constant(i64),
    Float32Constant(f32),
    Float64Constant(f64),
    ExternalConstant(ExternalReference),
    S128Constant([u8; 16]),
    /// Secondary output `index` of the input node.
    Projection(u32),

    // Word32 bitwise and shifts.
    Word32And,
    Word32Or,
    Word32Xor,
    Word32Shl,
    Word32Shr,
    Word32Sar,
    Word32Rol,
    Word32Ror,
    Word32Clz,
    Word32Ctz,
    Word32Popcnt,
    Word32ReverseBits,
    Word32ReverseBytes,
    Word64ReverseBytes,
    Simd128ReverseBytes,

    // Word32 arithmetic.
    Int32Add,
    Int32Sub,
    Int32Mul,
    Int32MulHigh,
    Uint32MulHigh,
    Int32Div,
    Uint32Div,
    Int32Mod,
    Uint32Mod,
    Int32AddWithOverflow,
    Int32SubWithOverflow,
    Int32MulWithOverflow,
    Int32AbsWithOverflow,
    Int64AbsWithOverflow,
    SignExtendWord8ToInt32,
    SignExtendWord16ToInt32,

    // Word32 comparisons.
    Word32Equal,
    Word64Equal,
    Int32LessThan,
    Int32LessThanOrEqual,
    Uint32LessThan,
    Uint32LessThanOrEqual,

    // 64-bit arithmetic on 32-bit halves.
    Int32PairAdd,
    Int32PairSub,
    Int32PairMul,
    Word32PairShl,
    Word32PairShr,
    Word32PairSar,

    // Conversions.
    ChangeFloat32ToFloat64,
    RoundInt32ToFloat32,
    RoundUint32ToFloat32,
    ChangeInt32ToFloat64,
    ChangeUint32ToFloat64,
    TruncateFloat32ToInt32(TruncateKind),
    TruncateFloat32ToUint32(TruncateKind),
    ChangeFloat64ToInt32,
    ChangeFloat64ToUint32,
    TruncateFloat64ToUint32,
    TruncateFloat64ToFloat32,
    TruncateFloat64ToWord32,
    RoundFloat64ToInt32,
    BitcastFloat32ToInt32,
    BitcastInt32ToFloat32,

    // Float32 arithmetic and comparisons.
    Float32Add,
    Float32Sub,
    Float32Mul,
    Float32Div,
    Float32Max,
    Float32Min,
    Float32Abs,
    Float32Sqrt,
    Float32Neg,
    Float32RoundDown,
    Float32RoundUp,
    Float32RoundTruncate,
    Float32RoundTiesEven,
    Float32Equal,
    Float32LessThan,
    Float32LessThanOrEqual,

    // Float64 arithmetic and comparisons.
    Float64Add,
    Float64Sub,
    Float64Mul,
    Float64Div,
    Float64Mod,
    Float64Max,
    Float64Min,
    Float64Abs,
    Float64Sqrt,
    Float64Neg,
    Float64RoundDown,
    Float64RoundUp,
    Float64RoundTruncate,
    Float64RoundTiesAway,
    Float64RoundTiesEven,
    Float64Equal,
    Float64LessThan,
    Float64LessThanOrEqual,
    Float64Atan2,
    Float64Pow,
    Float64Sin,
    Float64Cos,
    Float64Exp,
    Float64Log,
    Float64ExtractLowWord32,
    Float64ExtractHighWord32,
    Float64InsertLowWord32,
    Float64InsertHighWord32,
    Float64SilenceNaN,

    // Memory.
    Load(LoadRepresentation),
    Store(StoreRepresentation),
    UnalignedLoad(LoadRepresentation),
    UnalignedStore(MachineRepresentation),
    ProtectedLoad(LoadRepresentation),
    ProtectedStore(MachineRepresentation),
    StackSlot(StackSlotRepresentation),
    LoadTransform(LoadTransformation),
    LoadLane(LaneParameters),
    StoreLane(LaneParameters),

    // Control and VM glue consumed by this pass.
    Branch {
        on_true: Block,
        on_false: Block,
    },
    Goto(Block),
    Switch(Box<SwitchInfo>),
    DeoptimizeIf(DeoptimizeParameters),
    DeoptimizeUnless(DeoptimizeParameters),
    TrapIf(TrapCode),
    TrapUnless(TrapCode),
    StackPointerGreaterThan(StackCheckKind),
    AbortCSADcheck,
    MemoryBarrier,
    Call(Box<CallDescriptor>),
    /// Return from the function, with the (optional) value as input 0.
    Return,

    // Word32 atomics.
    Word32AtomicLoad(LoadRepresentation),
    Word32AtomicStore(MachineRepresentation),
    Word32AtomicExchange(MachineType),
    Word32AtomicCompareExchange(MachineType),
    Word32AtomicAdd(MachineType),
    Word32AtomicSub(MachineType),
    Word32AtomicAnd(MachineType),
    Word32AtomicOr(MachineType),
    Word32AtomicXor(MachineType),
    Word32AtomicPairLoad,
    Word32AtomicPairStore,
    Word32AtomicPairAdd,
    Word32AtomicPairSub,
    Word32AtomicPairAnd,
    Word32AtomicPairOr,
    Word32AtomicPairXor,
    Word32AtomicPairExchange,
    Word32AtomicPairCompareExchange,

    // SIMD splats and lane accesses.
    F64x2Splat,
    F32x4Splat,
    I64x2Splat,
    I32x4Splat,
    I16x8Splat,
    I8x16Splat,
    F64x2ExtractLane(u8),
    F32x4ExtractLane(u8),
    I64x2ExtractLane(u8),
    I32x4ExtractLane(u8),
    I16x8ExtractLaneU(u8),
    I16x8ExtractLaneS(u8),
    I8x16ExtractLaneU(u8),
    I8x16ExtractLaneS(u8),
    F64x2ReplaceLane(u8),
    F32x4ReplaceLane(u8),
    I64x2ReplaceLane(u8),
    I32x4ReplaceLane(u8),
    I16x8ReplaceLane(u8),
    I8x16ReplaceLane(u8),

    // SIMD unary.
    F64x2Abs,
    F64x2Neg,
    F64x2Sqrt,
    F64x2ConvertLowI32x4S,
    F64x2ConvertLowI32x4U,
    F64x2PromoteLowF32x4,
    F64x2Ceil,
    F64x2Floor,
    F64x2Trunc,
    F64x2NearestInt,
    I64x2Neg,
    I64x2Abs,
    I64x2BitMask,
    I64x2SConvertI32x4Low,
    I64x2SConvertI32x4High,
    I64x2UConvertI32x4Low,
    I64x2UConvertI32x4High,
    F32x4SConvertI32x4,
    F32x4UConvertI32x4,
    F32x4Abs,
    F32x4Neg,
    F32x4Sqrt,
    F32x4RecipApprox,
    F32x4RecipSqrtApprox,
    F32x4DemoteF64x2Zero,
    F32x4Ceil,
    F32x4Floor,
    F32x4Trunc,
    F32x4NearestInt,
    I32x4SConvertF32x4,
    I32x4UConvertF32x4,
    I32x4RelaxedTruncF32x4S,
    I32x4RelaxedTruncF32x4U,
    I32x4RelaxedTruncF64x2SZero,
    I32x4RelaxedTruncF64x2UZero,
    I32x4Neg,
    I32x4SConvertI16x8Low,
    I32x4SConvertI16x8High,
    I32x4UConvertI16x8Low,
    I32x4UConvertI16x8High,
    I32x4Abs,
    I32x4BitMask,
    I32x4TruncSatF64x2SZero,
    I32x4TruncSatF64x2UZero,
    I16x8Neg,
    I16x8SConvertI8x16Low,
    I16x8SConvertI8x16High,
    I16x8UConvertI8x16Low,
    I16x8UConvertI8x16High,
    I16x8Abs,
    I16x8BitMask,
    I8x16Neg,
    I8x16Abs,
    I8x16BitMask,
    I8x16Popcnt,
    S128Not,
    V128AnyTrue,
    I64x2AllTrue,
    I32x4AllTrue,
    I16x8AllTrue,
    I8x16AllTrue,

    // SIMD shifts.
    I64x2Shl,
    I64x2ShrS,
    I64x2ShrU,
    I32x4Shl,
    I32x4ShrS,
    I32x4ShrU,
    I16x8Shl,
    I16x8ShrS,
    I16x8ShrU,
    I8x16Shl,
    I8x16ShrS,
    I8x16ShrU,

    // SIMD binary.
    F64x2Add,
    F64x2Sub,
    F64x2Mul,
    F64x2Div,
    F64x2Min,
    F64x2Max,
    F64x2Eq,
    F64x2Ne,
    F64x2Lt,
    F64x2Le,
    F64x2RelaxedMin,
    F64x2RelaxedMax,
    I64x2Eq,
    I64x2Ne,
    I64x2GtS,
    I64x2GeS,
    I64x2Add,
    I64x2Sub,
    I64x2Mul,
    F32x4Add,
    F32x4Sub,
    F32x4Mul,
    F32x4Div,
    F32x4Max,
    F32x4Min,
    F32x4Eq,
    F32x4Ne,
    F32x4Lt,
    F32x4Le,
    F32x4RelaxedMin,
    F32x4RelaxedMax,
    I32x4Add,
    I32x4Sub,
    I32x4Mul,
    I32x4MaxS,
    I32x4MinS,
    I32x4MaxU,
    I32x4MinU,
    I32x4Eq,
    I32x4Ne,
    I32x4GtS,
    I32x4GeS,
    I32x4GtU,
    I32x4GeU,
    I16x8Add,
    I16x8AddSatS,
    I16x8AddSatU,
    I16x8Sub,
    I16x8SubSatS,
    I16x8SubSatU,
    I16x8Mul,
    I16x8MaxS,
    I16x8MinS,
    I16x8MaxU,
    I16x8MinU,
    I16x8Eq,
    I16x8Ne,
    I16x8GtS,
    I16x8GeS,
    I16x8GtU,
    I16x8GeU,
    I16x8RoundingAverageU,
    I16x8Q15MulRSatS,
    I16x8SConvertI32x4,
    I16x8UConvertI32x4,
    I8x16Add,
    I8x16AddSatS,
    I8x16AddSatU,
    I8x16Sub,
    I8x16SubSatS,
    I8x16SubSatU,
    I8x16MaxS,
    I8x16MinS,
    I8x16MaxU,
    I8x16MinU,
    I8x16Eq,
    I8x16Ne,
    I8x16GtS,
    I8x16GeS,
    I8x16GtU,
    I8x16GeU,
    I8x16RoundingAverageU,
    I8x16SConvertI16x8,
    I8x16UConvertI16x8,
    S128And,
    S128Or,
    S128Xor,
    S128AndNot,

    // SIMD misc.
    S128Zero,
    S128Select,
    I8x16RelaxedLaneSelect,
    I16x8RelaxedLaneSelect,
    I32x4RelaxedLaneSelect,
    I64x2RelaxedLaneSelect,
    F64x2Qfma,
    F64x2Qfms,
    F32x4Qfma,
    F32x4Qfms,
    I32x4DotI16x8S,
    I32x4ExtAddPairwiseI16x8S,
    I32x4ExtAddPairwiseI16x8U,
    I16x8ExtAddPairwiseI8x16S,
    I16x8ExtAddPairwiseI8x16U,
    I64x2ExtMulLowI32x4S,
    I64x2ExtMulHighI32x4S,
    I64x2ExtMulLowI32x4U,
    I64x2ExtMulHighI32x4U,
    I32x4ExtMulLowI16x8S,
    I32x4ExtMulHighI16x8S,
    I32x4ExtMulLowI16x8U,
    I32x4ExtMulHighI16x8U,
    I16x8ExtMulLowI8x16S,
    I16x8ExtMulHighI8x16S,
    I16x8ExtMulLowI8x16U,
    I16x8ExtMulHighI8x16U,
    F32x4Pmin,
    F32x4Pmax,
    F64x2Pmin,
    F64x2Pmax,
    I8x16Shuffle([u8; 16]),
    I8x16Swizzle,
}

impl Operator {
    /// Whether the node participates in the effect chain. Effectful nodes are
    /// always visited by the driver, even when no other node demands their
    /// value.
    pub fn has_effects(&self) -> bool {
        use Operator::*;
        matches!(
            self,
            Load(_)
                | Store(_)
                | UnalignedLoad(_)
                | UnalignedStore(_)
                | ProtectedLoad(_)
                | ProtectedStore(_)
                | LoadTransform(_)
                | LoadLane(_)
                | StoreLane(_)
                | Branch { .. }
                | Goto(_)
                | Switch(_)
                | DeoptimizeIf(_)
                | DeoptimizeUnless(_)
                | TrapIf(_)
                | TrapUnless(_)
                | AbortCSADcheck
                | MemoryBarrier
                | Call(_)
                | Return
                | Word32AtomicLoad(_)
                | Word32AtomicStore(_)
                | Word32AtomicExchange(_)
                | Word32AtomicCompareExchange(_)
                | Word32AtomicAdd(_)
                | Word32AtomicSub(_)
                | Word32AtomicAnd(_)
                | Word32AtomicOr(_)
                | Word32AtomicXor(_)
                | Word32AtomicPairLoad
                | Word32AtomicPairStore
                | Word32AtomicPairAdd
                | Word32AtomicPairSub
                | Word32AtomicPairAnd
                | Word32AtomicPairOr
                | Word32AtomicPairXor
                | Word32AtomicPairExchange
                | Word32AtomicPairCompareExchange
        )
    }
}
