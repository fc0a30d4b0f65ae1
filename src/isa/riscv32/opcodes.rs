//! The RISC-V 32 architecture opcode space and the packed instruction code.
//!
//! An [`InstructionCode`] is a 32-bit word: the architecture opcode in the
//! low bits, then non-overlapping slices for the addressing mode, the atomic
//! access width, and an opcode-private misc field. Arch-generic opcodes
//! (calls, switches, write barriers, the generic atomics) share the space
//! with the target ones.

use core::fmt;

use crate::isa::riscv32::imms::{Imm12, UImm5};

macro_rules! arch_opcodes {
    ($($opcode:ident,)+) => {
        /// Architecture opcode of an emitted instruction.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum ArchOpcode {
            $($opcode,)+
        }

        impl ArchOpcode {
            const ALL: &'static [ArchOpcode] = &[$(ArchOpcode::$opcode,)+];

            fn from_bits(bits: u16) -> ArchOpcode {
                Self::ALL[bits as usize]
            }

            fn bits(self) -> u16 {
                self as u16
            }
        }
    };
}

arch_opcodes! {
    // Arch-generic.
    ArchStackSlot,
    ArchAbortCSADcheck,
    ArchStoreWithWriteBarrier,
    ArchPrepareCallCFunction,
    ArchCallCFunction,
    ArchCallCodeObject,
    ArchTableSwitch,
    ArchBinarySearchSwitch,
    ArchJmp,
    ArchRet,
    ArchStackPointerGreaterThan,
    ArchTruncateDoubleToI,
    Ieee754Float64Atan2,
    Ieee754Float64Pow,
    Ieee754Float64Sin,
    Ieee754Float64Cos,
    Ieee754Float64Exp,
    Ieee754Float64Log,

    // Arch-generic atomics.
    AtomicLoadInt8,
    AtomicLoadUint8,
    AtomicLoadInt16,
    AtomicLoadUint16,
    AtomicLoadWord32,
    AtomicStoreWord8,
    AtomicStoreWord16,
    AtomicStoreWord32,
    AtomicExchangeInt8,
    AtomicExchangeUint8,
    AtomicExchangeInt16,
    AtomicExchangeUint16,
    AtomicExchangeWord32,
    AtomicCompareExchangeInt8,
    AtomicCompareExchangeUint8,
    AtomicCompareExchangeInt16,
    AtomicCompareExchangeUint16,
    AtomicCompareExchangeWord32,
    AtomicAddInt8,
    AtomicAddUint8,
    AtomicAddInt16,
    AtomicAddUint16,
    AtomicAddWord32,
    AtomicSubInt8,
    AtomicSubUint8,
    AtomicSubInt16,
    AtomicSubUint16,
    AtomicSubWord32,
    AtomicAndInt8,
    AtomicAndUint8,
    AtomicAndInt16,
    AtomicAndUint16,
    AtomicAndWord32,
    AtomicOrInt8,
    AtomicOrUint8,
    AtomicOrInt16,
    AtomicOrUint16,
    AtomicOrWord32,
    AtomicXorInt8,
    AtomicXorUint8,
    AtomicXorInt16,
    AtomicXorUint16,
    AtomicXorWord32,

    // Integer ALU.
    Add,
    Sub,
    Mul32,
    MulHigh32,
    MulHighU32,
    Div32,
    DivU32,
    Mod32,
    ModU32,
    AddOvf,
    SubOvf,
    MulOvf32,
    And,
    Or,
    Xor,
    Nor,
    Shl32,
    Shr32,
    Sar32,
    Ror32,
    Clz32,
    Ctz32,
    Popcnt32,
    ByteSwap32,
    SignExtendByte,
    SignExtendShort,

    // Compares.
    Cmp,
    CmpZero,
    Tst,
    CmpS,
    CmpD,

    // Memory.
    Lb,
    Lbu,
    Lh,
    Lhu,
    Lw,
    Sb,
    Sh,
    Sw,
    LoadFloat,
    StoreFloat,
    LoadDouble,
    StoreDouble,
    Ulh,
    Ulhu,
    Ulw,
    Ush,
    Usw,
    ULoadFloat,
    UStoreFloat,
    ULoadDouble,
    UStoreDouble,
    RvvLd,
    RvvSt,

    // Stack and fences.
    Sync,
    StoreToStackSlot,
    StackClaim,
    Peek,

    // Float arithmetic.
    AddS,
    SubS,
    MulS,
    DivS,
    AbsS,
    NegS,
    SqrtS,
    AddD,
    SubD,
    MulD,
    DivD,
    ModD,
    AbsD,
    NegD,
    SqrtD,
    Float32Max,
    Float32Min,
    Float64Max,
    Float64Min,
    Float32RoundDown,
    Float32RoundUp,
    Float32RoundTruncate,
    Float32RoundTiesEven,

    // Conversions.
    CvtDS,
    CvtSD,
    CvtSW,
    CvtSUw,
    CvtDW,
    CvtDUw,
    TruncWS,
    TruncUwS,
    TruncWD,
    TruncUwD,
    BitcastFloat32ToInt32,
    BitcastInt32ToFloat32,
    Float64ExtractLowWord32,
    Float64ExtractHighWord32,
    Float64InsertLowWord32,
    Float64InsertHighWord32,
    Float64SilenceNaN,

    // Pair operations.
    AddPair,
    SubPair,
    MulPair,
    ShlPair,
    ShrPair,
    SarPair,
    Word32AtomicPairLoad,
    Word32AtomicPairStore,

    // SIMD splats and lane accesses.
    F64x2Splat,
    F32x4Splat,
    I64x2Splat,
    I32x4Splat,
    I16x8Splat,
    I8x16Splat,
    F64x2ExtractLane,
    F32x4ExtractLane,
    I64x2ExtractLane,
    I32x4ExtractLane,
    I16x8ExtractLaneU,
    I16x8ExtractLaneS,
    I8x16ExtractLaneU,
    I8x16ExtractLaneS,
    F64x2ReplaceLane,
    F32x4ReplaceLane,
    I64x2ReplaceLane,
    I32x4ReplaceLane,
    I16x8ReplaceLane,
    I8x16ReplaceLane,

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
    S128AllOnes,
    S128Const,
    S128Select,
    F64x2Qfma,
    F64x2Qfms,
    F32x4Qfma,
    F32x4Qfms,
    F32x4Pmin,
    F32x4Pmax,
    F64x2Pmin,
    F64x2Pmax,
    I8x16Shuffle,
    Vrgather,
    Vslidedown,
    Vwmul,
    Vwmulu,
    Vwadd,
    Vwaddu,
    Vcompress,
    VaddVv,
    S128LoadSplat,
    S128Load64ExtendS,
    S128Load64ExtendU,
    S128Load32Zero,
    S128Load64Zero,
    S128LoadLane,
    S128StoreLane,
}

/// How the target encodes the effective address of a memory operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    /// No memory operand.
    None,
    /// Base register plus immediate offset.
    BaseImm,
    /// Base register plus index register.
    BaseReg,
    /// Immediate offset from the VM's root register.
    RootImm,
}

impl AddressingMode {
    fn encode(self) -> u32 {
        match self {
            AddressingMode::None => 0,
            AddressingMode::BaseImm => 1,
            AddressingMode::BaseReg => 2,
            AddressingMode::RootImm => 3,
        }
    }

    fn decode(bits: u32) -> Self {
        match bits {
            0 => AddressingMode::None,
            1 => AddressingMode::BaseImm,
            2 => AddressingMode::BaseReg,
            3 => AddressingMode::RootImm,
            _ => unreachable!(),
        }
    }
}

/// Access width of an atomic operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomicWidth {
    Word32,
    /// Present only for the packing contract; this target never emits it.
    Word64,
}

const OPCODE_BITS: u32 = 9;
const MODE_BITS: u32 = 2;
const MODE_SHIFT: u32 = OPCODE_BITS;
const WIDTH_SHIFT: u32 = MODE_SHIFT + MODE_BITS;
const MISC_SHIFT: u32 = WIDTH_SHIFT + 1;
const MISC_BITS: u32 = 32 - MISC_SHIFT;

/// The bit-packed opcode word of an instruction.
///
/// Layout, low to high: opcode (9 bits), addressing mode (2 bits), atomic
/// width (1 bit), misc (20 bits).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InstructionCode(u32);

impl InstructionCode {
    pub fn new(opcode: ArchOpcode) -> Self {
        Self(opcode.bits() as u32)
    }

    pub fn with_addressing_mode(self, mode: AddressingMode) -> Self {
        debug_assert_eq!(self.addressing_mode(), AddressingMode::None);
        Self(self.0 | mode.encode() << MODE_SHIFT)
    }

    pub fn with_atomic_width(self, width: AtomicWidth) -> Self {
        let bit = match width {
            AtomicWidth::Word32 => 0,
            AtomicWidth::Word64 => 1,
        };
        Self(self.0 | bit << WIDTH_SHIFT)
    }

    pub fn with_misc(self, misc: u32) -> Self {
        debug_assert!(misc < (1 << MISC_BITS));
        Self(self.0 | misc << MISC_SHIFT)
    }

    pub fn arch_opcode(self) -> ArchOpcode {
        ArchOpcode::from_bits((self.0 & ((1 << OPCODE_BITS) - 1)) as u16)
    }

    pub fn addressing_mode(self) -> AddressingMode {
        AddressingMode::decode(self.0 >> MODE_SHIFT & ((1 << MODE_BITS) - 1))
    }

    pub fn atomic_width(self) -> AtomicWidth {
        if self.0 >> WIDTH_SHIFT & 1 == 0 {
            AtomicWidth::Word32
        } else {
            AtomicWidth::Word64
        }
    }

    pub fn misc(self) -> u32 {
        self.0 >> MISC_SHIFT
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<ArchOpcode> for InstructionCode {
    fn from(opcode: ArchOpcode) -> Self {
        InstructionCode::new(opcode)
    }
}

impl fmt::Debug for InstructionCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?}|{:?}|misc={}",
            self.arch_opcode(),
            self.addressing_mode(),
            self.misc()
        )
    }
}

/// Whether `value` fits the immediate field of the opcode's encoding class.
pub fn immediate_fits(code: InstructionCode, value: i64) -> bool {
    use ArchOpcode::*;
    match code.arch_opcode() {
        Shl32 | Sar32 | Shr32 => UImm5::maybe_from_i64(value).is_some(),
        Add | And | Or | Tst | Xor => Imm12::maybe_from_i64(value).is_some(),
        Lb | Lbu | Sb | Lh | Lhu | Sh | Lw | Sw | LoadFloat | StoreFloat | LoadDouble
        | StoreDouble => i32::try_from(value).is_ok(),
        _ => Imm12::maybe_from_i64(value).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_packing_round_trips() {
        let code = InstructionCode::new(ArchOpcode::Lw)
            .with_addressing_mode(AddressingMode::RootImm)
            .with_atomic_width(AtomicWidth::Word32)
            .with_misc(0x1234);
        assert_eq!(code.arch_opcode(), ArchOpcode::Lw);
        assert_eq!(code.addressing_mode(), AddressingMode::RootImm);
        assert_eq!(code.atomic_width(), AtomicWidth::Word32);
        assert_eq!(code.misc(), 0x1234);
    }

    #[test]
    fn opcode_bits_round_trip_across_the_space() {
        for &op in ArchOpcode::ALL {
            assert_eq!(ArchOpcode::from_bits(op.bits()), op);
        }
        // The opcode field must be wide enough for the whole space.
        assert!(ArchOpcode::ALL.len() <= 1 << OPCODE_BITS);
    }

    #[test]
    fn immediate_ranges_by_opcode_class() {
        let shifts = InstructionCode::new(ArchOpcode::Shl32);
        assert!(immediate_fits(shifts, 31));
        assert!(!immediate_fits(shifts, 32));
        assert!(!immediate_fits(shifts, -1));

        let alu = InstructionCode::new(ArchOpcode::Add);
        assert!(immediate_fits(alu, 2047));
        assert!(immediate_fits(alu, -2048));
        assert!(!immediate_fits(alu, 2048));

        let mem = InstructionCode::new(ArchOpcode::Lw);
        assert!(immediate_fits(mem, i64::from(i32::MAX)));
        assert!(!immediate_fits(mem, i64::from(i32::MAX) + 1));

        // Anything else defaults to the 12-bit ALU field.
        let other = InstructionCode::new(ArchOpcode::Ulw);
        assert!(immediate_fits(other, 100));
        assert!(!immediate_fits(other, 5000));
    }
}
