//! SIMD lowering rules for the 128-bit vector unit.
//!
//! Most operations are table-driven one-to-one mappings onto vector
//! opcodes; the rest (extended multiplies, pairwise additions, shuffles,
//! lane memory accesses) expand into short fixed sequences carrying the
//! element width and group multiplier as immediates.

use crate::ir::matchers;
use crate::ir::operators::{LaneParameters, LoadTransformation, MachineRepresentation, Operator};
use crate::ir::Node;
use crate::isa::riscv32::opcodes::{AddressingMode, ArchOpcode, InstructionCode};
use crate::isa::riscv32::regs::{v16, v17, v30};
use crate::isa::riscv32::vector::{VSew, Vlmul, VLEN};
use crate::isel::InstructionSelector;
use crate::{unsupported, CodegenResult};

fn simd_rr_opcode(op: &Operator) -> Option<ArchOpcode> {
    use ArchOpcode as A;
    Some(match op {
        Operator::F64x2Splat => A::F64x2Splat,
        Operator::F32x4Splat => A::F32x4Splat,
        Operator::I64x2Splat => A::I64x2Splat,
        Operator::I32x4Splat => A::I32x4Splat,
        Operator::I16x8Splat => A::I16x8Splat,
        Operator::I8x16Splat => A::I8x16Splat,
        Operator::F64x2Abs => A::F64x2Abs,
        Operator::F64x2Neg => A::F64x2Neg,
        Operator::F64x2Sqrt => A::F64x2Sqrt,
        Operator::F64x2ConvertLowI32x4S => A::F64x2ConvertLowI32x4S,
        Operator::F64x2ConvertLowI32x4U => A::F64x2ConvertLowI32x4U,
        Operator::F64x2PromoteLowF32x4 => A::F64x2PromoteLowF32x4,
        Operator::F64x2Ceil => A::F64x2Ceil,
        Operator::F64x2Floor => A::F64x2Floor,
        Operator::F64x2Trunc => A::F64x2Trunc,
        Operator::F64x2NearestInt => A::F64x2NearestInt,
        Operator::I64x2Neg => A::I64x2Neg,
        Operator::I64x2Abs => A::I64x2Abs,
        Operator::I64x2BitMask => A::I64x2BitMask,
        Operator::I64x2SConvertI32x4Low => A::I64x2SConvertI32x4Low,
        Operator::I64x2SConvertI32x4High => A::I64x2SConvertI32x4High,
        Operator::I64x2UConvertI32x4Low => A::I64x2UConvertI32x4Low,
        Operator::I64x2UConvertI32x4High => A::I64x2UConvertI32x4High,
        Operator::F32x4SConvertI32x4 => A::F32x4SConvertI32x4,
        Operator::F32x4UConvertI32x4 => A::F32x4UConvertI32x4,
        Operator::F32x4Abs => A::F32x4Abs,
        Operator::F32x4Neg => A::F32x4Neg,
        Operator::F32x4Sqrt => A::F32x4Sqrt,
        Operator::F32x4RecipApprox => A::F32x4RecipApprox,
        Operator::F32x4RecipSqrtApprox => A::F32x4RecipSqrtApprox,
        Operator::F32x4DemoteF64x2Zero => A::F32x4DemoteF64x2Zero,
        Operator::F32x4Ceil => A::F32x4Ceil,
        Operator::F32x4Floor => A::F32x4Floor,
        Operator::F32x4Trunc => A::F32x4Trunc,
        Operator::F32x4NearestInt => A::F32x4NearestInt,
        Operator::I32x4SConvertF32x4 => A::I32x4SConvertF32x4,
        Operator::I32x4UConvertF32x4 => A::I32x4UConvertF32x4,
        // The relaxed truncations share the strict lowering.
        Operator::I32x4RelaxedTruncF32x4S => A::I32x4SConvertF32x4,
        Operator::I32x4RelaxedTruncF32x4U => A::I32x4UConvertF32x4,
        Operator::I32x4RelaxedTruncF64x2SZero => A::I32x4TruncSatF64x2SZero,
        Operator::I32x4RelaxedTruncF64x2UZero => A::I32x4TruncSatF64x2UZero,
        Operator::I32x4Neg => A::I32x4Neg,
        Operator::I32x4SConvertI16x8Low => A::I32x4SConvertI16x8Low,
        Operator::I32x4SConvertI16x8High => A::I32x4SConvertI16x8High,
        Operator::I32x4UConvertI16x8Low => A::I32x4UConvertI16x8Low,
        Operator::I32x4UConvertI16x8High => A::I32x4UConvertI16x8High,
        Operator::I32x4Abs => A::I32x4Abs,
        Operator::I32x4BitMask => A::I32x4BitMask,
        Operator::I32x4TruncSatF64x2SZero => A::I32x4TruncSatF64x2SZero,
        Operator::I32x4TruncSatF64x2UZero => A::I32x4TruncSatF64x2UZero,
        Operator::I16x8Neg => A::I16x8Neg,
        Operator::I16x8SConvertI8x16Low => A::I16x8SConvertI8x16Low,
        Operator::I16x8SConvertI8x16High => A::I16x8SConvertI8x16High,
        Operator::I16x8UConvertI8x16Low => A::I16x8UConvertI8x16Low,
        Operator::I16x8UConvertI8x16High => A::I16x8UConvertI8x16High,
        Operator::I16x8Abs => A::I16x8Abs,
        Operator::I16x8BitMask => A::I16x8BitMask,
        Operator::I8x16Neg => A::I8x16Neg,
        Operator::I8x16Abs => A::I8x16Abs,
        Operator::I8x16BitMask => A::I8x16BitMask,
        Operator::I8x16Popcnt => A::I8x16Popcnt,
        Operator::S128Not => A::S128Not,
        Operator::V128AnyTrue => A::V128AnyTrue,
        Operator::I64x2AllTrue => A::I64x2AllTrue,
        Operator::I32x4AllTrue => A::I32x4AllTrue,
        Operator::I16x8AllTrue => A::I16x8AllTrue,
        Operator::I8x16AllTrue => A::I8x16AllTrue,
        _ => return None,
    })
}

fn simd_binop_opcode(op: &Operator) -> Option<ArchOpcode> {
    use ArchOpcode as A;
    Some(match op {
        Operator::F64x2Add => A::F64x2Add,
        Operator::F64x2Sub => A::F64x2Sub,
        Operator::F64x2Mul => A::F64x2Mul,
        Operator::F64x2Div => A::F64x2Div,
        Operator::F64x2Min => A::F64x2Min,
        Operator::F64x2Max => A::F64x2Max,
        Operator::F64x2Eq => A::F64x2Eq,
        Operator::F64x2Ne => A::F64x2Ne,
        Operator::F64x2Lt => A::F64x2Lt,
        Operator::F64x2Le => A::F64x2Le,
        Operator::F64x2RelaxedMin => A::F64x2Min,
        Operator::F64x2RelaxedMax => A::F64x2Max,
        Operator::I64x2Eq => A::I64x2Eq,
        Operator::I64x2Ne => A::I64x2Ne,
        Operator::I64x2GtS => A::I64x2GtS,
        Operator::I64x2GeS => A::I64x2GeS,
        Operator::I64x2Add => A::I64x2Add,
        Operator::I64x2Sub => A::I64x2Sub,
        Operator::I64x2Mul => A::I64x2Mul,
        Operator::F32x4Add => A::F32x4Add,
        Operator::F32x4Sub => A::F32x4Sub,
        Operator::F32x4Mul => A::F32x4Mul,
        Operator::F32x4Div => A::F32x4Div,
        Operator::F32x4Max => A::F32x4Max,
        Operator::F32x4Min => A::F32x4Min,
        Operator::F32x4Eq => A::F32x4Eq,
        Operator::F32x4Ne => A::F32x4Ne,
        Operator::F32x4Lt => A::F32x4Lt,
        Operator::F32x4Le => A::F32x4Le,
        Operator::F32x4RelaxedMin => A::F32x4Min,
        Operator::F32x4RelaxedMax => A::F32x4Max,
        Operator::I32x4Add => A::I32x4Add,
        Operator::I32x4Sub => A::I32x4Sub,
        Operator::I32x4Mul => A::I32x4Mul,
        Operator::I32x4MaxS => A::I32x4MaxS,
        Operator::I32x4MinS => A::I32x4MinS,
        Operator::I32x4MaxU => A::I32x4MaxU,
        Operator::I32x4MinU => A::I32x4MinU,
        Operator::I32x4Eq => A::I32x4Eq,
        Operator::I32x4Ne => A::I32x4Ne,
        Operator::I32x4GtS => A::I32x4GtS,
        Operator::I32x4GeS => A::I32x4GeS,
        Operator::I32x4GtU => A::I32x4GtU,
        Operator::I32x4GeU => A::I32x4GeU,
        Operator::I16x8Add => A::I16x8Add,
        Operator::I16x8AddSatS => A::I16x8AddSatS,
        Operator::I16x8AddSatU => A::I16x8AddSatU,
        Operator::I16x8Sub => A::I16x8Sub,
        Operator::I16x8SubSatS => A::I16x8SubSatS,
        Operator::I16x8SubSatU => A::I16x8SubSatU,
        Operator::I16x8Mul => A::I16x8Mul,
        Operator::I16x8MaxS => A::I16x8MaxS,
        Operator::I16x8MinS => A::I16x8MinS,
        Operator::I16x8MaxU => A::I16x8MaxU,
        Operator::I16x8MinU => A::I16x8MinU,
        Operator::I16x8Eq => A::I16x8Eq,
        Operator::I16x8Ne => A::I16x8Ne,
        Operator::I16x8GtS => A::I16x8GtS,
        Operator::I16x8GeS => A::I16x8GeS,
        Operator::I16x8GtU => A::I16x8GtU,
        Operator::I16x8GeU => A::I16x8GeU,
        Operator::I16x8RoundingAverageU => A::I16x8RoundingAverageU,
        Operator::I16x8Q15MulRSatS => A::I16x8Q15MulRSatS,
        Operator::I16x8SConvertI32x4 => A::I16x8SConvertI32x4,
        Operator::I16x8UConvertI32x4 => A::I16x8UConvertI32x4,
        Operator::I8x16Add => A::I8x16Add,
        Operator::I8x16AddSatS => A::I8x16AddSatS,
        Operator::I8x16AddSatU => A::I8x16AddSatU,
        Operator::I8x16Sub => A::I8x16Sub,
        Operator::I8x16SubSatS => A::I8x16SubSatS,
        Operator::I8x16SubSatU => A::I8x16SubSatU,
        Operator::I8x16MaxS => A::I8x16MaxS,
        Operator::I8x16MinS => A::I8x16MinS,
        Operator::I8x16MaxU => A::I8x16MaxU,
        Operator::I8x16MinU => A::I8x16MinU,
        Operator::I8x16Eq => A::I8x16Eq,
        Operator::I8x16Ne => A::I8x16Ne,
        Operator::I8x16GtS => A::I8x16GtS,
        Operator::I8x16GeS => A::I8x16GeS,
        Operator::I8x16GtU => A::I8x16GtU,
        Operator::I8x16GeU => A::I8x16GeU,
        Operator::I8x16RoundingAverageU => A::I8x16RoundingAverageU,
        Operator::I8x16SConvertI16x8 => A::I8x16SConvertI16x8,
        Operator::I8x16UConvertI16x8 => A::I8x16UConvertI16x8,
        Operator::S128And => A::S128And,
        Operator::S128Or => A::S128Or,
        Operator::S128Xor => A::S128Xor,
        Operator::S128AndNot => A::S128AndNot,
        _ => return None,
    })
}

fn simd_shift_opcode(op: &Operator) -> Option<ArchOpcode> {
    use ArchOpcode as A;
    Some(match op {
        Operator::I64x2Shl => A::I64x2Shl,
        Operator::I64x2ShrS => A::I64x2ShrS,
        Operator::I64x2ShrU => A::I64x2ShrU,
        Operator::I32x4Shl => A::I32x4Shl,
        Operator::I32x4ShrS => A::I32x4ShrS,
        Operator::I32x4ShrU => A::I32x4ShrU,
        Operator::I16x8Shl => A::I16x8Shl,
        Operator::I16x8ShrS => A::I16x8ShrS,
        Operator::I16x8ShrU => A::I16x8ShrU,
        Operator::I8x16Shl => A::I8x16Shl,
        Operator::I8x16ShrS => A::I8x16ShrS,
        Operator::I8x16ShrU => A::I8x16ShrU,
        _ => return None,
    })
}

fn lane_sew(rep: MachineRepresentation) -> VSew {
    match rep {
        MachineRepresentation::Word8 => VSew::E8,
        MachineRepresentation::Word16 => VSew::E16,
        MachineRepresentation::Word32 => VSew::E32,
        MachineRepresentation::Word64 => VSew::E64,
        rep => unreachable!("no lane width for {:?}", rep),
    }
}

fn pack4_lanes(lanes: &[u8]) -> i32 {
    (u32::from(lanes[0])
        | u32::from(lanes[1]) << 8
        | u32::from(lanes[2]) << 16
        | u32::from(lanes[3]) << 24) as i32
}

impl InstructionSelector<'_> {
    pub(super) fn visit_simd(&mut self, node: Node, op: Operator) -> CodegenResult<()> {
        use ArchOpcode as A;
        if let Some(opcode) = simd_rr_opcode(&op) {
            self.visit_rr(opcode, node);
            return Ok(());
        }
        if let Some(opcode) = simd_binop_opcode(&op) {
            self.visit_rrr(opcode, node);
            return Ok(());
        }
        if let Some(opcode) = simd_shift_opcode(&op) {
            self.visit_simd_shift(opcode, node);
            return Ok(());
        }
        match op {
            Operator::F64x2ExtractLane(lane) => {
                self.visit_rri(A::F64x2ExtractLane, node, i32::from(lane))
            }
            Operator::F32x4ExtractLane(lane) => {
                self.visit_rri(A::F32x4ExtractLane, node, i32::from(lane))
            }
            Operator::I64x2ExtractLane(lane) => {
                self.visit_rri(A::I64x2ExtractLane, node, i32::from(lane))
            }
            Operator::I32x4ExtractLane(lane) => {
                self.visit_rri(A::I32x4ExtractLane, node, i32::from(lane))
            }
            Operator::I16x8ExtractLaneU(lane) => {
                self.visit_rri(A::I16x8ExtractLaneU, node, i32::from(lane))
            }
            Operator::I16x8ExtractLaneS(lane) => {
                self.visit_rri(A::I16x8ExtractLaneS, node, i32::from(lane))
            }
            Operator::I8x16ExtractLaneU(lane) => {
                self.visit_rri(A::I8x16ExtractLaneU, node, i32::from(lane))
            }
            Operator::I8x16ExtractLaneS(lane) => {
                self.visit_rri(A::I8x16ExtractLaneS, node, i32::from(lane))
            }
            Operator::F64x2ReplaceLane(lane) => {
                self.visit_rrir(A::F64x2ReplaceLane, node, i32::from(lane))
            }
            Operator::F32x4ReplaceLane(lane) => {
                self.visit_rrir(A::F32x4ReplaceLane, node, i32::from(lane))
            }
            Operator::I64x2ReplaceLane(lane) => {
                self.visit_rrir(A::I64x2ReplaceLane, node, i32::from(lane))
            }
            Operator::I32x4ReplaceLane(lane) => {
                self.visit_rrir(A::I32x4ReplaceLane, node, i32::from(lane))
            }
            Operator::I16x8ReplaceLane(lane) => {
                self.visit_rrir(A::I16x8ReplaceLane, node, i32::from(lane))
            }
            Operator::I8x16ReplaceLane(lane) => {
                self.visit_rrir(A::I8x16ReplaceLane, node, i32::from(lane))
            }

            Operator::S128Constant(bytes) => self.visit_s128_const(node, bytes),
            Operator::S128Zero => {
                let dst = self.define_as_register(node);
                self.emit(A::S128Zero, &[dst], &[], &[]);
            }
            Operator::S128Select
            | Operator::I8x16RelaxedLaneSelect
            | Operator::I16x8RelaxedLaneSelect
            | Operator::I32x4RelaxedLaneSelect
            | Operator::I64x2RelaxedLaneSelect => self.visit_rrrr(A::S128Select, node),
            Operator::F64x2Qfma => self.visit_rrrr(A::F64x2Qfma, node),
            Operator::F64x2Qfms => self.visit_rrrr(A::F64x2Qfms, node),
            Operator::F32x4Qfma => self.visit_rrrr(A::F32x4Qfma, node),
            Operator::F32x4Qfms => self.visit_rrrr(A::F32x4Qfms, node),
            Operator::F32x4Pmin => self.visit_unique_rrr(A::F32x4Pmin, node),
            Operator::F32x4Pmax => self.visit_unique_rrr(A::F32x4Pmax, node),
            Operator::F64x2Pmin => self.visit_unique_rrr(A::F64x2Pmin, node),
            Operator::F64x2Pmax => self.visit_unique_rrr(A::F64x2Pmax, node),

            Operator::I32x4DotI16x8S => self.visit_i32x4_dot_i16x8_s(node),

            Operator::I32x4ExtAddPairwiseI16x8S => self.visit_ext_add_pairwise(
                node,
                A::Vwadd,
                VSew::E16,
                0x0006_0004_0002_0000,
                0x0007_0005_0003_0001,
            ),
            Operator::I32x4ExtAddPairwiseI16x8U => self.visit_ext_add_pairwise(
                node,
                A::Vwaddu,
                VSew::E16,
                0x0006_0004_0002_0000,
                0x0007_0005_0003_0001,
            ),
            Operator::I16x8ExtAddPairwiseI8x16S => self.visit_ext_add_pairwise(
                node,
                A::Vwadd,
                VSew::E8,
                0x0E0C_0A08_0604_0200,
                0x0F0D_0B09_0705_0301,
            ),
            Operator::I16x8ExtAddPairwiseI8x16U => self.visit_ext_add_pairwise(
                node,
                A::Vwaddu,
                VSew::E8,
                0x0E0C_0A08_0604_0200,
                0x0F0D_0B09_0705_0301,
            ),

            Operator::I64x2ExtMulLowI32x4S => self.visit_ext_mul_low(node, A::Vwmul, VSew::E32),
            Operator::I64x2ExtMulHighI32x4S => self.visit_ext_mul_high(node, A::Vwmul, VSew::E32),
            Operator::I64x2ExtMulLowI32x4U => self.visit_ext_mul_low(node, A::Vwmulu, VSew::E32),
            Operator::I64x2ExtMulHighI32x4U => self.visit_ext_mul_high(node, A::Vwmulu, VSew::E32),
            Operator::I32x4ExtMulLowI16x8S => self.visit_ext_mul_low(node, A::Vwmul, VSew::E16),
            Operator::I32x4ExtMulHighI16x8S => self.visit_ext_mul_high(node, A::Vwmul, VSew::E16),
            Operator::I32x4ExtMulLowI16x8U => self.visit_ext_mul_low(node, A::Vwmulu, VSew::E16),
            Operator::I32x4ExtMulHighI16x8U => self.visit_ext_mul_high(node, A::Vwmulu, VSew::E16),
            Operator::I16x8ExtMulLowI8x16S => self.visit_ext_mul_low(node, A::Vwmul, VSew::E8),
            Operator::I16x8ExtMulHighI8x16S => self.visit_ext_mul_high(node, A::Vwmul, VSew::E8),
            Operator::I16x8ExtMulLowI8x16U => self.visit_ext_mul_low(node, A::Vwmulu, VSew::E8),
            Operator::I16x8ExtMulHighI8x16U => self.visit_ext_mul_high(node, A::Vwmulu, VSew::E8),

            Operator::I8x16Shuffle(shuffle) => self.visit_i8x16_shuffle(node, shuffle),
            Operator::I8x16Swizzle => self.visit_i8x16_swizzle(node),

            Operator::LoadTransform(transformation) => {
                self.visit_load_transform(node, transformation)
            }
            Operator::LoadLane(params) => self.visit_load_lane(node, params),
            Operator::StoreLane(params) => self.visit_store_lane(node, params),

            op => unsupported!("unimplemented operator {:?}", op),
        }
        Ok(())
    }

    fn visit_simd_shift(&mut self, opcode: ArchOpcode, node: Node) {
        let shift = self.graph.input(node, 1);
        let dst = self.define_as_register(node);
        let src = self.use_register(self.graph.input(node, 0));
        let shift = if matchers::int32_constant(self.graph, shift).is_some() {
            self.use_immediate(shift)
        } else {
            self.use_register(shift)
        };
        self.emit(opcode, &[dst], &[src, shift], &[]);
    }

    fn visit_s128_const(&mut self, node: Node, bytes: [u8; 16]) {
        let mut val = [0u32; 4];
        for (i, word) in val.iter_mut().enumerate() {
            let b = &bytes[i * 4..];
            *word = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        }
        // All-zero and all-one vectors have dedicated, cheaper forms.
        let all_zeros = val.iter().all(|&v| v == 0);
        let all_ones = val.iter().all(|&v| v == u32::MAX);
        let dst = self.define_as_register(node);
        if all_zeros {
            self.emit(ArchOpcode::S128Zero, &[dst], &[], &[]);
        } else if all_ones {
            self.emit(ArchOpcode::S128AllOnes, &[dst], &[], &[]);
        } else {
            let imms = [
                self.temp_immediate(val[0] as i32),
                self.temp_immediate(val[1] as i32),
                self.temp_immediate(val[2] as i32),
                self.temp_immediate(val[3] as i32),
            ];
            self.emit(ArchOpcode::S128Const, &[dst], &imms, &[]);
        }
    }

    fn visit_i32x4_dot_i16x8_s(&mut self, node: Node) {
        let e16 = self.temp_immediate(VSew::E16.encode() as i32);
        let e32 = self.temp_immediate(VSew::E32.encode() as i32);
        let m1 = self.temp_immediate(Vlmul::M1.encode() as i32);
        let m2 = self.temp_immediate(Vlmul::M2.encode() as i32);
        let temp = self.temp_fp_register(v16());
        let temp1 = self.temp_fp_register(v17());
        let temp2 = self.temp_fp_register(v30());
        let dst = self.define_as_register(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_register(self.graph.input(node, 1));
        self.emit(ArchOpcode::Vwmul, &[temp], &[a, b, e16, m1], &[]);
        let even = self.temp_immediate(0b01010101);
        self.emit(ArchOpcode::Vcompress, &[temp2], &[temp, even, e32, m2], &[]);
        let odd = self.temp_immediate(0b10101010);
        self.emit(ArchOpcode::Vcompress, &[temp1], &[temp, odd, e32, m2], &[]);
        self.emit(ArchOpcode::VaddVv, &[dst], &[temp1, temp2, e32, m1], &[]);
    }

    fn visit_ext_add_pairwise(
        &mut self,
        node: Node,
        widening_add: ArchOpcode,
        sew: VSew,
        even_lanes: i64,
        odd_lanes: i64,
    ) {
        let e = self.temp_immediate(sew.encode() as i32);
        let m1 = self.temp_immediate(Vlmul::M1.encode() as i32);
        let mf2 = self.temp_immediate(Vlmul::Mf2.encode() as i32);
        let src1 = self.temp_simd128_register();
        let src2 = self.temp_simd128_register();
        let src = self.use_unique_register(self.graph.input(node, 0));
        let even = self.use_immediate64(even_lanes);
        self.emit(ArchOpcode::Vrgather, &[src1], &[src, even, e, m1], &[]);
        let odd = self.use_immediate64(odd_lanes);
        self.emit(ArchOpcode::Vrgather, &[src2], &[src, odd, e, m1], &[]);
        let dst = self.define_as_register(node);
        self.emit(widening_add, &[dst], &[src1, src2, e, mf2], &[]);
    }

    fn visit_ext_mul_low(&mut self, node: Node, opcode: ArchOpcode, sew: VSew) {
        let e = self.temp_immediate(sew.encode() as i32);
        let mf2 = self.temp_immediate(Vlmul::Mf2.encode() as i32);
        let dst = self.define_as_register(node);
        let a = self.use_unique_register(self.graph.input(node, 0));
        let b = self.use_unique_register(self.graph.input(node, 1));
        self.emit(opcode, &[dst], &[a, b, e, mf2], &[]);
    }

    fn visit_ext_mul_high(&mut self, node: Node, opcode: ArchOpcode, sew: VSew) {
        let e = self.temp_immediate(sew.encode() as i32);
        let m1 = self.temp_immediate(Vlmul::M1.encode() as i32);
        let mf2 = self.temp_immediate(Vlmul::Mf2.encode() as i32);
        // The high halves are slid down into fixed temporaries first.
        let half_lanes = self.temp_immediate((VLEN / sew.bits() / 2) as i32);
        let t1 = self.temp_fp_register(v16());
        let a = self.use_unique_register(self.graph.input(node, 0));
        self.emit(ArchOpcode::Vslidedown, &[t1], &[a, half_lanes, e, m1], &[]);
        let t2 = self.temp_fp_register(v17());
        let b = self.use_unique_register(self.graph.input(node, 1));
        self.emit(ArchOpcode::Vslidedown, &[t2], &[b, half_lanes, e, m1], &[]);
        let dst = self.define_as_register(node);
        self.emit(opcode, &[dst], &[t1, t2, e, mf2], &[]);
    }

    /// Canonicalize the 16-lane permutation: a single-input shuffle is a
    /// swizzle and masks to one register's lanes.
    fn canonicalize_shuffle(&self, node: Node, mut lanes: [u8; 16]) -> ([u8; 16], bool) {
        let is_swizzle = self.graph.input(node, 0) == self.graph.input(node, 1);
        let mask: u8 = if is_swizzle { 15 } else { 31 };
        for lane in &mut lanes {
            *lane &= mask;
        }
        (lanes, is_swizzle)
    }

    fn visit_i8x16_shuffle(&mut self, node: Node, shuffle: [u8; 16]) {
        let (shuffle, _is_swizzle) = self.canonicalize_shuffle(node, shuffle);
        let dst = self.define_as_register(node);
        let a = self.use_register(self.graph.input(node, 0));
        let b = self.use_register(self.graph.input(node, 1));
        let imms = [
            self.temp_immediate(pack4_lanes(&shuffle[0..4])),
            self.temp_immediate(pack4_lanes(&shuffle[4..8])),
            self.temp_immediate(pack4_lanes(&shuffle[8..12])),
            self.temp_immediate(pack4_lanes(&shuffle[12..16])),
        ];
        self.emit(
            ArchOpcode::I8x16Shuffle,
            &[dst],
            &[a, b, imms[0], imms[1], imms[2], imms[3]],
            &[],
        );
    }

    fn visit_i8x16_swizzle(&mut self, node: Node) {
        let e8 = self.temp_immediate(VSew::E8.encode() as i32);
        let m1 = self.temp_immediate(Vlmul::M1.encode() as i32);
        let temps = [self.temp_simd128_register()];
        // Neither input may share the output register; the gather writes the
        // destination before it is done reading.
        let dst = self.define_as_register(node);
        let a = self.use_unique_register(self.graph.input(node, 0));
        let b = self.use_unique_register(self.graph.input(node, 1));
        self.emit(ArchOpcode::Vrgather, &[dst], &[a, b, e8, m1], &temps);
    }

    fn visit_load_transform(&mut self, node: Node, transformation: LoadTransformation) {
        use ArchOpcode as A;
        use LoadTransformation as T;
        let (opcode, sew) = match transformation {
            T::S128Load8Splat => (A::S128LoadSplat, VSew::E8),
            T::S128Load16Splat => (A::S128LoadSplat, VSew::E16),
            T::S128Load32Splat => (A::S128LoadSplat, VSew::E32),
            T::S128Load64Splat => (A::S128LoadSplat, VSew::E64),
            T::S128Load8x8S => (A::S128Load64ExtendS, VSew::E16),
            T::S128Load8x8U => (A::S128Load64ExtendU, VSew::E16),
            T::S128Load16x4S => (A::S128Load64ExtendS, VSew::E32),
            T::S128Load16x4U => (A::S128Load64ExtendU, VSew::E32),
            T::S128Load32x2S => (A::S128Load64ExtendS, VSew::E64),
            T::S128Load32x2U => (A::S128Load64ExtendU, VSew::E64),
            T::S128Load32Zero => (A::S128Load32Zero, VSew::E32),
            T::S128Load64Zero => (A::S128Load64Zero, VSew::E64),
        };
        self.emit_s128_load(node, opcode, sew, Vlmul::M1);
    }

    fn emit_s128_load(&mut self, node: Node, opcode: ArchOpcode, sew: VSew, lmul: Vlmul) {
        let code = InstructionCode::new(opcode);
        let base = self.graph.input(node, 0);
        let index = self.graph.input(node, 1);
        let e = self.temp_immediate(sew.encode() as i32);
        let m = self.temp_immediate(lmul.encode() as i32);
        if self.can_be_immediate(index, code) {
            let dst = self.define_as_register(node);
            let b = self.use_register(base);
            let i = self.use_immediate(index);
            self.emit(
                code.with_addressing_mode(AddressingMode::BaseImm),
                &[dst],
                &[b, i, e, m],
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
                &[addr, zero, e, m],
                &[],
            );
        }
    }

    fn visit_load_lane(&mut self, node: Node, params: LaneParameters) {
        let sew = lane_sew(params.rep);
        let code = InstructionCode::new(ArchOpcode::S128LoadLane)
            .with_misc(sew.encode())
            .with_addressing_mode(AddressingMode::BaseImm);
        let addr = self.temp_register();
        let b = self.use_register(self.graph.input(node, 0));
        let i = self.use_register(self.graph.input(node, 1));
        self.emit(ArchOpcode::Add, &[addr], &[b, i], &[]);
        let dst = self.define_same_as_first(node);
        let value = self.use_register(self.graph.input(node, 2));
        let lane = self.temp_immediate(i32::from(params.laneidx));
        let zero = self.temp_immediate(0);
        self.emit(code, &[dst], &[value, lane, addr, zero], &[]);
    }

    fn visit_store_lane(&mut self, node: Node, params: LaneParameters) {
        let sew = lane_sew(params.rep);
        let code = InstructionCode::new(ArchOpcode::S128StoreLane)
            .with_misc(sew.encode())
            .with_addressing_mode(AddressingMode::BaseImm);
        let addr = self.temp_register();
        let b = self.use_register(self.graph.input(node, 0));
        let i = self.use_register(self.graph.input(node, 1));
        self.emit(ArchOpcode::Add, &[addr], &[b, i], &[]);
        let value = self.use_register(self.graph.input(node, 2));
        let lane = self.temp_immediate(i32::from(params.laneidx));
        let zero = self.temp_immediate(0);
        self.emit(code, &[], &[value, lane, addr, zero], &[]);
    }
}
