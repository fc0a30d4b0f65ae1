//! RISC-V 32 instruction selection.

pub mod imms;
pub mod lower;
pub mod opcodes;
pub mod regs;
pub mod settings;
pub mod vector;

mod lower_simd;

#[cfg(test)]
mod lower_tests;

/// Optional operator lowerings this target advertises to the pipeline.
/// Earlier phases only emit an optional operator when its flag is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MachineOperatorFlags {
    pub word32_shift_is_safe: bool,
    pub int32_div_is_safe: bool,
    pub uint32_div_is_safe: bool,
    pub float32_round_down: bool,
    pub float32_round_up: bool,
    pub float32_round_truncate: bool,
    pub float32_round_ties_even: bool,
}

/// The operator set the RISC-V 32 selector supports.
pub fn supported_machine_operator_flags() -> MachineOperatorFlags {
    MachineOperatorFlags {
        word32_shift_is_safe: true,
        int32_div_is_safe: true,
        uint32_div_is_safe: true,
        float32_round_down: true,
        float32_round_up: true,
        float32_round_truncate: true,
        float32_round_ties_even: true,
    }
}

/// Alignment support reported to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentRequirements {
    /// Scalar accesses may be arbitrarily aligned.
    FullUnalignedAccess,
    /// Earlier phases must emit the explicit unaligned operators.
    NoUnalignedAccess,
}

pub fn alignment_requirements(isa_flags: &settings::Flags) -> AlignmentRequirements {
    if isa_flags.has_unaligned_access() {
        AlignmentRequirements::FullUnalignedAccess
    } else {
        AlignmentRequirements::NoUnalignedAccess
    }
}
