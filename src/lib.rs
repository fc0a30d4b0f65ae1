//! Kestrel code generation library.
//!
//! This crate holds the instruction-selection pass of the Kestrel JIT for the
//! RISC-V 32-bit target. The pass consumes a machine-level dataflow graph
//! (see [`ir`]) in scheduling order and produces a linear
//! [`InstructionSequence`](isel::InstructionSequence) in virtual-register
//! form, annotated with addressing modes, immediates, flag continuations, and
//! register-allocation constraints. Register allocation and code emission are
//! separate, later passes.

pub mod ir;
pub mod isa;
pub mod isel;
pub mod settings;

mod result;

pub use crate::result::{CodegenError, CodegenResult};

/// Even when trace logging is enabled, the trace macro has a significant
/// performance cost so we disable it by default.
#[macro_export]
macro_rules! trace {
    ($($tt:tt)*) => {
        if cfg!(any(feature = "trace-log", debug_assertions)) {
            ::log::trace!($($tt)*);
        }
    };
}

/// Reject the current node with a fatal "unimplemented" diagnostic.
///
/// Expands to an early `return` with [`CodegenError::Unsupported`], stamping
/// the message with the source location of the selection rule that fired.
/// The surrounding compile job treats this as non-retryable.
#[macro_export]
macro_rules! unsupported {
    ($($arg:tt)*) => {
        return Err($crate::CodegenError::Unsupported(format!(
            "{} at {}:{}",
            format_args!($($arg)*),
            file!(),
            line!()
        )))
    };
}
