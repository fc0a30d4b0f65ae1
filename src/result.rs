//! Result and error types representing the outcome of instruction selection.

use core::fmt;

/// An error produced while selecting instructions for a function.
///
/// The selection pass is total over its declared operator subset; everything
/// outside it fails loudly with one of these. None of the variants are
/// recoverable: the surrounding compile job aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// A node whose operator kind has no lowering rule on this target.
    ///
    /// The message carries the operator and the `file:line` of the rule that
    /// rejected it.
    Unsupported(String),

    /// A load or store uses a machine representation this target rejects
    /// (64-bit, compressed, sandboxed pointers, map words).
    UnsupportedRepresentation(String),
}

/// A convenient alias for a `Result` that uses `CodegenError` as the error.
pub type CodegenResult<T> = Result<T, CodegenError>;

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodegenError::Unsupported(msg) => write!(f, "unsupported operation: {msg}"),
            CodegenError::UnsupportedRepresentation(msg) => {
                write!(f, "unsupported machine representation: {msg}")
            }
        }
    }
}

impl std::error::Error for CodegenError {}
