//! RISC-V 32 target settings.

/// Flags group for the RISC-V 32 target.
#[derive(Clone, Debug)]
pub struct Flags {
    unaligned_access: bool,
}

impl Flags {
    pub fn new(unaligned_access: bool) -> Self {
        Self { unaligned_access }
    }

    /// Whether the target handles unaligned scalar accesses in hardware.
    /// When false, earlier phases must emit the explicit unaligned
    /// load/store operators.
    pub fn has_unaligned_access(&self) -> bool {
        self.unaligned_access
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new(true)
    }
}
