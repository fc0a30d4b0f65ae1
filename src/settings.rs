//! Pipeline settings consumed by instruction selection.
//!
//! These are the shared (target-independent) knobs; the RISC-V specific ones
//! live in [`crate::isa::riscv32::settings`].

/// Builder for [`Flags`].
#[derive(Clone, Debug)]
pub struct Builder {
    enable_jump_tables: bool,
    disable_write_barriers: bool,
}

impl Builder {
    /// Create a builder with the default settings.
    pub fn new() -> Self {
        Self {
            enable_jump_tables: true,
            disable_write_barriers: false,
        }
    }

    /// Allow `switch` lowering to emit jump tables.
    pub fn enable_jump_tables(mut self, enable: bool) -> Self {
        self.enable_jump_tables = enable;
        self
    }

    /// Skip all garbage-collector write barriers.
    pub fn disable_write_barriers(mut self, disable: bool) -> Self {
        self.disable_write_barriers = disable;
        self
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flags group for the compilation pipeline.
#[derive(Clone, Debug)]
pub struct Flags {
    enable_jump_tables: bool,
    disable_write_barriers: bool,
}

impl Flags {
    /// Finish a [`Builder`] into an immutable flags group.
    pub fn new(builder: Builder) -> Self {
        Self {
            enable_jump_tables: builder.enable_jump_tables,
            disable_write_barriers: builder.disable_write_barriers,
        }
    }

    /// Whether `switch` lowering may use jump tables.
    pub fn enable_jump_tables(&self) -> bool {
        self.enable_jump_tables
    }

    /// Whether garbage-collector write barriers are suppressed.
    pub fn disable_write_barriers(&self) -> bool {
        self.disable_write_barriers
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::new(Builder::new())
    }
}
