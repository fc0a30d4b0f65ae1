//! RISC-V 32 register definitions.
//!
//! Selection only names registers when the ABI or an instruction's expansion
//! pins one; everything else stays virtual until allocation.

use regalloc2::{PReg, RegClass};

pub const fn px_reg(enc: usize) -> PReg {
    PReg::new(enc, RegClass::Int)
}

pub const fn pf_reg(enc: usize) -> PReg {
    PReg::new(enc, RegClass::Float)
}

pub const fn pv_reg(enc: usize) -> PReg {
    PReg::new(enc, RegClass::Vector)
}

/// First argument of a function call.
#[inline]
pub fn a0() -> PReg {
    px_reg(10)
}

/// Second argument of a function call.
#[inline]
pub fn a1() -> PReg {
    px_reg(11)
}

/// Third argument of a function call.
#[inline]
pub fn a2() -> PReg {
    px_reg(12)
}

/// First temporary register; scratch of the atomic-pair expansions.
#[inline]
pub fn t0() -> PReg {
    px_reg(5)
}

/// First floating-point argument register.
#[inline]
pub fn fa0() -> PReg {
    pf_reg(10)
}

/// Second floating-point argument register.
#[inline]
pub fn fa1() -> PReg {
    pf_reg(11)
}

#[inline]
pub fn v16() -> PReg {
    pv_reg(16)
}

#[inline]
pub fn v17() -> PReg {
    pv_reg(17)
}

#[inline]
pub fn v30() -> PReg {
    pv_reg(30)
}
