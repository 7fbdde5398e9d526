//! The combinational datapath: register-index extraction, sign/zero
//! extension, the address adder, the ALU, and the mux network feeding the
//! internal bus.
//!
//! Every function here is pure: given the architectural state and the
//! current [`Microinstruction`], it computes outputs with no side effects.
//! The one exception the reference design calls out explicitly is `ACV`,
//! which must read the bus *after* gating — so this module splits its work
//! into [`pre_gating`] (everything gating itself depends on) and
//! [`post_gating`] (outputs that read the gated bus).

use super::signals::{Addr1Mux, Addr2Mux, Aluk, DrMux, MarMux, Microinstruction, PcMux};

/// Sign-extend the low `bits` bits of `value` to a full 16-bit word.
#[must_use]
pub const fn sign_extend(value: u16, bits: u32) -> u16 {
    let shift = 16 - bits;
    ((value << shift) as i16 >> shift) as u16
}

/// Zero-extend the low `bits` bits of `value` to a full 16-bit word.
#[must_use]
pub const fn zero_extend(value: u16, bits: u32) -> u16 {
    value & ((1u16 << bits) - 1)
}

/// Outputs computed before the bus is gated this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreGating {
    /// Destination register index, `0..8`.
    pub dr: u8,
    /// First source register index, `0..8`.
    pub sr1: u8,
    /// Second source register index (`IR[2:0]`), `0..8`.
    pub sr2: u8,
    /// `SR1_OUT`, the register-file read at `sr1`.
    pub sr1_out: u16,
    /// The address adder's first operand, selected by `Addr1Mux`.
    pub addr1_mux_out: u16,
    /// The address adder's second operand, selected by `Addr2Mux`.
    pub addr2_mux_out: u16,
    /// `addr1_mux_out + addr2_mux_out`.
    pub addr_add_out: u16,
    /// `MarMux`'s output: `zero_extend(IR, 8)` or the address adder.
    pub mar_mux_out: u16,
    /// The ALU's second operand: `SR2_OUT` or `sign_extend(IR, 5)`,
    /// depending on `IR[5]` (the immediate-mode bit).
    pub sr2_mux_out: u16,
    /// The ALU's output, per `Aluk`.
    pub alu_out: u16,
}

/// Outputs computed after the bus is gated this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostGating {
    /// `PcMux`'s output: `PC + 1`, the bus, or the address adder.
    pub pc_mux_out: u16,
    /// Whether this cycle's branch-enable condition is met.
    pub ben_out: bool,
    /// Whether this cycle's access would violate the user/supervisor memory
    /// boundary.
    pub acv_out: bool,
}

/// Compute every combinational output that does not depend on this cycle's
/// gated bus value.
///
/// The `IR` field extractions below always mask to 3 bits before narrowing
/// to `u8`, so the cast never truncates live data.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn pre_gating(
    ir: u16,
    pc: u16,
    regs: &[u16; 8],
    micro: &Microinstruction,
) -> PreGating {
    let dr = match micro.dr_mux {
        DrMux::Ir11_9 => ((ir >> 9) & 0x7) as u8,
        DrMux::Sp => 6,
        DrMux::R7 => 7,
    };
    let sr1_field = ((ir >> 9) & 0x7) as u8;
    let sr1_alt = ((ir >> 6) & 0x7) as u8;
    let sr2 = (ir & 0x7) as u8;

    let sr1 = match micro.sr1_mux {
        super::signals::Sr1Mux::Ir11_9 => sr1_field,
        super::signals::Sr1Mux::Ir8_6 => sr1_alt,
        super::signals::Sr1Mux::Sp => 6,
    };
    let sr1_out = regs[usize::from(sr1)];

    let addr1_mux_out = match micro.addr1_mux {
        Addr1Mux::Pc => pc,
        Addr1Mux::BaseR => sr1_out,
    };
    let addr2_mux_out = match micro.addr2_mux {
        Addr2Mux::Zero => 0,
        Addr2Mux::Offset6 => sign_extend(ir & 0x3f, 6),
        Addr2Mux::PcOffset9 => sign_extend(ir & 0x1ff, 9),
        Addr2Mux::PcOffset11 => sign_extend(ir & 0x7ff, 11),
    };
    let addr_add_out = addr1_mux_out.wrapping_add(addr2_mux_out);

    let mar_mux_out = match micro.mar_mux {
        MarMux::Ir7_0 => zero_extend(ir & 0xff, 8),
        MarMux::Adder => addr_add_out,
    };

    let sr2_mux_out = if ir & (1 << 5) != 0 {
        sign_extend(ir & 0x1f, 5)
    } else {
        regs[usize::from(sr2)]
    };

    let alu_out = match micro.aluk {
        Aluk::Add => sr1_out.wrapping_add(sr2_mux_out),
        Aluk::And => sr1_out & sr2_mux_out,
        Aluk::Not => !sr1_out,
        Aluk::PassA => sr1_out,
    };

    PreGating {
        dr,
        sr1,
        sr2,
        sr1_out,
        addr1_mux_out,
        addr2_mux_out,
        addr_add_out,
        mar_mux_out,
        sr2_mux_out,
        alu_out,
    }
}

/// Compute every combinational output that reads this cycle's gated bus
/// value.
#[must_use]
pub fn post_gating(
    bus: u16,
    pc: u16,
    addr_add_out: u16,
    ir: u16,
    n: bool,
    z: bool,
    p: bool,
    psr_privilege: bool,
    micro: &Microinstruction,
) -> PostGating {
    let pc_mux_out = match micro.pc_mux {
        PcMux::PcPlusOne => pc.wrapping_add(1),
        PcMux::Bus => bus,
        PcMux::Adder => addr_add_out,
    };

    let ben_out = (n && (ir & (1 << 11) != 0))
        || (z && (ir & (1 << 10) != 0))
        || (p && (ir & (1 << 9) != 0));

    let acv_out = psr_privilege && (bus >= 0xfe00 || bus < 0x3000);

    PostGating {
        pc_mux_out,
        ben_out,
        acv_out,
    }
}
