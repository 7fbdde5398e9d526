//! The control store: every microstate as data, not code.
//!
//! [`Microinstruction::decode`] is a pure function from a microstate index to
//! the control signals that state drives — the same table-lookup shape as a
//! real control store ROM, expressed here as a `match` over tagged variants
//! rather than scattered booleans, so every unhandled state is a compile-time
//! exhaustive case instead of an `if`/`elif` chain that can silently fall
//! through.

use crate::memory::Rw;
use arbitrary_int::u6;

/// Selects the source loaded into `PC` when `LD_PC` is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcMux {
    /// `PC + 1`.
    #[default]
    PcPlusOne,
    /// The gated internal bus.
    Bus,
    /// The address adder's output.
    Adder,
}

/// Selects which register file index is the destination register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrMux {
    /// `IR[11:9]`.
    #[default]
    Ir11_9,
    /// `R6`, the stack pointer (reserved for extension; never asserted by an
    /// implemented microstate).
    Sp,
    /// `R7`, the link register used by `JSR`/`JSRR`.
    R7,
}

/// Selects which register file index is the first source register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sr1Mux {
    /// `IR[11:9]`.
    #[default]
    Ir11_9,
    /// `IR[8:6]`.
    Ir8_6,
    /// `R6`, the stack pointer (reserved for extension).
    Sp,
}

/// Selects the first operand of the address adder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Addr1Mux {
    /// The program counter.
    #[default]
    Pc,
    /// `SR1_OUT`, the base register.
    BaseR,
}

/// Selects the second operand of the address adder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Addr2Mux {
    /// The constant zero.
    #[default]
    Zero,
    /// `sign_extend(IR, 6)`.
    Offset6,
    /// `sign_extend(IR, 9)`.
    PcOffset9,
    /// `sign_extend(IR, 11)`.
    PcOffset11,
}

/// Selects the source loaded into `MAR` when `LD_MAR` is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarMux {
    /// `zero_extend(IR, 8)`, the `TRAP` vector (never asserted; `TRAP` is a
    /// documented stub that falls through to fetch).
    #[default]
    Ir7_0,
    /// The address adder's output.
    Adder,
}

/// Selects the ALU's operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aluk {
    /// `SR1_OUT + SR2MUX_OUT`.
    Add,
    /// `SR1_OUT & SR2MUX_OUT`.
    And,
    /// `!SR1_OUT`.
    Not,
    /// `SR1_OUT`, unmodified.
    #[default]
    PassA,
}

/// Selects which condition input gates the `J` offset applied by the
/// microsequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cond {
    /// `J` is used unmodified.
    #[default]
    Unconditional,
    /// `+2` if the memory-ready signal `R` is asserted.
    MemoryReady,
    /// `+4` if the latched branch-enable `BEN` is asserted.
    Branch,
    /// `+1` if `IR[11]` is set (distinguishes `JSR` from `JSRR`).
    AddressingMode,
    /// `+8` if `PSR[15]` (user mode) is set. Reserved for the
    /// privilege/exception extension; no implemented microstate uses it.
    PrivilegeMode,
    /// `+16` if the host-driven `INT` line is asserted.
    InterruptTest,
    /// `+32` if the latched access-control-violation flag `ACV` is
    /// asserted.
    AcvTest,
}

/// One row of the control store: every control signal driven by a single
/// microstate.
///
/// Fields not mentioned by a given microstate take their [`Default`] (every
/// load enable and gate enable defaults to not-asserted; every mux defaults
/// to the same idle selection the reference datapath resets to).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Microinstruction {
    /// Instruction-register-dispatch mode: the next state is `IR[15:12]`
    /// rather than `J` plus a [`Cond`]-gated offset.
    pub ird: bool,
    /// Which condition input, if any, offsets `j`.
    pub cond: Cond,
    /// The base next-state field.
    pub j: u6,

    /// Load `MAR` from the bus.
    pub ld_mar: bool,
    /// Load `MDR` from `MEMORY_OUT` (if `mio_en`) or the bus.
    pub ld_mdr: bool,
    /// Load `IR` from the bus.
    pub ld_ir: bool,
    /// Load the latched `BEN` from this cycle's `BEN_OUT`.
    pub ld_ben: bool,
    /// Load the register file at `DR` from the bus.
    pub ld_reg: bool,
    /// Load `N`/`Z`/`P` from the bus.
    pub ld_cc: bool,
    /// Load `PC` from `pc_mux`'s output.
    pub ld_pc: bool,
    /// Load the latched `ACV` from this cycle's `ACV_OUT`.
    pub ld_acv: bool,
    /// Load the privilege bit. Reserved for the exception-handling
    /// extension; no implemented microstate asserts this.
    pub ld_priv: bool,
    /// Load the interrupt priority latch. Reserved for extension.
    pub ld_priority: bool,
    /// Save the supervisor stack pointer. Reserved for extension.
    pub ld_saved_ssp: bool,
    /// Save the user stack pointer. Reserved for extension.
    pub ld_saved_usp: bool,
    /// Load the interrupt/exception vector register. Reserved for
    /// extension.
    pub ld_vector: bool,

    /// Gate `PC` onto the bus.
    pub gate_pc: bool,
    /// Gate `MDR` onto the bus.
    pub gate_mdr: bool,
    /// Gate the ALU output onto the bus.
    pub gate_alu: bool,
    /// Gate `mar_mux`'s output onto the bus.
    pub gate_marmux: bool,
    /// Gate the interrupt/exception vector onto the bus. Reserved for
    /// extension.
    pub gate_vector: bool,
    /// Gate `PC - 1` onto the bus. Reserved for extension.
    pub gate_pc_minus_1: bool,
    /// Gate `PSR` onto the bus. Reserved for extension.
    pub gate_psr: bool,
    /// Gate the stack pointer onto the bus. Reserved for extension.
    pub gate_sp: bool,

    /// `PC` load source selector.
    pub pc_mux: PcMux,
    /// Destination register selector.
    pub dr_mux: DrMux,
    /// First source register selector.
    pub sr1_mux: Sr1Mux,
    /// Address adder first-operand selector.
    pub addr1_mux: Addr1Mux,
    /// Address adder second-operand selector.
    pub addr2_mux: Addr2Mux,
    /// `MAR` load source selector.
    pub mar_mux: MarMux,
    /// ALU operation selector.
    pub aluk: Aluk,

    /// Assert the memory subsystem this cycle.
    pub mio_en: bool,
    /// Memory request direction when `mio_en` is asserted.
    pub rw: Rw,
}

impl Default for Microinstruction {
    fn default() -> Self {
        Self {
            ird: false,
            cond: Cond::default(),
            j: u6::new(0),
            ld_mar: false,
            ld_mdr: false,
            ld_ir: false,
            ld_ben: false,
            ld_reg: false,
            ld_cc: false,
            ld_pc: false,
            ld_acv: false,
            ld_priv: false,
            ld_priority: false,
            ld_saved_ssp: false,
            ld_saved_usp: false,
            ld_vector: false,
            gate_pc: false,
            gate_mdr: false,
            gate_alu: false,
            gate_marmux: false,
            gate_vector: false,
            gate_pc_minus_1: false,
            gate_psr: false,
            gate_sp: false,
            pc_mux: PcMux::default(),
            dr_mux: DrMux::default(),
            sr1_mux: Sr1Mux::default(),
            addr1_mux: Addr1Mux::default(),
            addr2_mux: Addr2Mux::default(),
            mar_mux: MarMux::default(),
            aluk: Aluk::default(),
            mio_en: false,
            rw: Rw::default(),
        }
    }
}

impl Microinstruction {
    /// Return the control signals for the given microstate.
    ///
    /// States with no entry below — an unpopulated slot, a reserved opcode,
    /// or an interrupt/exception entry point reserved for extension — decode
    /// to the same signals as state 18's idle fallback (`J = 18`, no loads,
    /// no gates); [`Microinstruction::is_specified`] distinguishes that case
    /// from a genuine microcode entry so the caller can report a
    /// [`crate::fault::Fault::UnimplementedState`].
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn decode(state: u8) -> Self {
        match state {
            // BR: PC <- PC + off9 if BEN.
            0 => Self {
                cond: Cond::Branch,
                j: u6::new(18),
                ..Self::default()
            },
            // ADD DR, SR1, (SR2 | SEXT[imm5]).
            1 => Self {
                sr1_mux: Sr1Mux::Ir8_6,
                ld_reg: true,
                ld_cc: true,
                aluk: Aluk::Add,
                gate_alu: true,
                j: u6::new(18),
                ..Self::default()
            },
            // LD DR, PC + off9: MAR <- PC + off9, set ACV.
            2 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir11_9,
                gate_marmux: true,
                j: u6::new(35),
                ..Self::default()
            },
            // ST SR, PC + off9: MAR <- PC + off9, set ACV.
            3 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir11_9,
                gate_marmux: true,
                j: u6::new(23),
                ..Self::default()
            },
            // JSR / JSRR dispatch on IR[11].
            4 => Self {
                cond: Cond::AddressingMode,
                j: u6::new(20),
                ..Self::default()
            },
            // AND DR, SR1, (SR2 | SEXT[imm5]).
            5 => Self {
                sr1_mux: Sr1Mux::Ir8_6,
                ld_reg: true,
                ld_cc: true,
                aluk: Aluk::And,
                gate_alu: true,
                j: u6::new(18),
                ..Self::default()
            },
            // LDR DR, BaseR + off6: MAR <- BaseR + off6, set ACV.
            6 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::Offset6,
                addr1_mux: Addr1Mux::BaseR,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir8_6,
                gate_marmux: true,
                j: u6::new(35),
                ..Self::default()
            },
            // STR SR, BaseR + off6: MAR <- BaseR + off6, set ACV.
            7 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::Offset6,
                addr1_mux: Addr1Mux::BaseR,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir8_6,
                gate_marmux: true,
                j: u6::new(23),
                ..Self::default()
            },
            // RTI: not implemented, falls through to fetch.
            8 => Self {
                j: u6::new(18),
                ..Self::default()
            },
            // NOT DR, SR1.
            9 => Self {
                sr1_mux: Sr1Mux::Ir8_6,
                ld_reg: true,
                ld_cc: true,
                aluk: Aluk::Not,
                gate_alu: true,
                j: u6::new(18),
                ..Self::default()
            },
            // LDI DR, PC + off9: MAR <- PC + off9, set ACV.
            10 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir11_9,
                gate_marmux: true,
                j: u6::new(17),
                ..Self::default()
            },
            // STI SR, PC + off9: MAR <- PC + off9, set ACV.
            11 => Self {
                ld_mar: true,
                ld_acv: true,
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                mar_mux: MarMux::Adder,
                sr1_mux: Sr1Mux::Ir11_9,
                gate_marmux: true,
                j: u6::new(19),
                ..Self::default()
            },
            // JMP BaseR: PC <- BaseR.
            12 => Self {
                addr2_mux: Addr2Mux::Zero,
                addr1_mux: Addr1Mux::BaseR,
                sr1_mux: Sr1Mux::Ir8_6,
                pc_mux: PcMux::Adder,
                ld_pc: true,
                j: u6::new(18),
                ..Self::default()
            },
            // LEA DR, PC + off9: DR <- PC + off9. No LD_CC.
            14 => Self {
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                mar_mux: MarMux::Adder,
                dr_mux: DrMux::Ir11_9,
                gate_marmux: true,
                ld_reg: true,
                j: u6::new(18),
                ..Self::default()
            },
            // TRAP: not implemented, falls through to fetch.
            15 => Self {
                j: u6::new(18),
                ..Self::default()
            },
            // M[MAR] <- MDR, loop until R.
            16 => Self {
                mio_en: true,
                rw: Rw::Wr,
                cond: Cond::MemoryReady,
                j: u6::new(16),
                ..Self::default()
            },
            // ACV check before the LDI indirect read.
            17 => Self {
                cond: Cond::AcvTest,
                j: u6::new(24),
                ..Self::default()
            },
            // Fetch: MAR <- PC, PC <- PC + 1, set ACV, test INT.
            18 => Self {
                ld_mar: true,
                ld_pc: true,
                ld_acv: true,
                pc_mux: PcMux::PcPlusOne,
                gate_pc: true,
                cond: Cond::InterruptTest,
                j: u6::new(33),
                ..Self::default()
            },
            // ACV check before the STI indirect pointer read.
            19 => Self {
                cond: Cond::AcvTest,
                j: u6::new(29),
                ..Self::default()
            },
            // JSRR: R7 <- PC, PC <- BaseR.
            20 => Self {
                addr2_mux: Addr2Mux::Zero,
                addr1_mux: Addr1Mux::BaseR,
                sr1_mux: Sr1Mux::Ir8_6,
                pc_mux: PcMux::Adder,
                ld_pc: true,
                gate_pc: true,
                ld_reg: true,
                dr_mux: DrMux::R7,
                j: u6::new(18),
                ..Self::default()
            },
            // JSR: R7 <- PC, PC <- PC + off11.
            21 => Self {
                ld_pc: true,
                addr2_mux: Addr2Mux::PcOffset11,
                addr1_mux: Addr1Mux::Pc,
                pc_mux: PcMux::Adder,
                gate_pc: true,
                ld_reg: true,
                dr_mux: DrMux::R7,
                j: u6::new(18),
                ..Self::default()
            },
            // BR taken: PC <- PC + off9.
            22 => Self {
                ld_pc: true,
                addr2_mux: Addr2Mux::PcOffset9,
                addr1_mux: Addr1Mux::Pc,
                pc_mux: PcMux::Adder,
                j: u6::new(18),
                ..Self::default()
            },
            // MDR <- SR (via ALU PASSA), ACV check before the store commits.
            23 => Self {
                ld_mdr: true,
                aluk: Aluk::PassA,
                gate_alu: true,
                cond: Cond::AcvTest,
                j: u6::new(16),
                ..Self::default()
            },
            // MDR <- M[MAR], loop until R (LDI indirect read).
            24 => Self {
                mio_en: true,
                rw: Rw::Rd,
                ld_mdr: true,
                cond: Cond::MemoryReady,
                j: u6::new(24),
                ..Self::default()
            },
            // MDR <- M[MAR], loop until R (LD/LDR/LDI data read).
            25 => Self {
                mio_en: true,
                rw: Rw::Rd,
                ld_mdr: true,
                cond: Cond::MemoryReady,
                j: u6::new(25),
                ..Self::default()
            },
            // MAR <- MDR, set ACV (LDI: indirect pointer becomes the
            // effective address).
            26 => Self {
                ld_mar: true,
                gate_mdr: true,
                ld_acv: true,
                j: u6::new(35),
                ..Self::default()
            },
            // DR <- MDR, set CC (LD/LDR/LDI completion).
            27 => Self {
                ld_reg: true,
                dr_mux: DrMux::Ir11_9,
                gate_mdr: true,
                ld_cc: true,
                j: u6::new(18),
                ..Self::default()
            },
            // MDR <- M[MAR], loop until R (instruction fetch read).
            28 => Self {
                mio_en: true,
                rw: Rw::Rd,
                ld_mdr: true,
                cond: Cond::MemoryReady,
                j: u6::new(28),
                ..Self::default()
            },
            // MDR <- M[MAR], loop until R (STI indirect pointer read).
            29 => Self {
                mio_en: true,
                rw: Rw::Rd,
                ld_mdr: true,
                cond: Cond::MemoryReady,
                j: u6::new(29),
                ..Self::default()
            },
            // IR <- MDR.
            30 => Self {
                ld_ir: true,
                gate_mdr: true,
                j: u6::new(32),
                ..Self::default()
            },
            // MAR <- MDR, set ACV (STI: indirect pointer becomes the
            // effective address of the store).
            31 => Self {
                ld_mar: true,
                gate_mdr: true,
                ld_acv: true,
                j: u6::new(23),
                ..Self::default()
            },
            // Decode: BEN <- BEN_OUT, dispatch on IR[15:12].
            32 => Self {
                ld_ben: true,
                ird: true,
                j: u6::new(0),
                ..Self::default()
            },
            // ACV check after fetch's address computation.
            33 => Self {
                cond: Cond::AcvTest,
                j: u6::new(28),
                ..Self::default()
            },
            // ACV check before a data read commits.
            35 => Self {
                cond: Cond::AcvTest,
                j: u6::new(25),
                ..Self::default()
            },
            // Everything else: an unpopulated microstate, a reserved opcode
            // (e.g. 0b1101), or an interrupt/exception entry point reserved
            // for extension. Idle, falls through to fetch.
            _ => Self {
                j: u6::new(18),
                ..Self::default()
            },
        }
    }

    /// Whether `state` has a genuine control-store entry, as opposed to
    /// falling into [`Microinstruction::decode`]'s catch-all fallback.
    #[must_use]
    pub const fn is_specified(state: u8) -> bool {
        matches!(state, 0..=12 | 14..=33 | 35)
    }

    /// Pack this microinstruction's control signals into a single `u64`.
    ///
    /// Mirrors the reference control unit's own `store_state` bit-packing
    /// (there, a per-state `BitString` kept for comparing control-store
    /// contents against a reference trace). Field order is an
    /// implementation detail; callers should compare encodings to other
    /// encodings, not to a hardcoded constant.
    #[must_use]
    pub fn encode(&self) -> u64 {
        let mut bits: u64 = 0;
        let push_bool = |bits: &mut u64, value: bool| {
            *bits = (*bits << 1) | u64::from(value);
        };
        let push_bits = |bits: &mut u64, value: u64, width: u32| {
            *bits = (*bits << width) | (value & ((1 << width) - 1));
        };

        push_bool(&mut bits, self.ird);
        push_bits(&mut bits, self.cond as u64, 3);
        push_bits(&mut bits, u64::from(self.j.value()), 6);
        for flag in [
            self.ld_mar,
            self.ld_mdr,
            self.ld_ir,
            self.ld_ben,
            self.ld_reg,
            self.ld_cc,
            self.ld_pc,
            self.ld_acv,
            self.ld_priv,
            self.ld_priority,
            self.ld_saved_ssp,
            self.ld_saved_usp,
            self.ld_vector,
            self.gate_pc,
            self.gate_mdr,
            self.gate_alu,
            self.gate_marmux,
            self.gate_vector,
            self.gate_pc_minus_1,
            self.gate_psr,
            self.gate_sp,
            self.mio_en,
            matches!(self.rw, Rw::Wr),
        ] {
            push_bool(&mut bits, flag);
        }
        push_bits(&mut bits, self.pc_mux as u64, 2);
        push_bits(&mut bits, self.dr_mux as u64, 2);
        push_bits(&mut bits, self.sr1_mux as u64, 2);
        push_bits(&mut bits, self.addr1_mux as u64, 1);
        push_bits(&mut bits, self.addr2_mux as u64, 2);
        push_bits(&mut bits, self.mar_mux as u64, 1);
        push_bits(&mut bits, self.aluk as u64, 2);

        bits
    }
}
