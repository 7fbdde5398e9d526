//! The control unit: architectural registers, the microarchitectural
//! latches, and the `step` function that drives one micro-cycle.

pub mod datapath;
pub mod sequencer;
pub mod signals;

use crate::fault::Fault;
use crate::memory::Memory;
use sequencer::ConditionInputs;
use signals::Microinstruction;

/// The LC-3 control unit: eight general-purpose registers, the program
/// counter, the instruction register, condition codes, the
/// microarchitectural latches (`MAR`, `MDR`, `BEN`, `ACV`), the current
/// microstate, and the host-driven interrupt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlUnit {
    regs: [u16; 8],
    pc: u16,
    ir: u16,
    /// `PSR[15]`. No implemented microstate ever changes this; it exists so
    /// `ACV` computation and the reserved `COND::PrivilegeMode` path have
    /// something to read.
    psr_privilege: bool,
    n: bool,
    z: bool,
    p: bool,
    mar: u16,
    mdr: u16,
    ben: bool,
    acv: bool,
    state: u8,
    int: bool,
    last_fault: Option<Fault>,
}

impl ControlUnit {
    /// The microstate the reference architecture resets into: the start of
    /// the fetch sequence.
    pub const RESET_STATE: u8 = 18;

    /// Create a new control unit in its reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; 8],
            pc: 0x3000,
            ir: 0,
            psr_privilege: true,
            n: false,
            z: false,
            p: false,
            mar: 0,
            mdr: 0,
            ben: false,
            acv: false,
            state: Self::RESET_STATE,
            int: false,
            last_fault: None,
        }
    }

    /// Reset architectural and microarchitectural state to the documented
    /// initial configuration: `PC = 0x3000`, `PSR = 0x8000`, state 18, every
    /// register and latch zeroed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance the control unit and the given memory subsystem by one
    /// micro-cycle.
    ///
    /// Decodes this state's control signals, steps memory, computes
    /// pre-gating combinational outputs, gates the bus, computes
    /// post-gating outputs (`PC_MUX_OUT`, `BEN_OUT`, `ACV_OUT` — which read
    /// the bus *after* gating), computes the next microstate, then applies
    /// every register load together ("falling edge": every load reads only
    /// values computed earlier in this same cycle, never a load from later
    /// in the same call).
    pub fn step(&mut self, mem: &mut Memory) {
        let micro = Microinstruction::decode(self.state);
        if !Microinstruction::is_specified(self.state) {
            self.last_fault = Some(Fault::UnimplementedState(self.state));
            log::warn!("{}", Fault::UnimplementedState(self.state));
        }
        log::debug!("microstate {}", self.state);

        let mem_result = mem.clock(micro.mio_en, micro.rw, self.mar, self.mdr);

        let pre = datapath::pre_gating(self.ir, self.pc, &self.regs, &micro);

        let bus = self.gate(&micro, &pre);

        let post = datapath::post_gating(
            bus,
            self.pc,
            pre.addr_add_out,
            self.ir,
            self.n,
            self.z,
            self.p,
            self.psr_privilege,
            &micro,
        );

        let inputs = ConditionInputs {
            r: mem_result.ready,
            ben: self.ben,
            addressing_mode: self.ir & (1 << 11) != 0,
            privilege_mode: self.psr_privilege,
            int: self.int,
            acv: self.acv,
        };
        let next_state = sequencer::next_state(micro.ird, micro.j.value(), micro.cond, self.ir, inputs);

        if micro.ld_mar {
            self.mar = bus;
        }
        if micro.ld_mdr {
            self.mdr = if micro.mio_en { mem_result.data_out } else { bus };
        }
        if micro.ld_ir {
            self.ir = bus;
        }
        if micro.ld_ben {
            self.ben = post.ben_out;
        }
        if micro.ld_reg {
            self.regs[usize::from(pre.dr)] = bus;
        }
        if micro.ld_cc {
            self.set_condition_codes(bus);
        }
        if micro.ld_pc {
            self.pc = post.pc_mux_out;
        }
        if micro.ld_acv {
            self.acv = post.acv_out;
        }

        self.state = next_state;
    }

    /// Resolve this cycle's single gated bus source. At most one gate is
    /// ever asserted in a given cycle.
    fn gate(&self, micro: &Microinstruction, pre: &datapath::PreGating) -> u16 {
        if micro.gate_pc {
            self.pc
        } else if micro.gate_mdr {
            self.mdr
        } else if micro.gate_alu {
            pre.alu_out
        } else if micro.gate_marmux {
            pre.mar_mux_out
        } else {
            0
        }
    }

    /// `N`, `Z`, `P` are defined mutually exclusively: `Z` first (the bus is
    /// zero), then `N` (the bus's sign bit is set), then `P` (neither).
    fn set_condition_codes(&mut self, bus: u16) {
        self.z = bus == 0;
        self.n = !self.z && bus & 0x8000 != 0;
        self.p = !self.z && !self.n;
    }

    /// Set general-purpose register `r` (`0..8`). Exists for host setup;
    /// no microstate reaches this path.
    pub fn set_register(&mut self, r: usize, value: u16) {
        self.regs[r] = value;
    }

    /// Current value of general-purpose register `r` (`0..8`).
    #[must_use]
    pub fn register(&self, r: usize) -> u16 {
        self.regs[r]
    }

    /// The program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Set the program counter. Exists for host setup (e.g. relocating a
    /// loaded image's entry point); no microstate reaches this path.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// The instruction register.
    #[must_use]
    pub const fn ir(&self) -> u16 {
        self.ir
    }

    /// The processor status register: bit 15 is the privilege bit, bits
    /// 2/1/0 are `N`/`Z`/`P`.
    #[must_use]
    pub fn psr(&self) -> u16 {
        (if self.psr_privilege { 1 << 15 } else { 0 })
            | (u16::from(self.n) << 2)
            | (u16::from(self.z) << 1)
            | u16::from(self.p)
    }

    /// The memory address register.
    #[must_use]
    pub const fn mar(&self) -> u16 {
        self.mar
    }

    /// The memory data register.
    #[must_use]
    pub const fn mdr(&self) -> u16 {
        self.mdr
    }

    /// The current microstate.
    #[must_use]
    pub const fn state(&self) -> u8 {
        self.state
    }

    /// The latched branch-enable flag.
    #[must_use]
    pub const fn ben(&self) -> bool {
        self.ben
    }

    /// The latched access-control-violation flag.
    #[must_use]
    pub const fn acv(&self) -> bool {
        self.acv
    }

    /// Whether the host-driven interrupt line is currently asserted.
    #[must_use]
    pub const fn interrupt(&self) -> bool {
        self.int
    }

    /// Drive the host interrupt line. The host is responsible for dropping
    /// it once the interrupt has been consumed.
    pub fn set_interrupt(&mut self, asserted: bool) {
        self.int = asserted;
    }

    /// The most recent host-contract violation recorded by `step`, if any.
    #[must_use]
    pub const fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    /// Clear the latched fault, if any.
    pub fn clear_fault(&mut self) {
        self.last_fault = None;
    }
}

impl Default for ControlUnit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn run(cu: &mut ControlUnit, mem: &mut Memory, cycles: usize) {
        for _ in 0..cycles {
            cu.step(mem);
        }
    }

    #[test]
    fn reset_restores_the_documented_initial_state() {
        let mut cu = ControlUnit::new();
        cu.set_pc(0x4000);
        cu.reset();
        assert_eq!(cu.pc(), 0x3000);
        assert_eq!(cu.psr(), 0x8000);
        assert_eq!(cu.state(), ControlUnit::RESET_STATE);
    }

    #[test]
    fn add_immediate_executes_in_eight_cycles() {
        let mut mem = Memory::default();
        mem.load_image(0x3000, &[0b0001_001_010_1_00111]); // ADD R1, R2, #7
        let mut cu = ControlUnit::new();
        cu.set_register(2, 0x3000);
        run(&mut cu, &mut mem, 8);
        assert_eq!(cu.register(1), 0x3007);
    }

    #[test]
    fn branch_not_taken_leaves_pc_at_the_next_instruction() {
        let mut mem = Memory::default();
        mem.load_image(0x3000, &[0b0000_010_000000010]); // BRz #2
        let mut cu = ControlUnit::new();
        run(&mut cu, &mut mem, 8);
        assert_eq!(cu.pc(), 0x3001);
    }

    #[test]
    fn branch_taken_adds_the_sign_extended_offset() {
        let mut mem = Memory::default();
        mem.load_image(0x3000, &[0b0000_010_000000010]); // BRz #2
        let mut cu = ControlUnit::new();
        cu.set_condition_codes(0);
        run(&mut cu, &mut mem, 9);
        assert_eq!(cu.pc(), 0x3003);
    }

    #[test]
    fn jsr_saves_the_return_address_and_jumps_pc_relative() {
        let mut mem = Memory::default();
        mem.load_image(0x3000, &[0b0100_1_00000000111]); // JSR #7
        let mut cu = ControlUnit::new();
        run(&mut cu, &mut mem, 9);
        assert_eq!(cu.pc(), 0x3008);
        assert_eq!(cu.register(7), 0x3001);
    }

    #[test]
    fn unimplemented_state_is_latched_and_falls_through_to_fetch() {
        let mut mem = Memory::default();
        let mut cu = ControlUnit::new();
        cu.state = 13;
        cu.step(&mut mem);
        assert_eq!(cu.last_fault(), Some(Fault::UnimplementedState(13)));
        assert_eq!(cu.state(), ControlUnit::RESET_STATE);
    }
}
