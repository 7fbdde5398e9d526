#![doc = include_str!("../README.md")]
#![forbid(missing_docs)]
#![forbid(unsafe_code)]

pub mod cpu;
pub mod fault;
pub mod memory;

use cpu::ControlUnit;
pub use fault::Fault;
use memory::{Memory, MemoryConfig};

/// A complete LC-3 microarchitectural emulator: a [`ControlUnit`] paired
/// with its [`Memory`].
///
/// `step` is the only way time passes; everything else is setup or
/// inspection. A host composes the two: drive `step` some number of times
/// (bounding execution is the host's job, not the core's), and optionally
/// assert `set_interrupt` between calls.
#[derive(Debug, Clone)]
pub struct Lc3 {
    cpu: ControlUnit,
    mem: Memory,
}

impl Lc3 {
    /// Create a new emulator with the default memory configuration
    /// ([`MemoryConfig::default`]), reset to the architectural initial
    /// state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_memory_config(MemoryConfig::default())
    }

    /// Create a new emulator with a custom memory configuration.
    #[must_use]
    pub fn with_memory_config(config: MemoryConfig) -> Self {
        Self {
            cpu: ControlUnit::new(),
            mem: Memory::new(config),
        }
    }

    /// Reset the control unit and memory to their initial state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mem.reset();
    }

    /// Execute one micro-cycle.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.mem);
    }

    /// Copy `words` into memory starting at `base`, wrapping modulo 2^16.
    pub fn load_image(&mut self, base: u16, words: &[u16]) {
        self.mem.load_image(base, words);
    }

    /// Read a word directly, bypassing the synchronous-ready protocol.
    #[must_use]
    pub fn read_memory(&self, addr: u16) -> u16 {
        self.mem.read(addr)
    }

    /// Write a word directly, bypassing the synchronous-ready protocol.
    pub fn write_memory(&mut self, addr: u16, word: u16) {
        self.mem.write(addr, word);
    }

    /// Drive the host interrupt line. The host must drop it once consumed.
    pub fn set_interrupt(&mut self, asserted: bool) {
        self.cpu.set_interrupt(asserted);
    }

    /// Whether the host interrupt line is currently asserted.
    #[must_use]
    pub const fn interrupt(&self) -> bool {
        self.cpu.interrupt()
    }

    /// Current value of general-purpose register `r` (`0..8`).
    #[must_use]
    pub fn register(&self, r: usize) -> u16 {
        self.cpu.register(r)
    }

    /// Set general-purpose register `r` (`0..8`). Exists for host setup;
    /// no microstate reaches this path.
    pub fn set_register(&mut self, r: usize, value: u16) {
        self.cpu.set_register(r, value);
    }

    /// The program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    /// Set the program counter. Exists for host setup (e.g. relocating a
    /// loaded image's entry point); no microstate reaches this path.
    pub fn set_pc(&mut self, pc: u16) {
        self.cpu.set_pc(pc);
    }

    /// The instruction register.
    #[must_use]
    pub const fn ir(&self) -> u16 {
        self.cpu.ir()
    }

    /// The processor status register: bit 15 is the privilege bit, bits
    /// 2/1/0 are `N`/`Z`/`P`.
    #[must_use]
    pub fn psr(&self) -> u16 {
        self.cpu.psr()
    }

    /// The memory address register.
    #[must_use]
    pub const fn mar(&self) -> u16 {
        self.cpu.mar()
    }

    /// The memory data register.
    #[must_use]
    pub const fn mdr(&self) -> u16 {
        self.cpu.mdr()
    }

    /// The current microstate.
    #[must_use]
    pub const fn state(&self) -> u8 {
        self.cpu.state()
    }

    /// The latched branch-enable flag.
    #[must_use]
    pub const fn ben(&self) -> bool {
        self.cpu.ben()
    }

    /// The latched access-control-violation flag.
    #[must_use]
    pub const fn acv(&self) -> bool {
        self.cpu.acv()
    }

    /// The most recent host-contract violation recorded by `step`, if any:
    /// an unimplemented microstate from the control unit, or an
    /// out-of-range memory access, whichever was latched most recently.
    #[must_use]
    pub fn last_fault(&self) -> Option<Fault> {
        self.cpu.last_fault().or_else(|| self.mem.fault())
    }

    /// Clear both the control unit's and the memory subsystem's latched
    /// fault, if any.
    pub fn clear_fault(&mut self) {
        self.cpu.clear_fault();
        self.mem.clear_fault();
    }
}

impl Default for Lc3 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The seven end-to-end scenarios are the binding acceptance tests for
    /// this crate; this module covers the remainder (LDR, LD, JSRR, JMP,
    /// LEA, STI, STR, ST, fetch/decode, and the documented boundary
    /// behaviors) alongside them.
    fn run(cpu: &mut Lc3, cycles: usize) {
        for _ in 0..cycles {
            cpu.step();
        }
    }

    #[test]
    fn ld_reads_a_pc_relative_operand() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0010_001_000000010]); // LD R1, #2
        cpu.write_memory(0x3003, 0x1234);
        run(&mut cpu, 18);
        assert_eq!(cpu.register(1), 0x1234);
    }

    #[test]
    fn ldr_reads_a_base_plus_offset_operand() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0110_001_010_000010]); // LDR R1, R2, #2
        cpu.set_register(2, 0x3100);
        cpu.write_memory(0x3102, 0x5678);
        run(&mut cpu, 18);
        assert_eq!(cpu.register(1), 0x5678);
    }

    #[test]
    fn ldi_reads_through_an_indirect_pointer() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b1010_001_000000010]); // LDI R1, #2
        cpu.write_memory(0x3003, 0x3100);
        cpu.write_memory(0x3100, 0xbeef);
        run(&mut cpu, 23);
        assert_eq!(cpu.register(1), 0xbeef);
    }

    #[test]
    fn st_writes_a_pc_relative_operand() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0011_001_000000010]); // ST R1, #2
        cpu.set_register(1, 0x2222);
        run(&mut cpu, 14);
        assert_eq!(cpu.read_memory(0x3003), 0x2222);
    }

    #[test]
    fn str_writes_a_base_plus_offset_operand() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0111_001_010_000010]); // STR R1, R2, #2
        cpu.set_register(1, 0x3333);
        cpu.set_register(2, 0x3100);
        run(&mut cpu, 14);
        assert_eq!(cpu.read_memory(0x3102), 0x3333);
    }

    #[test]
    fn sti_writes_through_an_indirect_pointer() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b1011_001_000000010]); // STI R1, #2
        cpu.write_memory(0x3003, 0x3100);
        cpu.set_register(1, 0x4444);
        run(&mut cpu, 19);
        assert_eq!(cpu.read_memory(0x3100), 0x4444);
    }

    #[test]
    fn jsrr_saves_the_return_address_and_jumps_to_the_base_register() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0100_000_010_000000]); // JSRR R2
        cpu.set_register(2, 0x5000);
        run(&mut cpu, 9);
        assert_eq!(cpu.pc(), 0x5000);
        assert_eq!(cpu.register(7), 0x3001);
    }

    #[test]
    fn jmp_loads_pc_from_the_base_register() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b1100_000_010_000000]); // JMP R2
        cpu.set_register(2, 0x6000);
        run(&mut cpu, 8);
        assert_eq!(cpu.pc(), 0x6000);
    }

    #[test]
    fn lea_loads_an_address_without_touching_condition_codes() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b1110_001_000000010]); // LEA R1, #2
        run(&mut cpu, 8);
        assert_eq!(cpu.register(1), 0x3003);
    }

    #[test]
    fn fetch_decode_leaves_ir_holding_the_just_fetched_word_at_decode() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0001_001_010_1_00111]); // ADD R1, R2, #7
        run(&mut cpu, 6);
        assert_eq!(cpu.ir(), 0b0001_001_010_1_00111);
        assert_eq!(cpu.state(), 32);
    }

    #[test]
    fn not_complements_the_source_register() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b1001_001_010_111111]); // NOT R1, R2
        cpu.set_register(2, 0x00ff);
        run(&mut cpu, 8);
        assert_eq!(cpu.register(1), 0xff00);
    }

    #[test]
    fn and_immediate_masks_the_source_register() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0101_001_010_1_00011]); // AND R1, R2, #3
        cpu.set_register(2, 0xffff);
        run(&mut cpu, 8);
        assert_eq!(cpu.register(1), 0x0003);
    }

    #[test]
    fn add_sets_condition_codes_from_the_result() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0001_001_010_1_00000]); // ADD R1, R2, #0
        cpu.set_register(2, 0);
        run(&mut cpu, 8);
        assert_eq!(cpu.psr() & 0b111, 0b010); // Z
    }

    #[test]
    fn branch_with_no_condition_bits_never_branches() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0000_000_000000010]); // BRnzp-none, #2
        run(&mut cpu, 8);
        assert_eq!(cpu.pc(), 0x3001);
    }

    #[test]
    fn ld_below_the_user_program_region_raises_acv() {
        let mut cpu = Lc3::new();
        // PC-relative target (0x3001 - 64 = 0x2fc1) falls outside the user
        // program region; checked right after the effective address is
        // computed, before the next fetch's own ACV check can clear it.
        cpu.load_image(0x3000, &[0b0010_001_111000000]); // LD R1, #-64
        run(&mut cpu, 8);
        assert!(cpu.acv());
    }

    #[test]
    fn alu_results_wrap_modulo_two_to_the_sixteen() {
        let mut cpu = Lc3::new();
        cpu.load_image(0x3000, &[0b0001_001_010_1_00001]); // ADD R1, R2, #1
        cpu.set_register(2, 0xffff);
        run(&mut cpu, 8);
        assert_eq!(cpu.register(1), 0x0000);
    }

    #[test]
    fn unimplemented_state_logs_and_latches_a_fault() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut cpu = Lc3::new();
        cpu.reset();
        cpu.set_pc(0x3000);
        // Drive straight past fetch/decode into a reserved opcode (13) so
        // `step` has to log and latch a fault instead of executing it.
        cpu.load_image(0x3000, &[0b1101_000_000_000_000]);
        run(&mut cpu, 8);
        assert_eq!(cpu.last_fault(), Some(Fault::UnimplementedState(13)));
        cpu.clear_fault();
        assert_eq!(cpu.last_fault(), None);
    }

    #[test]
    fn reset_clears_memory_and_architectural_state() {
        let mut cpu = Lc3::new();
        cpu.write_memory(0x3000, 0xdead);
        cpu.set_register(0, 0xbeef);
        cpu.reset();
        assert_eq!(cpu.read_memory(0x3000), 0);
        assert_eq!(cpu.register(0), 0);
        assert_eq!(cpu.pc(), 0x3000);
    }
}
