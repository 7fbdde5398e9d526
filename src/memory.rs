//! Emulation of the synchronous-ready memory subsystem.
//!
//! Unlike the control unit, memory is not a per-cycle combinational black
//! box: a request held across several [`Memory::clock`] calls models the
//! multi-cycle latency of real SRAM, raising `R` only once that latency has
//! elapsed.

use crate::fault::Fault;

/// Tunable parameters of the memory subsystem.
///
/// A small, `Default`-able knob set a host can override without touching
/// the synchronous-ready protocol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Number of addressable 16-bit words.
    ///
    /// The reference architecture is 64K-addressable, but this
    /// implementation backs only the low 16384 words (`0x0000..0x3FFF`);
    /// a host targeting full 64K coverage may override this.
    pub size: usize,
    /// Number of [`Memory::clock`] calls a read or write holds `MIO_EN`
    /// before `R` asserts.
    pub clock_latency: u8,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size: 0x4000,
            clock_latency: 3,
        }
    }
}

/// Direction of a memory request, driven by the control unit's `RW` latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rw {
    /// Read the word at `MAR` into `MEMORY_OUT`.
    #[default]
    Rd,
    /// Write `MDR` into the word at `MAR`.
    Wr,
}

/// The outcome of one [`Memory::clock`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryResult {
    /// The memory-ready signal `R` for this cycle.
    pub ready: bool,
    /// The word read from memory this cycle, valid only when `ready` is set
    /// and the request was a read. The control unit latches this into `MDR`
    /// via `LD_MDR`.
    pub data_out: u16,
}

/// A flat, word-addressable memory with multi-cycle read/write latency.
#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u16>,
    config: MemoryConfig,
    clock_count: u8,
    /// The most recent host-contract violation observed, if any.
    fault: Option<Fault>,
}

impl Memory {
    /// Create a new, zeroed memory subsystem using the given configuration.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: vec![0; config.size],
            config,
            clock_count: 0,
            fault: None,
        }
    }

    /// Reset to a zeroed, idle state, keeping the current configuration.
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.clock_count = 0;
        self.fault = None;
    }

    fn index_of(&mut self, addr: u16) -> Option<usize> {
        let index = usize::from(addr);
        if index < self.data.len() {
            Some(index)
        } else {
            self.fault = Some(Fault::AddressOutOfRange(addr));
            log::warn!("memory address {addr:#06x} is out of range, ignoring access");
            None
        }
    }

    /// Advance the memory subsystem by one clock cycle.
    ///
    /// Drops `R`. If `mio_en` is unset this is a no-op — the latency
    /// counter is left untouched, so a request that drops `MIO_EN` mid-count
    /// and reasserts it later resumes where it left off rather than
    /// restarting. Otherwise the internal latency counter advances; once it
    /// reaches [`MemoryConfig::clock_latency`] it resets, `R` asserts, and
    /// the request (read or write, per `rw`) commits against `mar`/`mdr`.
    pub fn clock(&mut self, mio_en: bool, rw: Rw, mar: u16, mdr: u16) -> MemoryResult {
        if !mio_en {
            return MemoryResult::default();
        }

        self.clock_count += 1;
        if self.clock_count < self.config.clock_latency {
            return MemoryResult::default();
        }
        self.clock_count = 0;

        let mut result = MemoryResult {
            ready: true,
            data_out: 0,
        };

        if let Some(index) = self.index_of(mar) {
            match rw {
                Rw::Wr => self.data[index] = mdr,
                Rw::Rd => result.data_out = self.data[index],
            }
        }

        result
    }

    /// Read a word directly, bypassing the synchronous-ready protocol.
    ///
    /// Intended for host setup and inspection, never for the control unit's
    /// own datapath.
    #[must_use]
    pub fn read(&self, addr: u16) -> u16 {
        self.data.get(usize::from(addr)).copied().unwrap_or(0)
    }

    /// Write a word directly, bypassing the synchronous-ready protocol.
    pub fn write(&mut self, addr: u16, word: u16) {
        if let Some(index) = self.index_of(addr) {
            self.data[index] = word;
        }
    }

    /// Copy a sequence of words into memory starting at `base`, wrapping the
    /// address modulo 2^16.
    ///
    /// Any file-format decoding (e.g. a big-endian `.obj` image) is the
    /// host's responsibility; this accepts already-decoded words.
    #[allow(clippy::cast_possible_truncation)]
    pub fn load_image(&mut self, base: u16, words: &[u16]) {
        for (offset, &word) in words.iter().enumerate() {
            let addr = base.wrapping_add(offset as u16);
            self.write(addr, word);
        }
    }

    /// Return the most recent host-contract violation, if any, without
    /// clearing it.
    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Clear the latched fault, if any.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_latency_elapses_is_not_ready() {
        let mut mem = Memory::default();
        let r1 = mem.clock(true, Rw::Rd, 0x3000, 0);
        let r2 = mem.clock(true, Rw::Rd, 0x3000, 0);
        assert!(!r1.ready);
        assert!(!r2.ready);
    }

    #[test]
    fn read_asserts_ready_after_configured_latency() {
        let mut mem = Memory::new(MemoryConfig {
            size: 0x4000,
            clock_latency: 3,
        });
        mem.write(0x3000, 0x1234);

        mem.clock(true, Rw::Rd, 0x3000, 0);
        mem.clock(true, Rw::Rd, 0x3000, 0);
        let result = mem.clock(true, Rw::Rd, 0x3000, 0);

        assert!(result.ready);
        assert_eq!(result.data_out, 0x1234);
    }

    #[test]
    fn write_commits_on_ready_cycle() {
        let mut mem = Memory::default();
        mem.clock(true, Rw::Wr, 0x3001, 0xbeef);
        mem.clock(true, Rw::Wr, 0x3001, 0xbeef);
        let result = mem.clock(true, Rw::Wr, 0x3001, 0xbeef);

        assert!(result.ready);
        assert_eq!(mem.read(0x3001), 0xbeef);
    }

    #[test]
    fn disabling_mio_en_does_not_reset_the_latency_counter() {
        let mut mem = Memory::default();
        mem.clock(true, Rw::Rd, 0x3000, 0); // count -> 1
        mem.clock(false, Rw::Rd, 0x3000, 0); // no-op, count stays 1
        let r1 = mem.clock(true, Rw::Rd, 0x3000, 0); // count -> 2
        let r2 = mem.clock(true, Rw::Rd, 0x3000, 0); // count -> 3, latency reached
        assert!(!r1.ready);
        assert!(r2.ready);
    }

    #[test]
    fn load_image_writes_sequential_words() {
        let mut mem = Memory::default();
        mem.load_image(0x3000, &[0x1111, 0x2222, 0x3333]);
        assert_eq!(mem.read(0x3000), 0x1111);
        assert_eq!(mem.read(0x3001), 0x2222);
        assert_eq!(mem.read(0x3002), 0x3333);
    }

    #[test]
    fn out_of_range_access_is_recorded_as_a_fault_not_a_panic() {
        let mut mem = Memory::new(MemoryConfig {
            size: 0x10,
            clock_latency: 1,
        });
        let result = mem.clock(true, Rw::Rd, 0xffff, 0);
        assert!(result.ready);
        assert_eq!(mem.fault(), Some(Fault::AddressOutOfRange(0xffff)));
    }
}
