//! The microsequencer: computes the next microstate from this cycle's `J`,
//! `COND`, and `IRD` fields plus the condition inputs they gate.

use super::signals::Cond;

/// Condition inputs the microsequencer's `COND`-gated offsets read.
///
/// `ben` and `acv` are the *latched* values from the previous cycle's
/// `LD_BEN`/`LD_ACV` — the sequencer decides the next state before this
/// cycle's loads apply, so a microstate that both sets and tests one of
/// these in the same cycle would be reading last cycle's value, never this
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionInputs {
    /// Memory-ready, valid immediately (not a latch: owned by the memory
    /// subsystem and read the same cycle it's produced).
    pub r: bool,
    /// The latched branch-enable flag.
    pub ben: bool,
    /// `IR[11]`, distinguishing `JSR` from `JSRR`.
    pub addressing_mode: bool,
    /// `PSR[15]`, the privilege bit.
    pub privilege_mode: bool,
    /// The host-driven interrupt line, read live (not a latch).
    pub int: bool,
    /// The latched access-control-violation flag.
    pub acv: bool,
}

/// Compute the next microstate.
///
/// In `IRD` mode the next state is `IR[15:12]` directly (the reference
/// architecture's instruction-register-dispatch trick: the opcode *is* the
/// state number for every instruction's first execute microstate).
/// Otherwise the next state is `J` plus whichever single offset `cond`
/// selects, based on `inputs`.
///
/// `IR[15:12]` is always in `0..16`, so narrowing it to `u8` never
/// truncates live data.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn next_state(ird: bool, j: u8, cond: Cond, ir: u16, inputs: ConditionInputs) -> u8 {
    if ird {
        return ((ir >> 12) & 0xf) as u8;
    }

    let offset = match cond {
        Cond::Unconditional => 0,
        Cond::MemoryReady => {
            if inputs.r {
                2
            } else {
                0
            }
        }
        Cond::Branch => {
            if inputs.ben {
                4
            } else {
                0
            }
        }
        Cond::AddressingMode => {
            if inputs.addressing_mode {
                1
            } else {
                0
            }
        }
        Cond::PrivilegeMode => {
            if inputs.privilege_mode {
                8
            } else {
                0
            }
        }
        Cond::InterruptTest => {
            if inputs.int {
                16
            } else {
                0
            }
        }
        Cond::AcvTest => {
            if inputs.acv {
                32
            } else {
                0
            }
        }
    };

    j + offset
}
