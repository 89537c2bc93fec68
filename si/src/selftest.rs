//! Startup self-test result (spec §6): RAM pattern/march and CRC self-check
//! are explicitly out of scope for this core (spec §1 — "treated as external
//! collaborators, consumed via interfaces only"). This module therefore owns
//! no test algorithm: it only defines the result shape and the trait seam a
//! real hardware/firmware probe is plugged into (mirroring how
//! `si_icm::connection::FrameConnection` isolates transport specifics behind
//! a trait rather than folding socket code into the receive/transmit paths).

/// Result of the startup self-test (spec §6). Produced entirely by whatever
/// implements `SelfTestSource`; any nonzero failure count, or a failed CRC
/// self-check, should raise `FAULT_STARTUP_MEM_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestReport {
    pub ram_pattern_failures: u32,
    pub ram_march_failures: u32,
    pub crc_self_check_ok: bool,
}

impl SelfTestReport {
    /// A report with no observed failures, for collaborators that have
    /// nothing further to add once they've run.
    pub const fn healthy() -> Self {
        SelfTestReport {
            ram_pattern_failures: 0,
            ram_march_failures: 0,
            crc_self_check_ok: true,
        }
    }

    pub fn failed(&self) -> bool {
        self.ram_pattern_failures > 0 || self.ram_march_failures > 0 || !self.crc_self_check_ok
    }
}

/// The external RAM pattern/march/CRC self-test collaborator (spec §1, §6).
/// The bit-level test algorithms live outside this core; an implementation
/// wraps whatever actually drives them (memory-mapped BIST registers, a
/// bootloader handoff block, a separate diagnostic process) and reports the
/// outcome through `run`.
pub trait SelfTestSource {
    fn run(&mut self) -> SelfTestReport;
}

/// Stand-in collaborator for builds with no hardware self-test probe wired
/// yet: always reports healthy. Swap for the real probe once one exists;
/// this core only ever consumes the trait.
pub struct StubSelfTestSource;

impl SelfTestSource for StubSelfTestSource {
    fn run(&mut self) -> SelfTestReport {
        SelfTestReport::healthy()
    }
}
