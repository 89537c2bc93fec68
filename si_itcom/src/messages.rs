//! Queued message payloads exchanged between ICM and the (external) state
//! machine via the shared facade (spec §4.1).

use si_common::dictionary::MessageEnum;

/// A received action request payload, queued for the state machine to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequestMsg {
    pub id: u16,
    pub seq_num: u16,
    pub value: [u8; 8],
}

/// Per-(id, seq) start timestamp for an inbound Action-Request-class frame
/// (spec §4.1 receive step 2), keyed to the tick at which it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReqTimer {
    pub id: u16,
    pub seq_num: u16,
    pub start_cycle: u16,
}

/// An approved/safe-state message ready for the ICM transmit path to frame
/// and send (spec §4.1 step 1-2: `ProcessMsgData`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMsgData {
    pub message_enum: MessageEnum,
    pub id: u16,
    pub seq_num: u16,
    pub length: u16,
    pub payload: [u8; 8],
}

/// Freshness tag for the cyclic vehicle-status fields (spec §4.1: `PRNDL`/`VehicleSpeed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Updated,
    Outdated,
}

/// Which approved-request source queue the transmit path pulls from (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiState {
    NormalOp,
    StartupTest,
    SafeState,
}

impl SiState {
    /// Encoding used in `SystemSnapshot::si_state` and `StatusNotificationAsi` payloads.
    pub const fn as_u8(self) -> u8 {
        match self {
            SiState::StartupTest => 0,
            SiState::NormalOp => 1,
            SiState::SafeState => 2,
        }
    }
}
