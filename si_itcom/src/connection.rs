//! Per-connection lifecycle state observed by ICM (spec §4.1).
//!
//! Socket setup and accept/connect are out of scope (spec §1); this only
//! tracks the state ICM needs to decide whether to attempt a receive/transmit.

/// Observed lifecycle of one established byte-stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Error,
}

/// The two peer connections the SI core speaks to (spec §1, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStates {
    pub vam: ConnectionState,
    pub cm: ConnectionState,
}

impl Default for ConnectionStates {
    fn default() -> Self {
        Self {
            vam: ConnectionState::Connected,
            cm: ConnectionState::Connected,
        }
    }
}

use si_common::dictionary::ConnectionRole;

impl ConnectionStates {
    pub const fn state(&self, role: ConnectionRole) -> ConnectionState {
        match role {
            ConnectionRole::Vam => self.vam,
            ConnectionRole::Cm => self.cm,
        }
    }

    pub fn set_state(&mut self, role: ConnectionRole, state: ConnectionState) {
        match role {
            ConnectionRole::Vam => self.vam = state,
            ConnectionRole::Cm => self.cm = state,
        }
    }
}
