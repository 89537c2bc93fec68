//! Structured vehicle-state snapshot captured into error events (spec §3,
//! "Snapshot Capture").

use serde::{Deserialize, Serialize};

/// `{vehicle_speed, gear_shift_position, si_state, system_time}` captured at
/// enqueue time, not at processing time (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub vehicle_speed: f32,
    pub gear_shift_position: u8,
    pub si_state: u8,
    /// Fixed-width timestamp string, e.g. `"2026-07-27T10:15:00Z"` truncated/padded to 20 bytes.
    pub system_time: [u8; 20],
}

impl SystemSnapshot {
    /// Capture the current snapshot fields, formatting `unix_time_secs` into
    /// the fixed 20-byte `system_time` field (spec §3).
    pub fn capture(vehicle_speed: f32, gear_shift_position: u8, si_state: u8, unix_time_secs: u64) -> Self {
        let formatted = format!("{:020}", unix_time_secs);
        let mut system_time = [0u8; 20];
        let bytes = formatted.as_bytes();
        let take = bytes.len().min(20);
        system_time[..take].copy_from_slice(&bytes[..take]);
        Self {
            vehicle_speed,
            gear_shift_position,
            si_state,
            system_time,
        }
    }

    pub fn system_time_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.system_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_fills_all_fields() {
        let snap = SystemSnapshot::capture(42.5, 3, 1, 1_700_000_000);
        assert_eq!(snap.vehicle_speed, 42.5);
        assert_eq!(snap.gear_shift_position, 3);
        assert_eq!(snap.si_state, 1);
        assert!(snap.system_time_str().contains("1700000000"));
    }
}
