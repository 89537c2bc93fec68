//! Crash-safe persistence of the Fault Manager's in-flight processing state
//! (spec §3 "Persistence record", §4.2 "Persistence", §6 `event_data.bin`).
//!
//! Field layout is a fixed external contract, so — following the same
//! discipline as `si_common::frame::RawFrame` — it is packed and unpacked
//! explicitly rather than derived through a generic serializer.

use std::io::Write;
use std::path::Path;

use si_common::events::{EventId, NotificationTarget, Severity};
use si_itcom::error_event::ErrorEvent;
use si_itcom::snapshot::SystemSnapshot;

use crate::error::FmError;

/// `i16 processing_flag` header.
const FLAG_LEN: usize = 2;
/// Fixed size of the serialized `ErrorEvent` record that follows the flag
/// when `processing_flag != 0`.
const EVENT_LEN: usize = 1 + 1 + 1 + 8 + 4 + 1 + 1 + 20;

fn severity_to_u8(s: Severity) -> u8 {
    match s {
        Severity::Minor => 0,
        Severity::Normal => 1,
        Severity::Critical => 2,
    }
}

fn severity_from_u8(v: u8) -> Severity {
    match v {
        2 => Severity::Critical,
        1 => Severity::Normal,
        _ => Severity::Minor,
    }
}

fn notification_to_u8(n: NotificationTarget) -> u8 {
    match n {
        NotificationTarget::NotifySm => 0,
        NotificationTarget::NotifyExternalSystem => 1,
        NotificationTarget::None => 2,
    }
}

fn notification_from_u8(v: u8) -> NotificationTarget {
    match v {
        0 => NotificationTarget::NotifySm,
        1 => NotificationTarget::NotifyExternalSystem,
        _ => NotificationTarget::None,
    }
}

fn encode_event(event: &ErrorEvent) -> [u8; EVENT_LEN] {
    let mut buf = [0u8; EVENT_LEN];
    buf[0] = event.event_id.as_u8();
    buf[1] = severity_to_u8(event.severity);
    buf[2] = notification_to_u8(event.notification);
    buf[3..11].copy_from_slice(&event.counter.to_le_bytes());
    buf[11..15].copy_from_slice(&event.snapshot.vehicle_speed.to_le_bytes());
    buf[15] = event.snapshot.gear_shift_position;
    buf[16] = event.snapshot.si_state;
    buf[17..37].copy_from_slice(&event.snapshot.system_time);
    buf
}

fn decode_event(bytes: &[u8]) -> Result<ErrorEvent, FmError> {
    if bytes.len() < EVENT_LEN {
        return Err(FmError::Truncated {
            got: bytes.len(),
            need: EVENT_LEN,
        });
    }
    let event_id = EventId::from_u8(bytes[0]).unwrap_or(EventId::UnknownEventId);
    let severity = severity_from_u8(bytes[1]);
    let notification = notification_from_u8(bytes[2]);
    let mut counter_bytes = [0u8; 8];
    counter_bytes.copy_from_slice(&bytes[3..11]);
    let counter = u64::from_le_bytes(counter_bytes);
    let mut speed_bytes = [0u8; 4];
    speed_bytes.copy_from_slice(&bytes[11..15]);
    let vehicle_speed = f32::from_le_bytes(speed_bytes);
    let gear_shift_position = bytes[15];
    let si_state = bytes[16];
    let mut system_time = [0u8; 20];
    system_time.copy_from_slice(&bytes[17..37]);
    Ok(ErrorEvent {
        event_id,
        counter,
        severity,
        notification,
        snapshot: SystemSnapshot {
            vehicle_speed,
            gear_shift_position,
            si_state,
            system_time,
        },
    })
}

/// Snapshot of what's durable across a restart (spec §3): the processing
/// flag, and the in-flight event iff the flag is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceRecord {
    pub processing_flag: i16,
    pub current_event: Option<ErrorEvent>,
}

impl PersistenceRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FLAG_LEN + EVENT_LEN);
        buf.extend_from_slice(&self.processing_flag.to_le_bytes());
        if self.processing_flag != 0 {
            if let Some(event) = &self.current_event {
                buf.extend_from_slice(&encode_event(event));
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FmError> {
        if bytes.len() < FLAG_LEN {
            return Err(FmError::Truncated {
                got: bytes.len(),
                need: FLAG_LEN,
            });
        }
        let mut flag_bytes = [0u8; 2];
        flag_bytes.copy_from_slice(&bytes[0..FLAG_LEN]);
        let processing_flag = i16::from_le_bytes(flag_bytes);
        let current_event = if processing_flag != 0 {
            Some(decode_event(&bytes[FLAG_LEN..])?)
        } else {
            None
        };
        Ok(Self {
            processing_flag,
            current_event,
        })
    }

    /// Write atomically: write to a sibling temp file, then rename over the
    /// target (spec §4.2: "written whenever the processing flag changes or
    /// between stages").
    pub fn write_atomic(&self, path: &Path) -> Result<(), FmError> {
        let tmp_path = path.with_extension("bin.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&self.encode())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read from `path`. Absence of the file is not an error (spec §4.2,
    /// §6): a cold start is reported as an all-zero record.
    pub fn read_or_cold_start(path: &Path) -> Result<Self, FmError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self {
                processing_flag: 0,
                current_event: None,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> ErrorEvent {
        ErrorEvent::raise(EventId::FaultMsgCrcCheck, SystemSnapshot::capture(42.5, 3, 1, 1_700_000_000))
    }

    #[test]
    fn round_trips_cold_record() {
        let record = PersistenceRecord {
            processing_flag: 0,
            current_event: None,
        };
        let decoded = PersistenceRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn round_trips_in_flight_record() {
        let mut event = sample_event();
        event.counter = 7;
        let record = PersistenceRecord {
            processing_flag: 1,
            current_event: Some(event),
        };
        let decoded = PersistenceRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn write_then_read_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_data.bin");
        let mut event = sample_event();
        event.counter = 3;
        let record = PersistenceRecord {
            processing_flag: 1,
            current_event: Some(event),
        };
        record.write_atomic(&path).unwrap();
        let read_back = PersistenceRecord::read_or_cold_start(&path).unwrap();
        assert_eq!(read_back, record);
    }

    #[test]
    fn missing_file_reads_as_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.bin");
        let record = PersistenceRecord::read_or_cold_start(&path).unwrap();
        assert_eq!(record.processing_flag, 0);
        assert!(record.current_event.is_none());
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let err = PersistenceRecord::decode(&[0u8]).unwrap_err();
        assert!(matches!(err, FmError::Truncated { .. }));
    }
}
