//! The rotating fault-event log file (spec §4.2, §6): an exact,
//! spec-mandated on-disk record format, hand-written rather than delegated
//! to the ambient `tracing` framework (spec §2.2).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use si_common::events::Severity;
use si_itcom::error_event::ErrorEvent;

use crate::error::FmError;

fn severity_word(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL",
        Severity::Normal => "NORMAL",
        Severity::Minor => "MINOR",
    }
}

/// Appends fault-event records to `path`, rotating to `<path>.0 .. <path>.{generations-1}`
/// once the file reaches `rotate_bytes` (spec §4.2, §6).
pub struct LogSink {
    path: PathBuf,
    rotate_bytes: u64,
    generations: u8,
    file: File,
    written: u64,
}

impl LogSink {
    pub fn open(path: impl Into<PathBuf>, rotate_bytes: u64, generations: u8) -> Result<Self, FmError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            rotate_bytes,
            generations,
            file,
            written,
        })
    }

    /// Rotate `<log> -> <log>.0 -> ... -> <log>.{generations-1}`, renaming in
    /// descending order before reopening a fresh `<log>` (spec §4.2: "rotation
    /// renames in descending order before reopening").
    fn rotate(&mut self) -> Result<(), FmError> {
        if self.generations == 0 {
            // Nothing to keep: just truncate in place.
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = generation_path(&self.path, self.generations - 1);
        let _ = std::fs::remove_file(&oldest);

        for gen in (0..self.generations - 1).rev() {
            let from = generation_path(&self.path, gen);
            let to = generation_path(&self.path, gen + 1);
            if from.exists() {
                std::fs::rename(&from, &to)?;
            }
        }
        let first = generation_path(&self.path, 0);
        if self.path.exists() {
            std::fs::rename(&self.path, &first)?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), FmError> {
        if self.written >= self.rotate_bytes {
            self.rotate()?;
        }
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }

    /// Normal event record (spec §6 "EVENT LOGGED").
    pub fn log_event(&mut self, timestamp: &str, event: &ErrorEvent) -> Result<(), FmError> {
        let line = format!(
            "[{}]    EVENT LOGGED:    {} Fault-Level = {} Error_Event_Counter = {} VehicleSpeed = {} GearShiftPosition = {} ASI_State = {}",
            timestamp,
            event.event_id.name(),
            severity_word(event.severity),
            event.counter,
            event.snapshot.vehicle_speed,
            event.snapshot.gear_shift_position,
            event.snapshot.si_state,
        );
        self.write_line(&line)
    }

    /// Special-event record (spec §6 "SPECIAL EVENT"), used for conditions
    /// outside the normal stage pipeline (e.g. the FM budget overrun warning).
    pub fn log_special(&mut self, timestamp: &str, kind: &str) -> Result<(), FmError> {
        let line = format!("[{}] SPECIAL EVENT: {}", timestamp, kind);
        self.write_line(&line)
    }

    /// Skipped-event record (spec §4.2 shutdown: drained-but-unprocessed events).
    pub fn log_skipped(&mut self, timestamp: &str, event: &ErrorEvent) -> Result<(), FmError> {
        let line = format!(
            "[{}]        SKIPPED EVENT:    {}",
            timestamp,
            event.event_id.name()
        );
        self.write_line(&line)
    }
}

/// `<path>.{gen}` — the rotation sibling path for `gen` (0 = most recent rotation).
fn generation_path(path: &Path, gen: u8) -> PathBuf {
    let mut os = path.clone().into_os_string();
    os.push(format!(".{}", gen));
    PathBuf::from(os)
}
