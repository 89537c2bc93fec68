//! The staged, interruptible error-event processor (spec §4.2): a
//! resumable finite-state machine over the `EventQueue` head, persisted to
//! disk between stages so a crash or restart resumes exactly where it left
//! off (spec §9: "model as an explicit finite-state value ... persisted to
//! disk, not as coroutine state").

use std::path::Path;
use std::time::{Duration, Instant};

use si_itcom::context::Itcom;
use si_itcom::error_event::ErrorEvent;

use crate::error::FmError;
use crate::log_sink::LogSink;
use crate::persistence::PersistenceRecord;

/// Stage 0: `IncrementCounter`.
const STAGE_INCREMENT_COUNTER: u8 = 0;
/// Stage 1: `InvokeNotification`.
const STAGE_INVOKE_NOTIFICATION: u8 = 1;
/// Stage 2: `LogEvent`.
const STAGE_LOG_EVENT: u8 = 2;
/// Stage 3: `DequeueProcessed`.
const STAGE_DEQUEUE_PROCESSED: u8 = 3;
/// One past the last stage: processing is complete (spec §4.2 step 3).
const STAGE_DONE: u8 = 4;

/// Where a processed event's notification is routed (spec §9's "small set
/// of notification handlers"), dependency-injected the same way ICM takes a
/// `FrameConnection` rather than holding a raw function pointer.
pub trait FaultNotifier {
    fn notify_sm(&mut self, event: &ErrorEvent);
    fn notify_external_system(&mut self, event: &ErrorEvent);
}

/// A `FaultNotifier` that does nothing — the default when no collaborator
/// is wired up (e.g. a standalone FM worker in a test harness).
#[derive(Debug, Default)]
pub struct NullNotifier;

impl FaultNotifier for NullNotifier {
    fn notify_sm(&mut self, _event: &ErrorEvent) {}
    fn notify_external_system(&mut self, _event: &ErrorEvent) {}
}

/// In-memory `FaultNotifier` test double recording every call, mirroring
/// `si_icm::connection::ChannelFrameConnection`.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sm_calls: Vec<ErrorEvent>,
    pub external_calls: Vec<ErrorEvent>,
}

impl FaultNotifier for RecordingNotifier {
    fn notify_sm(&mut self, event: &ErrorEvent) {
        self.sm_calls.push(*event);
    }
    fn notify_external_system(&mut self, event: &ErrorEvent) {
        self.external_calls.push(*event);
    }
}

fn timestamp(now_unix_secs: u64) -> String {
    format!("{}", now_unix_secs)
}

/// The stepwise processor itself. Owns only the wall-clock deadline for the
/// event currently in flight — every other piece of state (`processing_flag`,
/// `current_event`, `processing_stage`, the `EventQueue`) lives in the shared
/// `SharedContext` (spec §5: FM staging is linearizable per event because
/// there is a single FM worker, so this struct is never shared across threads).
pub struct FmProcessor {
    deadline: Option<Instant>,
}

impl FmProcessor {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Startup recovery (spec §4.2 "Persistence"): if the persisted flag was
    /// set, the queue is cleared, counters reset, and the persisted event is
    /// re-enqueued so Stage0 starts fresh for it. Absence of the file (a
    /// `PersistenceRecord` with `processing_flag == 0`) is a no-op.
    pub fn restore(itcom: &Itcom, record: PersistenceRecord) -> Self {
        if record.processing_flag != 0 {
            if let Some(event) = record.current_event {
                itcom.with(|ctx| {
                    ctx.event_queue.drain_all();
                    ctx.event_counters = [0; si_common::events::EVENT_ID_COUNT];
                    ctx.event_queue.enqueue(event);
                    ctx.processing_flag = 0;
                    ctx.current_event = None;
                    ctx.processing_stage = 0;
                });
            }
        }
        Self { deadline: None }
    }

    /// Run one tick of the stage machine (spec §4.2). `budget` is the
    /// wall-clock processing ceiling (spec §5, default 5s); `should_yield`
    /// models the FM's try-wait on its tick semaphore (spec §5) — when it
    /// returns `true`, the current stage's progress is persisted and control
    /// returns to the caller, resuming at the same stage next tick.
    pub fn tick(
        &mut self,
        itcom: &Itcom,
        log_sink: &mut LogSink,
        persistence_path: &Path,
        notifier: &mut dyn FaultNotifier,
        budget: Duration,
        now_unix_secs: u64,
        mut should_yield: impl FnMut() -> bool,
    ) -> Result<(), FmError> {
        loop {
            let started = itcom.with(|ctx| {
                if ctx.current_event.is_some() {
                    return false;
                }
                let Some(event) = ctx.event_queue.head().copied() else {
                    return false;
                };
                ctx.current_event = Some(event);
                ctx.processing_flag = 1;
                ctx.processing_stage = STAGE_INCREMENT_COUNTER;
                true
            });
            if started {
                self.deadline = Some(Instant::now() + budget);
                tracing::info!("START PROCESSING EVENT");
            }

            let Some(event) = itcom.with(|ctx| ctx.current_event) else {
                return Ok(());
            };
            let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + budget);

            if Instant::now() >= deadline {
                log_sink.log_special(&timestamp(now_unix_secs), "FM PROCESSING BUDGET EXCEEDED")?;
                tracing::warn!(event_id = event.event_id.name(), "fault manager processing exceeded its wall-clock budget");
                return Ok(());
            }

            let stage = itcom.with(|ctx| ctx.processing_stage);
            match stage {
                STAGE_INCREMENT_COUNTER => {
                    itcom.with(|ctx| {
                        let idx = event.event_id.as_u8() as usize;
                        ctx.event_counters[idx] = ctx.event_counters[idx].saturating_add(1);
                        if let Some(current) = ctx.current_event.as_mut() {
                            current.counter = ctx.event_counters[idx];
                        }
                    });
                }
                STAGE_INVOKE_NOTIFICATION => {
                    use si_common::events::NotificationTarget;
                    match event.notification {
                        NotificationTarget::NotifySm => notifier.notify_sm(&event),
                        NotificationTarget::NotifyExternalSystem => notifier.notify_external_system(&event),
                        NotificationTarget::None => {}
                    }
                }
                STAGE_LOG_EVENT => {
                    let event = itcom.with(|ctx| ctx.current_event).unwrap_or(event);
                    log_sink.log_event(&timestamp(now_unix_secs), &event)?;
                }
                STAGE_DEQUEUE_PROCESSED => {
                    itcom.with(|ctx| {
                        let _ = ctx.event_queue.dequeue_head();
                    });
                }
                _ => {}
            }

            let (flag, current, next_stage) = itcom.with(|ctx| {
                ctx.processing_stage = ctx.processing_stage.saturating_add(1);
                (ctx.processing_flag, ctx.current_event, ctx.processing_stage)
            });
            PersistenceRecord {
                processing_flag: flag,
                current_event: current,
            }
            .write_atomic(persistence_path)?;

            if next_stage >= STAGE_DONE {
                tracing::info!("FINISH PROCESSING EVENT");
                itcom.with(|ctx| {
                    ctx.processing_flag = 0;
                    ctx.current_event = None;
                    ctx.processing_stage = 0;
                });
                PersistenceRecord {
                    processing_flag: 0,
                    current_event: None,
                }
                .write_atomic(persistence_path)?;
                self.deadline = None;
                let remaining = itcom.with(|ctx| ctx.event_queue.len());
                tracing::info!(remaining, "remaining queued events after processing");
                return Ok(());
            }

            if should_yield() {
                return Ok(());
            }
        }
    }

    /// Shutdown behavior (spec §4.2): drain every remaining queued event
    /// with a "SKIPPED EVENT" marker, then clear the queue. The event
    /// currently mid-flight (if any) is left as-is in `SharedContext` so its
    /// persisted record survives for the next startup's `restore`.
    pub fn shutdown(itcom: &Itcom, log_sink: &mut LogSink, now_unix_secs: u64) -> Result<(), FmError> {
        let drained = itcom.with(|ctx| ctx.event_queue.drain_all());
        let ts = timestamp(now_unix_secs);
        for event in drained.iter() {
            log_sink.log_skipped(&ts, event)?;
        }
        Ok(())
    }
}

impl Default for FmProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use si_common::config::SiConfig;
    use si_common::events::EventId;
    use si_itcom::context::SharedContext;
    use si_itcom::snapshot::SystemSnapshot;

    fn itcom() -> Itcom {
        Itcom::new(SharedContext::new(&SiConfig::default(), 0))
    }

    fn sink(dir: &tempfile::TempDir) -> LogSink {
        LogSink::open(dir.path().join("events.log"), 10 * 1024 * 1024, 5).unwrap()
    }

    #[test]
    fn full_tick_processes_one_event_end_to_end() {
        let itcom = itcom();
        itcom.with(|ctx| ctx.raise_event(EventId::FaultMsgCrcCheck));
        let dir = tempfile::tempdir().unwrap();
        let mut log_sink = sink(&dir);
        let persistence_path = dir.path().join("event_data.bin");
        let mut notifier = RecordingNotifier::default();
        let mut proc = FmProcessor::new();

        proc.tick(
            &itcom,
            &mut log_sink,
            &persistence_path,
            &mut notifier,
            Duration::from_secs(5),
            0,
            || false,
        )
        .unwrap();

        assert_eq!(itcom.with(|ctx| ctx.event_queue.len()), 0);
        assert_eq!(itcom.with(|ctx| ctx.processing_flag), 0);
        let logged = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
        assert!(logged.contains("FAULT_MSG_CRC_CHECK"));
        assert_eq!(notifier.sm_calls.len(), 1);
    }

    #[test]
    fn yield_preserves_stage_for_next_tick() {
        let itcom = itcom();
        itcom.with(|ctx| ctx.raise_event(EventId::FaultMsgCrcCheck));
        let dir = tempfile::tempdir().unwrap();
        let mut log_sink = sink(&dir);
        let persistence_path = dir.path().join("event_data.bin");
        let mut notifier = NullNotifier;
        let mut proc = FmProcessor::new();

        // Yield after every stage: only Stage0 should run this tick.
        proc.tick(
            &itcom,
            &mut log_sink,
            &persistence_path,
            &mut notifier,
            Duration::from_secs(5),
            0,
            || true,
        )
        .unwrap();

        assert_eq!(itcom.with(|ctx| ctx.processing_stage), 1);
        assert_eq!(itcom.with(|ctx| ctx.processing_flag), 1);
        let record = PersistenceRecord::read_or_cold_start(&persistence_path).unwrap();
        assert_eq!(record.processing_flag, 1);
        assert!(record.current_event.is_some());

        // Resume: drive to completion.
        for _ in 0..4 {
            proc.tick(
                &itcom,
                &mut log_sink,
                &persistence_path,
                &mut notifier,
                Duration::from_secs(5),
                0,
                || true,
            )
            .unwrap();
        }
        assert_eq!(itcom.with(|ctx| ctx.processing_flag), 0);
        assert_eq!(itcom.with(|ctx| ctx.event_queue.len()), 0);
    }

    #[test]
    fn counter_increments_are_independent_of_queue_eviction() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.raise_event(EventId::FaultMsgCrcCheck);
            ctx.raise_event(EventId::FaultMsgCrcCheck);
        });
        let dir = tempfile::tempdir().unwrap();
        let mut log_sink = sink(&dir);
        let persistence_path = dir.path().join("event_data.bin");
        let mut notifier = NullNotifier;
        let mut proc = FmProcessor::new();

        proc.tick(&itcom, &mut log_sink, &persistence_path, &mut notifier, Duration::from_secs(5), 0, || false)
            .unwrap();
        proc.tick(&itcom, &mut log_sink, &persistence_path, &mut notifier, Duration::from_secs(5), 0, || false)
            .unwrap();

        let counter = itcom.with(|ctx| ctx.event_counters[EventId::FaultMsgCrcCheck.as_u8() as usize]);
        assert_eq!(counter, 2);
    }

    #[test]
    fn restore_reenqueues_in_flight_event_for_fresh_stage0() {
        let itcom = itcom();
        let event = ErrorEvent::raise(EventId::FaultRollCount, SystemSnapshot::capture(0.0, 0, 0, 0));
        let record = PersistenceRecord {
            processing_flag: 1,
            current_event: Some(event),
        };
        let _proc = FmProcessor::restore(&itcom, record);

        assert_eq!(itcom.with(|ctx| ctx.event_queue.len()), 1);
        assert_eq!(itcom.with(|ctx| ctx.processing_flag), 0);
        assert!(itcom.with(|ctx| ctx.current_event.is_none()));
    }

    #[test]
    fn restore_cold_start_is_a_no_op() {
        let itcom = itcom();
        let record = PersistenceRecord {
            processing_flag: 0,
            current_event: None,
        };
        let _proc = FmProcessor::restore(&itcom, record);
        assert_eq!(itcom.with(|ctx| ctx.event_queue.len()), 0);
    }

    #[test]
    fn shutdown_logs_skipped_marker_for_each_remaining_event() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.raise_event(EventId::FaultMsgCrcCheck);
            ctx.raise_event(EventId::FaultRollCount);
        });
        let dir = tempfile::tempdir().unwrap();
        let mut log_sink = sink(&dir);

        FmProcessor::shutdown(&itcom, &mut log_sink, 0).unwrap();

        assert_eq!(itcom.with(|ctx| ctx.event_queue.len()), 0);
        let logged = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
        assert_eq!(logged.matches("SKIPPED EVENT").count(), 2);
    }
}
