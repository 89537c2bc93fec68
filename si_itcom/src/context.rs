//! The mutex-guarded shared facade ITCOM surface (spec §3, §5).
//!
//! One `parking_lot::Mutex<SharedContext>`, no lock splitting (spec §9: "use
//! interior mutability only where profiling shows lock contention"). Every
//! cross-structure invariant in spec §4 (e.g. "remove tracker when matching
//! ACK arrives") is therefore trivially atomic: callers take the lock once
//! per operation and release it before doing any blocking I/O (spec §5:
//! "no suspension points within a critical section").

use std::sync::Arc;

use parking_lot::Mutex;
use si_common::dictionary::{Dictionary, MessageEnum, SeqAssigner};
use si_common::events::{ActionNotificationKind, EventId};

use crate::connection::ConnectionStates;
use crate::data_queue::{DataQueue, OverflowMode};
use crate::error_event::ErrorEvent;
use crate::event_queue::EventQueue;
use crate::instance_buffer::InstanceBuffer;
use crate::messages::{ActionReqTimer, ActionRequestMsg, Freshness, ProcessMsgData, SiState};
use crate::rate_limiter::RateLimiter;
use crate::snapshot::SystemSnapshot;
use crate::tracker::{CalibReadbackEntry, MessageTracker};

use si_common::dictionary::MESSAGE_ENUM_COUNT;
use si_common::events::EVENT_ID_COUNT;

pub const ACTION_TRACKER_CAP: usize = 32;
pub const CALIB_TRACKER_CAP: usize = 8;
pub const ACTION_REQUEST_QUEUE_CAP: usize = 32;
pub const APPROVED_QUEUE_CAP: usize = 32;
pub const SAFE_STATE_QUEUE_CAP: usize = 16;

/// Per-enum rolling-counter pairs `(rx, tx)` (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct RollingCounters {
    pub rx: [u16; MESSAGE_ENUM_COUNT],
    pub tx: [u16; MESSAGE_ENUM_COUNT],
}

impl Default for RollingCounters {
    fn default() -> Self {
        Self {
            rx: [0; MESSAGE_ENUM_COUNT],
            tx: [0; MESSAGE_ENUM_COUNT],
        }
    }
}

/// All cross-thread state ICM, FM, and the (external) state machine share
/// (spec §3 "Ownership", §5 "Shared-resource policy").
pub struct SharedContext {
    pub dictionary: Dictionary,

    pub rolling: RollingCounters,
    pub asi_seq: [u16; MESSAGE_ENUM_COUNT],
    pub crc_error_count: [u8; MESSAGE_ENUM_COUNT],
    pub rc_error_count: [u8; MESSAGE_ENUM_COUNT],
    pub crc_error_max: u8,
    pub rc_error_limit: u8,

    pub action_req_timers: InstanceBuffer<ActionReqTimer, ACTION_TRACKER_CAP>,
    pub action_msg_buffer: InstanceBuffer<MessageTracker, ACTION_TRACKER_CAP>,
    pub calib_copy_buffer: InstanceBuffer<MessageTracker, CALIB_TRACKER_CAP>,
    pub calib_readback_buffer: InstanceBuffer<CalibReadbackEntry, CALIB_TRACKER_CAP>,

    pub action_request_queue: DataQueue<ActionRequestMsg, ACTION_REQUEST_QUEUE_CAP>,
    pub approved_actions_queue: DataQueue<ProcessMsgData, APPROVED_QUEUE_CAP>,
    pub safe_state_queue: DataQueue<ProcessMsgData, SAFE_STATE_QUEUE_CAP>,

    pub rate_limiter: RateLimiter,
    pub connections: ConnectionStates,

    pub snapshot: SystemSnapshot,
    pub park_status: Freshness,
    pub vehicle_speed_status: Freshness,
    pub si_state: SiState,

    pub event_queue: EventQueue,
    pub event_counters: [u64; EVENT_ID_COUNT],
    pub processing_flag: i16,
    pub current_event: Option<ErrorEvent>,
    pub processing_stage: u8,

    pub global_cycle: u16,
}

impl SharedContext {
    /// Build the shared facade from startup configuration (spec §3.1):
    /// `config.rate_limiter` seeds the `RateLimiter`, and
    /// `config.crc_error_max`/`config.rolling_counter_error_limit` seed the
    /// receive-path threshold-and-reset counters (spec §4.1 step 4).
    pub fn new(config: &si_common::config::SiConfig, now_ms: u64) -> Self {
        Self {
            dictionary: Dictionary,
            rolling: RollingCounters::default(),
            asi_seq: [0; MESSAGE_ENUM_COUNT],
            crc_error_count: [0; MESSAGE_ENUM_COUNT],
            rc_error_count: [0; MESSAGE_ENUM_COUNT],
            crc_error_max: config.crc_error_max,
            rc_error_limit: config.rolling_counter_error_limit,
            action_req_timers: InstanceBuffer::new(),
            action_msg_buffer: InstanceBuffer::new(),
            calib_copy_buffer: InstanceBuffer::new(),
            calib_readback_buffer: InstanceBuffer::new(),
            action_request_queue: DataQueue::new(OverflowMode::RefuseOnFull),
            approved_actions_queue: DataQueue::new(OverflowMode::RefuseOnFull),
            safe_state_queue: DataQueue::new(OverflowMode::RefuseOnFull),
            rate_limiter: RateLimiter::new(config.rate_limiter, now_ms),
            connections: ConnectionStates::default(),
            snapshot: SystemSnapshot::capture(0.0, 0, 0, 0),
            park_status: Freshness::Outdated,
            vehicle_speed_status: Freshness::Outdated,
            si_state: SiState::StartupTest,
            event_queue: EventQueue::new(),
            event_counters: [0; EVENT_ID_COUNT],
            processing_flag: 0,
            current_event: None,
            processing_stage: 0,
            global_cycle: 0,
        }
    }

    /// Raise a fault/info event into the shared `EventQueue` (spec §4.2
    /// enqueue policy). Called from ICM validation/dispatch and from FM
    /// itself for unrecognized event ids.
    pub fn raise_event(&mut self, event_id: EventId) -> bool {
        let event = ErrorEvent::raise(event_id, self.snapshot);
        self.event_queue.enqueue(event)
    }

    /// Current rolling-counter pair for `message_enum`.
    pub fn rc_pair(&self, message_enum: MessageEnum) -> (u16, u16) {
        let idx = message_enum.as_u8() as usize;
        (self.rolling.rx[idx], self.rolling.tx[idx])
    }

    /// Record the per-(id, seq) start timestamp for an inbound Action-Request-class
    /// frame (spec §4.1 receive step 2), keyed to the current tick count.
    pub fn record_action_req_start(&mut self, id: u16, seq_num: u16) {
        self.action_req_timers.add(ActionReqTimer {
            id,
            seq_num,
            start_cycle: self.global_cycle,
        });
    }

    /// Queue an `ActionNotification` frame for the transmit path (spec §4.1:
    /// "emit an Action Notification X"), keyed to the originating `(id,
    /// seq_num)` so VAM can correlate it. Best-effort: silently dropped if
    /// the approved-actions queue has no room, matching the "no retry"
    /// policy the rest of the transmit path follows.
    pub fn queue_notification(&mut self, kind: ActionNotificationKind, id: u16, seq_num: u16) -> bool {
        let message_enum = MessageEnum::ActionNotification;
        let mut payload = [0u8; 8];
        payload[0] = kind as u8;
        let msg = ProcessMsgData {
            message_enum,
            id,
            seq_num: self.next_seq(message_enum, seq_num),
            length: 8,
            payload,
        };
        self.approved_actions_queue.push(msg).is_ok()
    }

    /// Queue a periodic `StatusNotificationASI` carrying the current SI
    /// state (spec §4.1 cycle-count updater, step 1).
    pub fn queue_status_notification(&mut self) -> bool {
        let message_enum = MessageEnum::StatusNotificationAsi;
        let mut payload = [0u8; 8];
        payload[0] = self.si_state.as_u8();
        let msg = ProcessMsgData {
            message_enum,
            id: 0,
            seq_num: self.next_seq(message_enum, 0),
            length: 8,
            payload,
        };
        self.approved_actions_queue.push(msg).is_ok()
    }

    fn next_seq(&self, message_enum: MessageEnum, fallback: u16) -> u16 {
        let integrity = self.dictionary.integrity_of(message_enum);
        match integrity.seq_assigner {
            SeqAssigner::Asi => self.asi_seq[message_enum.as_u8() as usize],
            SeqAssigner::Vam => fallback,
        }
    }
}

/// Shared, cloneable handle to the mutex-guarded facade.
#[derive(Clone)]
pub struct Itcom {
    inner: Arc<Mutex<SharedContext>>,
}

impl Itcom {
    pub fn new(context: SharedContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// Run `f` with exclusive access to the shared context. Callers must
    /// keep `f` free of blocking I/O (spec §5).
    pub fn with<R>(&self, f: impl FnOnce(&mut SharedContext) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}
