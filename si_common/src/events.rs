//! Static fault/info event identifiers (spec §3, §7) and their severities.
//!
//! These are distinct from `FrameError`/`DictionaryError`: an `EventId` is
//! what actually flows into the Fault Manager's `EventQueue`, not a decode
//! failure.

/// Severity tier of an `ErrorEvent` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Minor = 0,
    Normal = 1,
    Critical = 2,
}

/// Which collaborator an `ErrorEvent` notifies, per spec §9 ("model as a
/// tagged variant selecting among a small set of notification handlers; do
/// not expose arbitrary-pointer fields").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget {
    NotifySm,
    NotifyExternalSystem,
    None,
}

/// The closed set of static fault/info event ids (spec §3: "~26 static event IDs").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventId {
    FaultMsgCrcCheck = 0,
    FaultRollCount = 1,
    FaultMsgTimeout = 2,
    FaultEcuCriticalFail = 3,
    FaultEcuNonCriticalFail = 4,
    FaultStartupMemError = 5,
    FaultSmTransitionError = 6,
    FaultCycleOverrun = 7,
    FaultCalibTimeout = 8,
    FaultHeartbeatLost = 9,
    InfoVehicleStatusInvalidInfoError = 10,
    InfoAckUnsuccess = 11,
    InfoInvalidActionReq = 12,
    InfoRateLimiterDrop = 13,
    InfoTransmissionFailed = 14,
    InfoTimeoutLimit = 15,
    InfoApprovedRequest = 16,
    InfoCalibReadbackReceived = 17,
    InfoComfortControlRejected = 18,
    InfoDiagnosticTimeout = 19,
    InfoGearShiftRejected = 20,
    InfoSteeringRequestRejected = 21,
    InfoBrakeRequestRejected = 22,
    InfoPropulsionRequestRejected = 23,
    InfoConnectionLost = 24,
    UnknownEventId = 25,
}

pub const EVENT_ID_COUNT: usize = 26;

impl EventId {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        use EventId::*;
        Some(match v {
            0 => FaultMsgCrcCheck,
            1 => FaultRollCount,
            2 => FaultMsgTimeout,
            3 => FaultEcuCriticalFail,
            4 => FaultEcuNonCriticalFail,
            5 => FaultStartupMemError,
            6 => FaultSmTransitionError,
            7 => FaultCycleOverrun,
            8 => FaultCalibTimeout,
            9 => FaultHeartbeatLost,
            10 => InfoVehicleStatusInvalidInfoError,
            11 => InfoAckUnsuccess,
            12 => InfoInvalidActionReq,
            13 => InfoRateLimiterDrop,
            14 => InfoTransmissionFailed,
            15 => InfoTimeoutLimit,
            16 => InfoApprovedRequest,
            17 => InfoCalibReadbackReceived,
            18 => InfoComfortControlRejected,
            19 => InfoDiagnosticTimeout,
            20 => InfoGearShiftRejected,
            21 => InfoSteeringRequestRejected,
            22 => InfoBrakeRequestRejected,
            23 => InfoPropulsionRequestRejected,
            24 => InfoConnectionLost,
            25 => UnknownEventId,
            _ => return None,
        })
    }

    /// Static severity and notification target for this event id (spec §7's
    /// four error families). `System`-family events are always `Critical`
    /// and always notify the state machine; `Frame-integrity`/`Liveness`
    /// events are `Normal`; `Semantic` events are `Minor` unless otherwise
    /// noted.
    pub const fn severity(self) -> Severity {
        use EventId::*;
        match self {
            FaultEcuCriticalFail
            | FaultEcuNonCriticalFail
            | FaultStartupMemError
            | FaultSmTransitionError
            | FaultCycleOverrun => Severity::Critical,

            FaultMsgCrcCheck | FaultRollCount | FaultMsgTimeout | FaultCalibTimeout
            | FaultHeartbeatLost => Severity::Normal,

            _ => Severity::Minor,
        }
    }

    pub const fn notification_target(self) -> NotificationTarget {
        use EventId::*;
        match self {
            FaultEcuCriticalFail
            | FaultEcuNonCriticalFail
            | FaultStartupMemError
            | FaultSmTransitionError
            | FaultCycleOverrun
            | FaultMsgTimeout => NotificationTarget::NotifySm,

            InfoInvalidActionReq
            | InfoRateLimiterDrop
            | InfoTransmissionFailed
            | InfoTimeoutLimit
            | InfoApprovedRequest => NotificationTarget::NotifyExternalSystem,

            _ => NotificationTarget::None,
        }
    }

    /// Human-readable name used in the FM's log record format (spec §6).
    pub const fn name(self) -> &'static str {
        use EventId::*;
        match self {
            FaultMsgCrcCheck => "FAULT_MSG_CRC_CHECK",
            FaultRollCount => "FAULT_ROLL_COUNT",
            FaultMsgTimeout => "FAULT_MSG_TIMEOUT",
            FaultEcuCriticalFail => "FAULT_ECU_CRITICAL_FAIL",
            FaultEcuNonCriticalFail => "FAULT_ECU_NON_CRITICAL_FAIL",
            FaultStartupMemError => "FAULT_STARTUP_MEM_ERROR",
            FaultSmTransitionError => "FAULT_SM_TRANSITION_ERROR",
            FaultCycleOverrun => "FAULT_CYCLE_OVERRUN",
            FaultCalibTimeout => "FAULT_CALIB_TIMEOUT",
            FaultHeartbeatLost => "FAULT_HEARTBEAT_LOST",
            InfoVehicleStatusInvalidInfoError => "INFO_VEHICLE_STATUS_INVALID_INFO_ERROR",
            InfoAckUnsuccess => "INFO_ACK_UNSUCCESS",
            InfoInvalidActionReq => "INFO_INVALID_ACTION_REQ",
            InfoRateLimiterDrop => "INFO_RATE_LIMITER_DROP",
            InfoTransmissionFailed => "INFO_TRANSMISSION_FAILED",
            InfoTimeoutLimit => "INFO_TIMEOUT_LIMIT",
            InfoApprovedRequest => "INFO_APPROVED_REQUEST",
            InfoCalibReadbackReceived => "INFO_CALIB_READBACK_RECEIVED",
            InfoComfortControlRejected => "INFO_COMFORT_CONTROL_REJECTED",
            InfoDiagnosticTimeout => "INFO_DIAGNOSTIC_TIMEOUT",
            InfoGearShiftRejected => "INFO_GEAR_SHIFT_REJECTED",
            InfoSteeringRequestRejected => "INFO_STEERING_REQUEST_REJECTED",
            InfoBrakeRequestRejected => "INFO_BRAKE_REQUEST_REJECTED",
            InfoPropulsionRequestRejected => "INFO_PROPULSION_REQUEST_REJECTED",
            InfoConnectionLost => "INFO_CONNECTION_LOST",
            UnknownEventId => "UNKNOWN_EVENT_ID",
        }
    }
}

/// Notification payload kinds sent to VAM over the `ActionNotification`
/// message (spec §4.1) — wire-level notifications, distinct from `EventId`
/// (which drives the Fault Manager's queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionNotificationKind {
    InvalidActionReq = 0,
    RateLimiterDrop = 1,
    TransmissionFailed = 2,
    TimeoutLimit = 3,
    ApprovedRequest = 4,
}
