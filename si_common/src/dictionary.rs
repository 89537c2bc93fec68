//! The static Message Dictionary and Integrity Config Table (spec §3, §4.1).
//!
//! Both tables are built once and never mutated after startup; lookups are
//! linear scans over small fixed arrays, matching this codebase's general
//! preference for const-evaluable, no-heap-allocation tables over runtime
//! `HashMap`s for small closed sets.

use crate::error::DictionaryError;
use crate::events::EventId;

/// Dense index over the union of VAM-side, CM-side, and SI-side messages
/// (spec §3: "≈22 enumerants").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageEnum {
    ActionRequest = 0,
    ActionNotification = 1,
    StatusNotificationAsi = 2,
    Prndl = 3,
    VehicleSpeed = 4,
    AckVam = 5,
    AckCm = 6,
    CalibReadback = 7,
    TorqueVecMotorCalib = 8,
    ComfortControlRequest = 9,
    ComfortControlAck = 10,
    SteeringAngleRequest = 11,
    BrakeTorqueRequest = 12,
    PropulsionTorqueRequest = 13,
    GearShiftRequest = 14,
    CriticalFail = 15,
    NonCriticalFail = 16,
    HeartbeatVam = 17,
    HeartbeatCm = 18,
    DiagnosticRequest = 19,
    DiagnosticResponse = 20,
    CalibWriteRequest = 21,
}

pub const MESSAGE_ENUM_COUNT: usize = 22;

impl MessageEnum {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        use MessageEnum::*;
        Some(match v {
            0 => ActionRequest,
            1 => ActionNotification,
            2 => StatusNotificationAsi,
            3 => Prndl,
            4 => VehicleSpeed,
            5 => AckVam,
            6 => AckCm,
            7 => CalibReadback,
            8 => TorqueVecMotorCalib,
            9 => ComfortControlRequest,
            10 => ComfortControlAck,
            11 => SteeringAngleRequest,
            12 => BrakeTorqueRequest,
            13 => PropulsionTorqueRequest,
            14 => GearShiftRequest,
            15 => CriticalFail,
            16 => NonCriticalFail,
            17 => HeartbeatVam,
            18 => HeartbeatCm,
            19 => DiagnosticRequest,
            20 => DiagnosticResponse,
            21 => CalibWriteRequest,
            _ => return None,
        })
    }
}

/// Which connection a message is received on / destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Vam,
    Cm,
}

/// Who assigns the sequence number for a message enum (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqAssigner {
    Asi,
    Vam,
}

/// Which inbound message retires a `MessageTracker` for a given enum (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearCondition {
    AckVam,
    AckCm,
    CalibReadback,
    Init,
    None,
}

/// Per-message-enum integrity/timeout configuration (spec §3), read-only after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityConfig {
    pub timeout_limit: u16,
    pub cycle_count_enabled: bool,
    pub action_req_timer_enabled: bool,
    pub type_length_enabled: bool,
    pub crc_enabled: bool,
    pub rc_enabled: bool,
    pub rsn_enabled: bool,
    pub cyclic_enabled: bool,
    pub seq_assigner: SeqAssigner,
    pub timeout_event_id: EventId,
    pub clear_condition: ClearCondition,
}

struct DictionaryEntry {
    wire_type: u16,
    /// Sub-id discriminator, only present where more than one enum shares a
    /// `wire_type` (e.g. `Prndl`/`VehicleSpeed` both ride `0x0101`). `None`
    /// means the enum is classified by `(wire_type, role)` alone — the
    /// frame's `id` field is a per-instance value (spec §3's `id` header
    /// field, e.g. a request's `(id, seq)` pair) and must not be
    /// dictionary-constrained for these, or legitimate instance ids other
    /// than the table's placeholder would be rejected as unknown messages.
    sub_id: Option<u16>,
    role: Option<ConnectionRole>,
    message_enum: MessageEnum,
    length: u16,
}

/// One entry per `MessageEnum` variant, in declaration order, so indexing by
/// `as_u8()` is direct.
const INTEGRITY_TABLE: [IntegrityConfig; MESSAGE_ENUM_COUNT] = {
    use ClearCondition::*;
    use SeqAssigner::*;
    [
        // ActionRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // ActionNotification
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: false,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Asi,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // StatusNotificationAsi
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: false,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Asi,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // Prndl (cyclic CM status message)
        IntegrityConfig {
            timeout_limit: 40,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: true,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: Init,
        },
        // VehicleSpeed (cyclic CM status message)
        IntegrityConfig {
            timeout_limit: 40,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: true,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: Init,
        },
        // AckVam
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // AckCm
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // CalibReadback
        IntegrityConfig {
            timeout_limit: 120,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultCalibTimeout,
            clear_condition: CalibReadback,
        },
        // TorqueVecMotorCalib (spec §9 open question 2: singleton calib enum)
        IntegrityConfig {
            timeout_limit: 120,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Asi,
            timeout_event_id: EventId::FaultCalibTimeout,
            clear_condition: CalibReadback,
        },
        // ComfortControlRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // ComfortControlAck
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // SteeringAngleRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // BrakeTorqueRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // PropulsionTorqueRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // GearShiftRequest
        IntegrityConfig {
            timeout_limit: 80,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultMsgTimeout,
            clear_condition: AckCm,
        },
        // CriticalFail
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: false,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultEcuCriticalFail,
            clear_condition: None,
        },
        // NonCriticalFail
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: false,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultEcuNonCriticalFail,
            clear_condition: None,
        },
        // HeartbeatVam
        IntegrityConfig {
            timeout_limit: 40,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: true,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultHeartbeatLost,
            clear_condition: Init,
        },
        // HeartbeatCm
        IntegrityConfig {
            timeout_limit: 40,
            cycle_count_enabled: true,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: true,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultHeartbeatLost,
            clear_condition: Init,
        },
        // DiagnosticRequest
        IntegrityConfig {
            timeout_limit: 200,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::InfoDiagnosticTimeout,
            clear_condition: AckCm,
        },
        // DiagnosticResponse
        IntegrityConfig {
            timeout_limit: 0,
            cycle_count_enabled: false,
            action_req_timer_enabled: false,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: false,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::UnknownEventId,
            clear_condition: None,
        },
        // CalibWriteRequest
        IntegrityConfig {
            timeout_limit: 120,
            cycle_count_enabled: true,
            action_req_timer_enabled: true,
            type_length_enabled: true,
            crc_enabled: true,
            rc_enabled: true,
            rsn_enabled: true,
            cyclic_enabled: false,
            seq_assigner: Vam,
            timeout_event_id: EventId::FaultCalibTimeout,
            clear_condition: CalibReadback,
        },
    ]
};

const DICTIONARY: [DictionaryEntry; MESSAGE_ENUM_COUNT] = [
    DictionaryEntry { wire_type: 0x0001, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::ActionRequest, length: 8 },
    DictionaryEntry { wire_type: 0x0002, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::ActionNotification, length: 8 },
    DictionaryEntry { wire_type: 0x0003, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::StatusNotificationAsi, length: 8 },
    // Prndl and VehicleSpeed share wire_type 0x0101; sub_id is the only discriminator.
    DictionaryEntry { wire_type: 0x0101, sub_id: Some(0x0001), role: Some(ConnectionRole::Cm), message_enum: MessageEnum::Prndl, length: 8 },
    DictionaryEntry { wire_type: 0x0101, sub_id: Some(0x0002), role: Some(ConnectionRole::Cm), message_enum: MessageEnum::VehicleSpeed, length: 8 },
    DictionaryEntry { wire_type: 0x0004, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::AckVam, length: 8 },
    DictionaryEntry { wire_type: 0x0104, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::AckCm, length: 8 },
    DictionaryEntry { wire_type: 0x0105, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::CalibReadback, length: 8 },
    DictionaryEntry { wire_type: 0x0005, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::TorqueVecMotorCalib, length: 8 },
    DictionaryEntry { wire_type: 0x0006, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::ComfortControlRequest, length: 8 },
    DictionaryEntry { wire_type: 0x0106, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::ComfortControlAck, length: 8 },
    DictionaryEntry { wire_type: 0x0007, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::SteeringAngleRequest, length: 8 },
    DictionaryEntry { wire_type: 0x0008, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::BrakeTorqueRequest, length: 8 },
    DictionaryEntry { wire_type: 0x0009, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::PropulsionTorqueRequest, length: 8 },
    DictionaryEntry { wire_type: 0x000A, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::GearShiftRequest, length: 8 },
    DictionaryEntry { wire_type: 0x0107, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::CriticalFail, length: 8 },
    DictionaryEntry { wire_type: 0x0108, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::NonCriticalFail, length: 8 },
    DictionaryEntry { wire_type: 0x000B, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::HeartbeatVam, length: 8 },
    DictionaryEntry { wire_type: 0x0109, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::HeartbeatCm, length: 8 },
    DictionaryEntry { wire_type: 0x000C, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::DiagnosticRequest, length: 8 },
    DictionaryEntry { wire_type: 0x010A, sub_id: None, role: Some(ConnectionRole::Cm), message_enum: MessageEnum::DiagnosticResponse, length: 8 },
    DictionaryEntry { wire_type: 0x000D, sub_id: None, role: Some(ConnectionRole::Vam), message_enum: MessageEnum::CalibWriteRequest, length: 8 },
];

/// The static Message Dictionary + Integrity Config Table (spec §3, immutable after init).
#[derive(Debug, Clone, Copy, Default)]
pub struct Dictionary;

impl Dictionary {
    /// Resolve `(type, id)` received on `role` to a `MessageEnum` (spec §4.1 step 5).
    ///
    /// `id` only participates in classification for the handful of enums
    /// that legitimately share a `wire_type` and are disambiguated by a
    /// dictionary-fixed sub-id (e.g. `Prndl` vs `VehicleSpeed` on `0x0101`).
    /// Every other enum is classified by `(wire_type, role)` alone, since its
    /// `id` is a per-instance value the frame carries, not something the
    /// dictionary constrains.
    pub fn enum_of(
        &self,
        wire_type: u16,
        id: u16,
        role: ConnectionRole,
    ) -> Result<MessageEnum, DictionaryError> {
        DICTIONARY
            .iter()
            .find(|e| {
                e.wire_type == wire_type
                    && matches_role(e.role, role)
                    && e.sub_id.is_none_or(|sub_id| sub_id == id)
            })
            .map(|e| e.message_enum)
            .ok_or(DictionaryError::UnknownMessage { wire_type, id })
    }

    /// Dictionary-declared payload length for `wire_type` (spec §3 invariant).
    pub fn length_of(&self, wire_type: u16) -> Option<u16> {
        DICTIONARY
            .iter()
            .find(|e| e.wire_type == wire_type)
            .map(|e| e.length)
    }

    /// Wire `type` a given enum is transmitted as (transmit path, spec §4.1
    /// step 2). The frame's `id` field is always the caller's per-instance
    /// `msg.id`, not a dictionary value — see `sub_id` on `DictionaryEntry`.
    pub fn wire_of(&self, message_enum: MessageEnum) -> u16 {
        DICTIONARY[message_enum.as_u8() as usize].wire_type
    }

    /// Look up the static `IntegrityConfig` for a message enum (spec §3).
    pub fn integrity_of(&self, message_enum: MessageEnum) -> &'static IntegrityConfig {
        &INTEGRITY_TABLE[message_enum.as_u8() as usize]
    }
}

fn matches_role(entry_role: Option<ConnectionRole>, role: ConnectionRole) -> bool {
    match entry_role {
        Some(r) => r == role,
        None => true,
    }
}
