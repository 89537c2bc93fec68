//! ICM receive path (spec §4.1): validate, dispatch, and store one inbound
//! frame per connection per tick.

use si_common::dictionary::{ClearCondition, ConnectionRole, IntegrityConfig, MessageEnum};
use si_common::events::{ActionNotificationKind, EventId};
use si_common::frame::RawFrame;
use si_common::rolling::rc_accepted;
use si_common::scaling::{decode_vehicle_speed, gear_in_range, speed_in_range};
use si_itcom::connection::ConnectionState;
use si_itcom::context::{Itcom, SharedContext};
use si_itcom::messages::{ActionRequestMsg, Freshness};
use si_itcom::tracker::{CalibReadbackEntry, MessageTracker};

use crate::connection::FrameConnection;
use crate::error::IcmError;

/// Payload byte carried by `AckVam`/`AckCm` frames signalling rejection (spec §4.1 step 7).
const ACK_UNSUCCESSFUL: u8 = 1;

/// Run one receive iteration for `role`'s connection (spec §4.1 receive path,
/// steps 1-7). No-op if the connection is not `Connected`.
pub fn receive_tick(itcom: &Itcom, role: ConnectionRole, conn: &mut dyn FrameConnection) {
    let connected = itcom.with(|ctx| ctx.connections.state(role) == ConnectionState::Connected);
    if !connected {
        return;
    }

    let frame = match conn.try_read_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(IcmError::PeerClosed) => {
            itcom.with(|ctx| ctx.connections.set_state(role, ConnectionState::Disconnected));
            conn.close();
            return;
        }
        Err(_) => {
            itcom.with(|ctx| ctx.connections.set_state(role, ConnectionState::Error));
            conn.close();
            return;
        }
    };

    tracing::debug!(
        wire_type = frame.wire_type,
        length = frame.length,
        crc = frame.crc,
        rolling_counter = frame.rolling_counter,
        timestamp = frame.timestamp,
        sequence_number = frame.sequence_number,
        id = frame.id,
        "received frame"
    );

    itcom.with(|ctx| process_frame(ctx, role, &frame));
}

fn process_frame(ctx: &mut SharedContext, role: ConnectionRole, frame: &RawFrame) {
    let enum_lookup = ctx.dictionary.enum_of(frame.wire_type, frame.id, role);

    if let Ok(message_enum) = enum_lookup {
        if ctx.dictionary.integrity_of(message_enum).action_req_timer_enabled {
            ctx.record_action_req_start(frame.id, frame.sequence_number);
        }
    }

    let message_enum = match validate(ctx, role, frame, enum_lookup) {
        Some(message_enum) => message_enum,
        None => return,
    };

    match message_enum {
        MessageEnum::CriticalFail => {
            ctx.raise_event(EventId::FaultEcuCriticalFail);
            return;
        }
        MessageEnum::NonCriticalFail => {
            ctx.raise_event(EventId::FaultEcuNonCriticalFail);
            return;
        }
        _ => {}
    }

    let integrity = *ctx.dictionary.integrity_of(message_enum);
    let idx = message_enum.as_u8() as usize;

    if integrity.rc_enabled {
        let last_rx = ctx.rolling.rx[idx];
        if rc_accepted(frame.rolling_counter, last_rx) {
            ctx.rc_error_count[idx] = 0;
        } else {
            ctx.rc_error_count[idx] = ctx.rc_error_count[idx].saturating_add(1);
            if ctx.rc_error_count[idx] >= ctx.rc_error_limit {
                ctx.raise_event(EventId::FaultRollCount);
                ctx.rc_error_count[idx] = 0;
            }
            return;
        }
    }

    retire_or_reset_tracker(ctx, role, frame, message_enum, &integrity);

    ctx.rolling.rx[idx] = frame.rolling_counter;
    dispatch_payload(ctx, message_enum, frame);
}

/// Validation steps 4-6: length, CRC, and dictionary lookup. Returns the
/// resolved enum on success; on any failure, raises/increments the relevant
/// counters, notifies VAM if appropriate, and returns `None` (the frame is dropped).
fn validate(
    ctx: &mut SharedContext,
    role: ConnectionRole,
    frame: &RawFrame,
    enum_lookup: Result<MessageEnum, si_common::error::DictionaryError>,
) -> Option<MessageEnum> {
    let message_enum = match enum_lookup {
        Ok(message_enum) => message_enum,
        Err(_) => {
            notify_invalid_if_vam(ctx, role, frame);
            return None;
        }
    };

    let expected_length = ctx.dictionary.length_of(frame.wire_type);
    let length_ok = expected_length == Some(frame.length);
    let crc_ok = frame.crc_ok();

    if !length_ok || !crc_ok {
        let idx = message_enum.as_u8() as usize;
        ctx.crc_error_count[idx] = ctx.crc_error_count[idx].saturating_add(1);
        if ctx.crc_error_count[idx] >= ctx.crc_error_max {
            ctx.raise_event(EventId::FaultMsgCrcCheck);
            ctx.crc_error_count[idx] = 0;
        }
        notify_invalid_if_vam(ctx, role, frame);
        return None;
    }

    Some(message_enum)
}

fn notify_invalid_if_vam(ctx: &mut SharedContext, role: ConnectionRole, frame: &RawFrame) {
    if role == ConnectionRole::Vam {
        ctx.queue_notification(
            ActionNotificationKind::InvalidActionReq,
            frame.id,
            frame.sequence_number,
        );
    }
}

/// Which `ClearCondition` an inbound `(role, enum)` pair retires (spec §4.1
/// step 7: "the `clear_condition` to key removal by is chosen from the
/// receiving connection and enum").
fn clear_condition_for(role: ConnectionRole, message_enum: MessageEnum) -> Option<ClearCondition> {
    match (role, message_enum) {
        (ConnectionRole::Vam, MessageEnum::AckVam) => Some(ClearCondition::AckVam),
        (ConnectionRole::Cm, MessageEnum::AckCm) => Some(ClearCondition::AckCm),
        (ConnectionRole::Cm, MessageEnum::CalibReadback) => Some(ClearCondition::CalibReadback),
        _ => None,
    }
}

/// Cycle-count reset / tracker retirement (spec §4.1 step 7).
fn retire_or_reset_tracker(
    ctx: &mut SharedContext,
    role: ConnectionRole,
    frame: &RawFrame,
    message_enum: MessageEnum,
    integrity: &IntegrityConfig,
) {
    if integrity.cyclic_enabled {
        if let Some(logical) = ctx
            .action_msg_buffer
            .find_by(|t| t.msg_id == frame.id && t.enum_assigned == message_enum)
        {
            let mut tracker = *ctx.action_msg_buffer.get(logical).unwrap();
            tracker.reset_cyclic();
            let _ = ctx.action_msg_buffer.update(logical, tracker);
        }
        return;
    }

    let Some(clear_condition) = clear_condition_for(role, message_enum) else {
        return;
    };

    if let Some(logical) = ctx.action_msg_buffer.find_by(|t| {
        t.msg_id == frame.id && t.seq_num == frame.sequence_number && t.clear_condition == clear_condition
    }) {
        let _ = ctx.action_msg_buffer.remove(logical);
    }

    if clear_condition == ClearCondition::CalibReadback {
        if let Some(logical) = ctx.calib_copy_buffer.find_by(|t| {
            t.msg_id == frame.id
                && t.seq_num == frame.sequence_number
                && t.clear_condition == ClearCondition::CalibReadback
        }) {
            let _ = ctx.calib_copy_buffer.remove(logical);
        }
    }
}

/// Payload-class dispatch (spec §4.1 step 7 "Store payload").
fn dispatch_payload(ctx: &mut SharedContext, message_enum: MessageEnum, frame: &RawFrame) {
    match message_enum {
        MessageEnum::Prndl => {
            let gear = frame.value[0];
            if gear_in_range(gear) {
                ctx.park_status = Freshness::Updated;
            } else {
                ctx.raise_event(EventId::InfoVehicleStatusInvalidInfoError);
            }
        }
        MessageEnum::VehicleSpeed => {
            let speed = decode_vehicle_speed(frame.value[0], frame.value[1]);
            if speed_in_range(speed) {
                ctx.vehicle_speed_status = Freshness::Updated;
            } else {
                ctx.raise_event(EventId::InfoVehicleStatusInvalidInfoError);
            }
        }
        MessageEnum::AckVam | MessageEnum::AckCm => {
            if frame.value[0] == ACK_UNSUCCESSFUL {
                ctx.raise_event(EventId::InfoAckUnsuccess);
            }
        }
        MessageEnum::CalibReadback => {
            let _ = ctx.calib_readback_buffer.add(CalibReadbackEntry {
                msg_id: frame.id,
                seq_num: frame.sequence_number,
                value: frame.value,
            });
        }
        _ if ctx.dictionary.integrity_of(message_enum).action_req_timer_enabled
            || message_enum == MessageEnum::ActionRequest =>
        {
            let _ = ctx.action_request_queue.push(ActionRequestMsg {
                id: frame.id,
                seq_num: frame.sequence_number,
                value: frame.value,
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use si_common::config::SiConfig;
    use si_common::frame::crc_over_seq_id_value;

    use crate::connection::ChannelFrameConnection;

    fn itcom() -> Itcom {
        Itcom::new(SharedContext::new(&SiConfig::default(), 0))
    }

    fn ack_cm_frame(id: u16, seq: u16, ack_byte: u8) -> RawFrame {
        let mut value = [0u8; 8];
        value[0] = ack_byte;
        RawFrame {
            wire_type: 0x0104,
            length: 8,
            crc: crc_over_seq_id_value(seq, id, &value),
            rolling_counter: 1,
            timestamp: 0,
            sequence_number: seq,
            id,
            value,
        }
    }

    #[test]
    fn bad_crc_increments_counter_and_raises_after_threshold() {
        let itcom = itcom();
        let mut conn = ChannelFrameConnection::new();
        for _ in 0..3 {
            let mut frame = ack_cm_frame(0x0003, 1, 0);
            frame.crc = 0x0000;
            conn.push_inbound(frame);
        }
        for _ in 0..3 {
            receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        }
        let count = itcom.with(|ctx| {
            ctx.event_queue
                .iter()
                .filter(|e| e.event_id == EventId::FaultMsgCrcCheck)
                .count()
        });
        assert_eq!(count, 1);
        assert_eq!(
            itcom.with(|ctx| ctx.connections.state(ConnectionRole::Cm)),
            ConnectionState::Connected
        );
    }

    #[test]
    fn ack_successful_does_not_raise_event() {
        let itcom = itcom();
        let mut conn = ChannelFrameConnection::new();
        conn.push_inbound(ack_cm_frame(0x0010, 7, 0));
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        assert!(itcom.with(|ctx| ctx.event_queue.is_empty()));
    }

    #[test]
    fn ack_unsuccessful_raises_info_event() {
        let itcom = itcom();
        let mut conn = ChannelFrameConnection::new();
        conn.push_inbound(ack_cm_frame(0x0010, 7, ACK_UNSUCCESSFUL));
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        let head = itcom.with(|ctx| ctx.event_queue.head().copied());
        assert_eq!(head.unwrap().event_id, EventId::InfoAckUnsuccess);
    }

    #[test]
    fn ack_retires_matching_tracker() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.action_msg_buffer.add(MessageTracker::new(
                0x0010,
                7,
                0x0104,
                MessageEnum::ActionRequest,
                ClearCondition::AckCm,
            ));
        });
        let mut conn = ChannelFrameConnection::new();
        conn.push_inbound(ack_cm_frame(0x0010, 7, 0));
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        assert_eq!(itcom.with(|ctx| ctx.action_msg_buffer.len()), 0);
    }

    #[test]
    fn gear_out_of_range_raises_invalid_info_event() {
        let itcom = itcom();
        let mut value = [0u8; 8];
        value[0] = 200;
        let frame = RawFrame {
            wire_type: 0x0101,
            length: 8,
            crc: crc_over_seq_id_value(1, 0x0001, &value),
            rolling_counter: 1,
            timestamp: 0,
            sequence_number: 1,
            id: 0x0001,
            value,
        };
        let mut conn = ChannelFrameConnection::new();
        conn.push_inbound(frame);
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        let head = itcom.with(|ctx| ctx.event_queue.head().copied());
        assert_eq!(
            head.unwrap().event_id,
            EventId::InfoVehicleStatusInvalidInfoError
        );
    }

    #[test]
    fn disconnected_role_is_skipped() {
        let itcom = itcom();
        itcom.with(|ctx| ctx.connections.set_state(ConnectionRole::Cm, ConnectionState::Error));
        let mut conn = ChannelFrameConnection::new();
        conn.push_inbound(ack_cm_frame(0x0010, 7, 0));
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        assert_eq!(conn.inbound.len(), 1);
    }

    #[test]
    fn peer_closed_marks_disconnected() {
        let itcom = itcom();
        let mut conn = ChannelFrameConnection::new();
        conn.peer_closed = true;
        receive_tick(&itcom, ConnectionRole::Cm, &mut conn);
        assert_eq!(
            itcom.with(|ctx| ctx.connections.state(ConnectionRole::Cm)),
            ConnectionState::Disconnected
        );
    }
}
