//! ICM transmit path (spec §4.1): dequeue an approved message, frame it,
//! rate-limit, send, and track it for timeout.

use si_common::dictionary::{ConnectionRole, IntegrityConfig, MessageEnum, SeqAssigner};
use si_common::events::ActionNotificationKind;
use si_common::frame::{crc_over_seq_id_value, RawFrame};
use si_common::rolling::wrapping_advance;
use si_itcom::connection::ConnectionState;
use si_itcom::context::{Itcom, SharedContext};
use si_itcom::messages::{ProcessMsgData, SiState};
use si_itcom::tracker::MessageTracker;

use crate::connection::FrameConnection;

/// A frame ready to leave the lock, plus the bookkeeping needed to record its outcome.
#[derive(Clone, Copy)]
struct PreparedSend {
    frame: RawFrame,
    destination: ConnectionRole,
    message_enum: MessageEnum,
    msg_id: u16,
    integrity: IntegrityConfig,
}

/// Destination connection for an outbound message (spec §4.1 transmit step 3).
fn destination_of(message_enum: MessageEnum) -> ConnectionRole {
    match message_enum {
        MessageEnum::ActionNotification | MessageEnum::StatusNotificationAsi => ConnectionRole::Vam,
        _ => ConnectionRole::Cm,
    }
}

/// Run one transmit iteration (spec §4.1 transmit path, steps 1-7).
pub fn transmit_tick(
    itcom: &Itcom,
    now_unix_secs: u32,
    now_ms: u64,
    vam: &mut dyn FrameConnection,
    cm: &mut dyn FrameConnection,
) {
    let prepared = itcom.with(|ctx| prepare_next(ctx, now_unix_secs, now_ms));
    let Some(prepared) = prepared else {
        return;
    };

    let conn: &mut dyn FrameConnection = match prepared.destination {
        ConnectionRole::Vam => vam,
        ConnectionRole::Cm => cm,
    };
    let result = conn.send_frame(&prepared.frame);
    if result.is_err() {
        conn.close();
    }

    itcom.with(|ctx| finish_send(ctx, &prepared, result.is_ok()));
}

/// Steps 1-4: dequeue, resolve the dictionary entry, choose a destination,
/// check connection/rate-limit admission, and build the wire frame. Returns
/// `None` if there is nothing to send or the send should be aborted (no retry).
fn prepare_next(ctx: &mut SharedContext, now_unix_secs: u32, now_ms: u64) -> Option<PreparedSend> {
    let msg: ProcessMsgData = match ctx.si_state {
        SiState::NormalOp | SiState::StartupTest => ctx.approved_actions_queue.pop().ok()?,
        SiState::SafeState => ctx.safe_state_queue.pop().ok()?,
    };

    let message_enum = msg.message_enum;
    let integrity = *ctx.dictionary.integrity_of(message_enum);
    let destination = destination_of(message_enum);

    if ctx.connections.state(destination) != ConnectionState::Connected {
        return None;
    }

    if !ctx.rate_limiter.try_admit(now_ms) {
        if destination == ConnectionRole::Vam {
            ctx.queue_notification(ActionNotificationKind::RateLimiterDrop, msg.id, msg.seq_num);
        }
        return None;
    }

    let wire_type = ctx.dictionary.wire_of(message_enum);
    let idx = message_enum.as_u8() as usize;
    let sequence_number = match integrity.seq_assigner {
        SeqAssigner::Asi => ctx.asi_seq[idx],
        SeqAssigner::Vam => msg.seq_num,
    };

    let mut value = [0u8; si_common::frame::VALUE_LEN];
    let take = (msg.length as usize).min(value.len());
    value[..take].copy_from_slice(&msg.payload[..take]);

    let frame = RawFrame {
        wire_type,
        length: msg.length,
        crc: crc_over_seq_id_value(sequence_number, msg.id, &value),
        rolling_counter: ctx.rolling.tx[idx],
        timestamp: now_unix_secs,
        sequence_number,
        id: msg.id,
        value,
    };

    Some(PreparedSend {
        frame,
        destination,
        message_enum,
        msg_id: msg.id,
        integrity,
    })
}

/// Steps 5-7: record the send outcome, (re)track the message, and advance counters.
fn finish_send(ctx: &mut SharedContext, prepared: &PreparedSend, sent_ok: bool) {
    let PreparedSend {
        frame,
        destination,
        message_enum,
        msg_id,
        integrity,
    } = *prepared;

    if !sent_ok {
        ctx.connections.set_state(destination, ConnectionState::Error);
        if destination == ConnectionRole::Cm {
            ctx.queue_notification(
                ActionNotificationKind::TransmissionFailed,
                msg_id,
                frame.sequence_number,
            );
        }
        return;
    }

    tracing::debug!(
        wire_type = frame.wire_type,
        id = frame.id,
        sequence_number = frame.sequence_number,
        rolling_counter = frame.rolling_counter,
        "transmitted frame"
    );

    if integrity.cycle_count_enabled {
        let clear_condition = match destination {
            ConnectionRole::Vam => si_common::dictionary::ClearCondition::AckVam,
            ConnectionRole::Cm => si_common::dictionary::ClearCondition::AckCm,
        };
        ctx.action_msg_buffer.add(MessageTracker::new(
            msg_id,
            frame.sequence_number,
            frame.wire_type,
            message_enum,
            clear_condition,
        ));

        if message_enum == MessageEnum::TorqueVecMotorCalib {
            ctx.calib_copy_buffer.add(MessageTracker::new(
                msg_id,
                frame.sequence_number,
                frame.wire_type,
                message_enum,
                si_common::dictionary::ClearCondition::CalibReadback,
            ));
        }
    }

    let idx = message_enum.as_u8() as usize;
    ctx.rolling.tx[idx] = wrapping_advance(ctx.rolling.tx[idx]);
    if integrity.seq_assigner == SeqAssigner::Asi {
        ctx.asi_seq[idx] = wrapping_advance(ctx.asi_seq[idx]);
    }

    if destination == ConnectionRole::Cm {
        ctx.queue_notification(ActionNotificationKind::ApprovedRequest, msg_id, frame.sequence_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use si_common::config::SiConfig;

    use crate::connection::ChannelFrameConnection;

    fn itcom() -> Itcom {
        Itcom::new(SharedContext::new(&SiConfig::default(), 0))
    }

    fn approved(message_enum: MessageEnum, id: u16, seq_num: u16) -> ProcessMsgData {
        ProcessMsgData {
            message_enum,
            id,
            seq_num,
            length: 8,
            payload: [0u8; 8],
        }
    }

    #[test]
    fn successful_cm_send_creates_tracker_and_advances_counters() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.approved_actions_queue
                .push(approved(MessageEnum::ActionRequest, 0x0010, 7))
                .unwrap();
        });
        let mut vam = ChannelFrameConnection::new();
        let mut cm = ChannelFrameConnection::new();
        transmit_tick(&itcom, 1_700_000_000, 0, &mut vam, &mut cm);

        assert_eq!(cm.sent.len(), 1);
        let tx_rc = itcom.with(|ctx| ctx.rolling.tx[MessageEnum::ActionRequest.as_u8() as usize]);
        assert_eq!(tx_rc, 1);
        assert_eq!(itcom.with(|ctx| ctx.action_msg_buffer.len()), 1);
        // ApprovedRequest notification lands back in the approved-actions queue.
        assert_eq!(itcom.with(|ctx| ctx.approved_actions_queue.len()), 1);
    }

    #[test]
    fn calibration_send_also_tracks_in_calib_copy_buffer() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.approved_actions_queue
                .push(approved(MessageEnum::TorqueVecMotorCalib, 0x0010, 7))
                .unwrap();
        });
        let mut vam = ChannelFrameConnection::new();
        let mut cm = ChannelFrameConnection::new();
        transmit_tick(&itcom, 0, 0, &mut vam, &mut cm);

        assert_eq!(itcom.with(|ctx| ctx.action_msg_buffer.len()), 1);
        assert_eq!(itcom.with(|ctx| ctx.calib_copy_buffer.len()), 1);
    }

    #[test]
    fn disconnected_destination_aborts_without_retry() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.connections
                .set_state(ConnectionRole::Cm, ConnectionState::Disconnected);
            ctx.approved_actions_queue
                .push(approved(MessageEnum::ActionRequest, 0x0010, 7))
                .unwrap();
        });
        let mut vam = ChannelFrameConnection::new();
        let mut cm = ChannelFrameConnection::new();
        transmit_tick(&itcom, 0, 0, &mut vam, &mut cm);

        assert!(cm.sent.is_empty());
        assert_eq!(itcom.with(|ctx| ctx.approved_actions_queue.len()), 0);
    }

    #[test]
    fn rate_limit_drop_notifies_vam_destination_only() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.rate_limiter.allowed_messages = 0;
            ctx.approved_actions_queue
                .push(approved(MessageEnum::ActionNotification, 0x0010, 7))
                .unwrap();
        });
        let mut vam = ChannelFrameConnection::new();
        let mut cm = ChannelFrameConnection::new();
        transmit_tick(&itcom, 0, 0, &mut vam, &mut cm);

        assert!(vam.sent.is_empty());
        assert_eq!(itcom.with(|ctx| ctx.approved_actions_queue.len()), 1);
    }

    #[test]
    fn safe_state_dequeues_from_safe_state_queue() {
        let itcom = itcom();
        itcom.with(|ctx| {
            ctx.si_state = SiState::SafeState;
            ctx.safe_state_queue
                .push(approved(MessageEnum::ActionRequest, 0x0010, 7))
                .unwrap();
        });
        let mut vam = ChannelFrameConnection::new();
        let mut cm = ChannelFrameConnection::new();
        transmit_tick(&itcom, 0, 0, &mut vam, &mut cm);

        assert_eq!(cm.sent.len(), 1);
    }
}
