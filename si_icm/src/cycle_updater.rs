//! ICM cycle-count updater (spec §4.1): periodic status notification and the
//! per-tick timeout sweep over outstanding trackers.

use si_common::dictionary::MessageEnum;
use si_common::events::ActionNotificationKind;
use si_common::rolling::wrapping_advance;
use si_itcom::context::{Itcom, SharedContext};
use si_itcom::messages::Freshness;

/// Run one cycle-count updater iteration (spec §4.1 cycle-count updater, steps 1-2).
pub fn cycle_tick(itcom: &Itcom, status_notification_ticks: u32) {
    itcom.with(|ctx| {
        advance_global_cycle(ctx, status_notification_ticks);
        sweep_action_msg_buffer(ctx);
        sweep_calib_copy_buffer(ctx);
    });
}

/// Step 1: advance the free-running cycle counter and emit the periodic status notification.
fn advance_global_cycle(ctx: &mut SharedContext, status_notification_ticks: u32) {
    ctx.global_cycle = wrapping_advance(ctx.global_cycle);
    if status_notification_ticks != 0 && ctx.global_cycle as u32 % status_notification_ticks == 0 {
        ctx.queue_status_notification();
    }
}

/// Step 2: age every tracker in the Action message buffer in reverse index
/// order so removals never shift an entry still to be visited.
fn sweep_action_msg_buffer(ctx: &mut SharedContext) {
    let mut logical = ctx.action_msg_buffer.len();
    while logical > 0 {
        logical -= 1;
        let Some(tracker) = ctx.action_msg_buffer.get(logical).copied() else {
            continue;
        };
        let integrity = *ctx.dictionary.integrity_of(tracker.enum_assigned);
        if integrity.timeout_limit == 0 {
            continue;
        }

        let mut tracker = tracker;
        tracker.response_cycle_count = tracker.response_cycle_count.saturating_add(1);

        if tracker.response_cycle_count < integrity.timeout_limit {
            let _ = ctx.action_msg_buffer.update(logical, tracker);
            continue;
        }

        ctx.raise_event(integrity.timeout_event_id);

        if integrity.action_req_timer_enabled {
            ctx.queue_notification(
                ActionNotificationKind::TimeoutLimit,
                tracker.msg_id,
                tracker.seq_num,
            );
        }

        match tracker.enum_assigned {
            MessageEnum::Prndl => {
                tracker.response_cycle_count = 0;
                ctx.park_status = Freshness::Outdated;
                let _ = ctx.action_msg_buffer.update(logical, tracker);
            }
            MessageEnum::VehicleSpeed => {
                tracker.response_cycle_count = 0;
                ctx.vehicle_speed_status = Freshness::Outdated;
                let _ = ctx.action_msg_buffer.update(logical, tracker);
            }
            _ => {
                let _ = ctx.action_msg_buffer.remove(logical);
            }
        }
    }
}

/// Secondary sweep over the calibration-copy buffer: these trackers never
/// live in the Action message buffer (spec §9 open question 2's resolution),
/// so their `CalibReadback` timeout is aged independently.
fn sweep_calib_copy_buffer(ctx: &mut SharedContext) {
    let mut logical = ctx.calib_copy_buffer.len();
    while logical > 0 {
        logical -= 1;
        let Some(mut tracker) = ctx.calib_copy_buffer.get(logical).copied() else {
            continue;
        };
        let integrity = *ctx.dictionary.integrity_of(tracker.enum_assigned);
        if integrity.timeout_limit == 0 {
            continue;
        }

        tracker.response_cycle_count = tracker.response_cycle_count.saturating_add(1);
        if tracker.response_cycle_count < integrity.timeout_limit {
            let _ = ctx.calib_copy_buffer.update(logical, tracker);
            continue;
        }

        ctx.raise_event(integrity.timeout_event_id);
        remove_calib_readback_entry(ctx, tracker.msg_id, tracker.seq_num);
        let _ = ctx.calib_copy_buffer.remove(logical);
    }
}

fn remove_calib_readback_entry(ctx: &mut SharedContext, msg_id: u16, seq_num: u16) {
    if let Some(logical) = ctx
        .calib_readback_buffer
        .find_by(|e| e.msg_id == msg_id && e.seq_num == seq_num)
    {
        let _ = ctx.calib_readback_buffer.remove(logical);
    }
}
