//! Convenience re-exports: `use si_common::prelude::*;`

pub use crate::config::{ConfigError, ConfigLoader, RateLimiterConfig, SiConfig};
pub use crate::dictionary::{
    ClearCondition, ConnectionRole, Dictionary, IntegrityConfig, MessageEnum, SeqAssigner,
};
pub use crate::error::{DictionaryError, FrameError};
pub use crate::events::{ActionNotificationKind, EventId, NotificationTarget, Severity};
pub use crate::frame::{RawFrame, FRAME_LEN, VALUE_LEN};
pub use crate::rolling::{rc_accepted, rc_delta, wrapping_advance};
pub use crate::scaling::{
    decode_vehicle_speed, gear_in_range, speed_in_range, EPSILON, GEAR_MAX, GEAR_MIN, SPEED_MAX,
    SPEED_MIN,
};
