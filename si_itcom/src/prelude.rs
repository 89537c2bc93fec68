//! Convenience re-exports: `use si_itcom::prelude::*;`

pub use crate::connection::{ConnectionState, ConnectionStates};
pub use crate::context::{Itcom, RollingCounters, SharedContext};
pub use crate::data_queue::{DataQueue, OverflowMode};
pub use crate::error::ItcomError;
pub use crate::error_event::ErrorEvent;
pub use crate::event_queue::{EventQueue, QUEUE_MAX};
pub use crate::instance_buffer::InstanceBuffer;
pub use crate::messages::{ActionReqTimer, ActionRequestMsg, Freshness, ProcessMsgData, SiState};
pub use crate::rate_limiter::RateLimiter;
pub use crate::snapshot::SystemSnapshot;
pub use crate::tracker::{CalibReadbackEntry, MessageTracker};
