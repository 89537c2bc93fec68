//! Fixed-window message rate limiter (spec §3, §4.1 step 4), transmit-path only.

use si_common::config::RateLimiterConfig;

/// `{allowed_messages, time_window_ms, message_count, window_start}` (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    pub allowed_messages: u32,
    pub time_window_ms: u64,
    pub message_count: u32,
    pub window_start: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, now_ms: u64) -> Self {
        Self {
            allowed_messages: config.allowed_messages,
            time_window_ms: config.time_window_ms,
            message_count: 0,
            window_start: now_ms,
        }
    }

    /// Attempt to admit one transmit at `now_ms` (spec §4.1 step 4). Returns
    /// `true` if the send may proceed (and accounts for it), `false` if the
    /// window's budget is exhausted.
    pub fn try_admit(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.window_start) >= self.time_window_ms {
            self.message_count = 0;
            self.window_start = now_ms;
        }
        if self.message_count < self.allowed_messages {
            self.message_count += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            RateLimiterConfig {
                allowed_messages: 10,
                time_window_ms: 100,
            },
            0,
        )
    }

    #[test]
    fn admits_up_to_allowed_messages_per_window() {
        let mut rl = limiter();
        for _ in 0..10 {
            assert!(rl.try_admit(10));
        }
        assert!(!rl.try_admit(50));
    }

    #[test]
    fn eleventh_send_within_window_is_rejected() {
        let mut rl = limiter();
        for i in 0..10 {
            assert!(rl.try_admit(i));
        }
        assert!(!rl.try_admit(45));
    }

    #[test]
    fn window_reset_after_elapsed_time_permits_transmits_again() {
        let mut rl = limiter();
        for i in 0..10 {
            assert!(rl.try_admit(i));
        }
        assert!(!rl.try_admit(99));
        assert!(rl.try_admit(100));
    }
}
