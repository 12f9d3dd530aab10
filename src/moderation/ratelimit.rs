//! Minimum gap between commands, per user.
//!
//! Every attempt moves the user's timestamp forward, including the ones
//! that get rejected, so hammering a command keeps it blocked.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::gateway::UserId;

pub struct RateLimiter {
    window: Duration,
    last: Mutex<HashMap<UserId, Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// True if the command may run.
    pub fn check(&self, user: UserId) -> bool {
        self.check_at(user, Instant::now())
    }

    pub fn check_at(&self, user: UserId, now: Instant) -> bool {
        let mut last = self.last.lock();
        let allowed = match last.get(&user) {
            Some(prev) => now.saturating_duration_since(*prev) >= self.window,
            None => true,
        };
        last.insert(user, now);
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADA: UserId = UserId(1);

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(1))
    }

    #[test]
    fn second_command_within_window_is_dropped() {
        let limiter = limiter();
        let t0 = Instant::now();

        assert!(limiter.check_at(ADA, t0));
        assert!(!limiter.check_at(ADA, t0 + Duration::from_millis(500)));
    }

    #[test]
    fn commands_outside_window_pass() {
        let limiter = limiter();
        let t0 = Instant::now();

        assert!(limiter.check_at(ADA, t0));
        assert!(limiter.check_at(ADA, t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn rejected_attempt_slides_the_window() {
        let limiter = limiter();
        let t0 = Instant::now();

        assert!(limiter.check_at(ADA, t0));
        assert!(!limiter.check_at(ADA, t0 + Duration::from_millis(900)));
        // 1.2s after the first, but only 0.3s after the rejected one
        assert!(!limiter.check_at(ADA, t0 + Duration::from_millis(1200)));
        assert!(limiter.check_at(ADA, t0 + Duration::from_millis(2300)));
    }

    #[test]
    fn users_are_independent() {
        let limiter = limiter();
        let t0 = Instant::now();

        assert!(limiter.check_at(ADA, t0));
        assert!(limiter.check_at(UserId(2), t0));
    }
}
