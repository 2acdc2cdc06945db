//! Per-user sliding-window rate limiting.
//!
//! The teacher's `RateLimitManager` uses `governor`'s token-bucket limiter,
//! which smooths bursts rather than enforcing an exact N-per-window cutoff.
//! The boundary behavior required here (the Nth action in a window is
//! admitted, the N+1th is rejected, regardless of arrival spacing) needs a
//! literal timestamp window instead, so this keeps the teacher's
//! `DashMap`-per-user shape but swaps the algorithm.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    Message,
    Skip,
    Report,
}

pub struct RateLimiter {
    windows: DashMap<(String, ActionClass), VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Trim the window to `rule.window`, then admit if the trimmed length
    /// is still under `rule.limit`. Never returns an error; callers treat a
    /// `false` result as "reply error, do not act".
    pub fn check(&self, user_id: &str, action: ActionClass, rule: &RateLimitRule) -> bool {
        let mut window = self
            .windows
            .entry((user_id.to_string(), action))
            .or_default();
        let now = Instant::now();
        window.retain(|t| now.saturating_duration_since(*t) <= rule.window);

        if window.len() >= rule.limit {
            return false;
        }
        window.push_back(now);
        true
    }

    pub fn remove_user(&self, user_id: &str) {
        self.windows
            .retain(|(uid, _), _| uid != user_id);
    }

    /// Drop windows with no activity in the last hour, bounding memory for
    /// long-lived processes.
    pub fn cleanup(&self) {
        let cutoff = Duration::from_secs(3600);
        self.windows.retain(|_, window| {
            window
                .back()
                .is_some_and(|t| crate::clock::elapsed_since(*t) <= cutoff)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(limit: usize, window_secs: u64) -> RateLimitRule {
        RateLimitRule {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let r = rule(3, 60);
        assert!(limiter.check("a", ActionClass::Message, &r));
        assert!(limiter.check("a", ActionClass::Message, &r));
        assert!(limiter.check("a", ActionClass::Message, &r));
        assert!(!limiter.check("a", ActionClass::Message, &r));
    }

    #[test]
    fn thirtieth_message_admitted_thirty_first_rejected() {
        let limiter = RateLimiter::new();
        let r = rule(30, 60);
        for _ in 0..30 {
            assert!(limiter.check("a", ActionClass::Message, &r));
        }
        assert!(!limiter.check("a", ActionClass::Message, &r));
    }

    #[test]
    fn action_classes_are_independent() {
        let limiter = RateLimiter::new();
        let r = rule(1, 60);
        assert!(limiter.check("a", ActionClass::Message, &r));
        assert!(limiter.check("a", ActionClass::Skip, &r));
        assert!(limiter.check("a", ActionClass::Report, &r));
    }

    #[test]
    fn different_users_are_independent() {
        let limiter = RateLimiter::new();
        let r = rule(1, 60);
        assert!(limiter.check("a", ActionClass::Message, &r));
        assert!(limiter.check("b", ActionClass::Message, &r));
    }

    #[test]
    fn window_expiry_allows_new_actions() {
        let limiter = RateLimiter::new();
        let r = rule(1, 0);
        assert!(limiter.check("a", ActionClass::Message, &r));
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check("a", ActionClass::Message, &r));
    }
}
