//! Abuse pattern detection — rolling per-user counters feeding
//! `detectAbusePatterns`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbusePattern {
    Spammer,
    SkipAbuser,
    Harasser,
}

#[derive(Debug, Clone)]
struct AbuseRecord {
    first_seen: Instant,
    message_count: u64,
    skip_count: u64,
    report_count: u64,
}

impl AbuseRecord {
    fn new() -> Self {
        Self {
            first_seen: Instant::now(),
            message_count: 0,
            skip_count: 0,
            report_count: 0,
        }
    }
}

pub enum UserAction {
    Message,
    Skip,
    Report,
}

pub struct AbuseTracker {
    records: DashMap<String, AbuseRecord>,
}

impl Default for AbuseTracker {
    fn default() -> Self {
        Self::new()
    }
}

const SPAMMER_MIN_SESSION: Duration = Duration::from_secs(10);
const SPAMMER_RATE_THRESHOLD: f64 = 2.0;
const SKIP_ABUSER_THRESHOLD: u64 = 15;
const HARASSER_THRESHOLD: u64 = 3;

impl AbuseTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn track_user_action(&self, user_id: &str, action: UserAction) {
        let mut record = self
            .records
            .entry(user_id.to_string())
            .or_insert_with(AbuseRecord::new);
        match action {
            UserAction::Message => record.message_count += 1,
            UserAction::Skip => record.skip_count += 1,
            UserAction::Report => record.report_count += 1,
        }
    }

    pub fn detect_abuse_patterns(&self, user_id: &str) -> HashSet<AbusePattern> {
        let mut patterns = HashSet::new();
        let Some(record) = self.records.get(user_id) else {
            return patterns;
        };

        let session_duration = crate::clock::elapsed_since(record.first_seen);
        if session_duration > SPAMMER_MIN_SESSION {
            let rate = record.message_count as f64 / session_duration.as_secs_f64();
            if rate > SPAMMER_RATE_THRESHOLD {
                patterns.insert(AbusePattern::Spammer);
            }
        }
        if record.skip_count > SKIP_ABUSER_THRESHOLD {
            patterns.insert(AbusePattern::SkipAbuser);
        }
        if record.report_count >= HARASSER_THRESHOLD {
            patterns.insert(AbusePattern::Harasser);
        }
        patterns
    }

    pub fn remove_user(&self, user_id: &str) {
        self.records.remove(user_id);
    }

    /// Drop records with no activity in the last 24 h.
    pub fn cleanup(&self) {
        let cutoff = Duration::from_secs(24 * 3600);
        self.records
            .retain(|_, record| crate::clock::elapsed_since(record.first_seen) <= cutoff);
    }
}
