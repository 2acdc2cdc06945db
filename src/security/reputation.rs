//! Fingerprint reputation — aggregates abuse signal across ephemeral
//! user ids sharing a browser-supplied fingerprint.
//!
//! Records are never deleted during a process lifetime per the spec's
//! retention note, but are bounded by a simple cap-and-evict-oldest
//! policy so a long-lived process doesn't grow unbounded.

use std::collections::HashSet;
use std::time::Instant;

use dashmap::DashMap;

const MAX_RECORDS: usize = 100_000;

#[derive(Debug, Clone)]
pub struct FingerprintRecord {
    pub user_ids: HashSet<String>,
    pub reports: u64,
    pub bans: u64,
    pub first_seen: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackResult {
    pub suspicious: bool,
}

pub struct ReputationTable {
    records: DashMap<String, FingerprintRecord>,
    /// Reverse index so report/ban increments keyed by userId can find the
    /// owning fingerprint(s) without scanning every record.
    owners: DashMap<String, HashSet<String>>,
}

impl Default for ReputationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReputationTable {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    pub fn track_fingerprint(&self, fingerprint: &str, user_id: &str) -> TrackResult {
        if self.records.len() >= MAX_RECORDS && !self.records.contains_key(fingerprint) {
            self.evict_oldest();
        }

        let mut record = self
            .records
            .entry(fingerprint.to_string())
            .or_insert_with(|| FingerprintRecord {
                user_ids: HashSet::new(),
                reports: 0,
                bans: 0,
                first_seen: Instant::now(),
            });
        record.user_ids.insert(user_id.to_string());
        self.owners
            .entry(user_id.to_string())
            .or_default()
            .insert(fingerprint.to_string());

        TrackResult {
            suspicious: record.reports >= 5 || record.bans >= 3,
        }
    }

    /// Increment `reports` on every fingerprint record that has seen
    /// `user_id`, returning the highest resulting count.
    pub fn record_report_against(&self, user_id: &str) -> u64 {
        let mut max_count = 0;
        if let Some(fingerprints) = self.owners.get(user_id) {
            for fp in fingerprints.iter() {
                if let Some(mut record) = self.records.get_mut(fp) {
                    record.reports += 1;
                    max_count = max_count.max(record.reports);
                }
            }
        }
        max_count
    }

    pub fn record_ban_against(&self, user_id: &str) {
        if let Some(fingerprints) = self.owners.get(user_id) {
            for fp in fingerprints.iter() {
                if let Some(mut record) = self.records.get_mut(fp) {
                    record.bans += 1;
                }
            }
        }
    }

    fn evict_oldest(&self) {
        if let Some(oldest_key) = self
            .records
            .iter()
            .min_by_key(|e| e.value().first_seen)
            .map(|e| e.key().clone())
        {
            if let Some((_, record)) = self.records.remove(&oldest_key) {
                for user_id in record.user_ids {
                    self.owners.remove(&user_id);
                }
            }
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_suspicious() {
        let table = ReputationTable::new();
        assert!(!table.track_fingerprint("fp1", "alice").suspicious);
    }

    #[test]
    fn five_reports_marks_suspicious() {
        let table = ReputationTable::new();
        table.track_fingerprint("fp1", "alice");
        for _ in 0..5 {
            table.record_report_against("alice");
        }
        assert!(table.track_fingerprint("fp1", "alice").suspicious);
    }

    #[test]
    fn three_bans_marks_suspicious() {
        let table = ReputationTable::new();
        table.track_fingerprint("fp1", "alice");
        for _ in 0..3 {
            table.record_ban_against("alice");
        }
        assert!(table.track_fingerprint("fp1", "alice").suspicious);
    }

    #[test]
    fn churned_user_ids_share_reputation() {
        let table = ReputationTable::new();
        table.track_fingerprint("fp1", "alice-session-1");
        for _ in 0..5 {
            table.record_report_against("alice-session-1");
        }
        // A new ephemeral id under the same fingerprint inherits the record.
        let result = table.track_fingerprint("fp1", "alice-session-2");
        assert!(result.suspicious);
    }
}
