//! Queue Manager — per-mode FIFO matching with an optional priority tier.
//!
//! All mutation and the match decision run under a single [`parking_lot::Mutex`]
//! so that `addToQueue`, `removeFromQueue`, and `matchUsers` observe a
//! consistent view of the queues. Without this, two concurrent `join-mode`
//! calls can interleave such that one user is popped before the other's
//! `waiting` notification is sent.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Text,
    Video,
    Voice,
}

impl Mode {
    fn index(self) -> usize {
        match self {
            Mode::Text => 0,
            Mode::Video => 1,
            Mode::Voice => 2,
        }
    }

    pub const ALL: [Mode; 3] = [Mode::Text, Mode::Video, Mode::Voice];
}

#[derive(Debug, Clone)]
struct QueueEntry {
    user_id: UserId,
    priority: u8,
    enqueued_at: Instant,
}

/// Outcome of [`QueueManager::add_to_queue`].
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Admitted,
    RejectedFull,
}

/// Outcome of [`QueueManager::match_users`].
#[derive(Debug, Clone)]
pub struct Matched {
    pub user1: UserId,
    pub user2: UserId,
    pub wait_time: Duration,
    pub mode: Mode,
}

/// Snapshot returned by [`QueueManager::is_in_queue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub mode: Mode,
    pub priority: u8,
    pub wait_time: Duration,
}

#[derive(Default)]
struct ModeTiers {
    priority: VecDeque<QueueEntry>,
    normal: VecDeque<QueueEntry>,
}

struct Inner {
    tiers: [ModeTiers; 3],
    /// userId -> (mode, in priority tier) for O(1)-ish membership checks.
    index: std::collections::HashMap<UserId, (Mode, bool)>,
}

pub struct QueueManager {
    inner: Mutex<Inner>,
    max_queue_size: usize,
    queue_timeout: Duration,
    timeouts: std::sync::atomic::AtomicU64,
}

impl QueueManager {
    pub fn new(max_queue_size: usize, queue_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tiers: [ModeTiers::default(), ModeTiers::default(), ModeTiers::default()],
                index: std::collections::HashMap::new(),
            }),
            max_queue_size,
            queue_timeout,
            timeouts: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Enqueue `user_id` for `mode`. If already queued under any mode/tier,
    /// the prior entry is removed first.
    pub fn add_to_queue(&self, user_id: UserId, mode: Mode, priority: u8) -> AddOutcome {
        let mut inner = self.inner.lock();
        Self::remove_locked(&mut inner, &user_id);

        let tier = &mut inner.tiers[mode.index()];
        let use_priority = priority > 0;
        let deque = if use_priority { &mut tier.priority } else { &mut tier.normal };

        if deque.len() >= self.max_queue_size {
            return AddOutcome::RejectedFull;
        }

        deque.push_back(QueueEntry {
            user_id: user_id.clone(),
            priority,
            enqueued_at: Instant::now(),
        });
        inner.index.insert(user_id, (mode, use_priority));
        crate::metrics::queue_gauge(mode).inc();
        AddOutcome::Admitted
    }

    /// Attempt to match two waiting users for `mode`.
    ///
    /// Selection order: two from the priority tier, one from each tier
    /// (priority first), then two from the normal tier.
    pub fn match_users(&self, mode: Mode) -> Option<Matched> {
        let mut inner = self.inner.lock();
        let tier = &mut inner.tiers[mode.index()];

        let pair = if tier.priority.len() >= 2 {
            let a = tier.priority.pop_front().unwrap();
            let b = tier.priority.pop_front().unwrap();
            Some((a, b))
        } else if !tier.priority.is_empty() && !tier.normal.is_empty() {
            let a = tier.priority.pop_front().unwrap();
            let b = tier.normal.pop_front().unwrap();
            Some((a, b))
        } else if tier.normal.len() >= 2 {
            let a = tier.normal.pop_front().unwrap();
            let b = tier.normal.pop_front().unwrap();
            Some((a, b))
        } else {
            None
        };

        let (a, b) = pair?;

        if a.user_id == b.user_id {
            // Anti-self-match guard: only reachable via a buggy duplicate
            // enqueue upstream (add_to_queue always removes prior entries
            // first). Reinsert at head and report no match.
            warn!(user_id = %a.user_id, mode = ?mode, "queue anti-self-match guard triggered");
            tier.normal.push_front(b);
            tier.normal.push_front(a);
            return None;
        }

        inner.index.remove(&a.user_id);
        inner.index.remove(&b.user_id);
        crate::metrics::queue_gauge(mode).sub(2);

        let wait_time = elapsed_max(a.enqueued_at, b.enqueued_at);
        Some(Matched {
            user1: a.user_id,
            user2: b.user_id,
            wait_time,
            mode,
        })
    }

    /// Remove `user_id` from whatever queue it occupies.
    pub fn remove_from_queue(&self, user_id: &str) -> bool {
        let mut inner = self.inner.lock();
        Self::remove_locked(&mut inner, user_id)
    }

    fn remove_locked(inner: &mut Inner, user_id: &str) -> bool {
        let Some((mode, was_priority)) = inner.index.remove(user_id) else {
            return false;
        };
        let tier = &mut inner.tiers[mode.index()];
        let deque = if was_priority { &mut tier.priority } else { &mut tier.normal };
        if let Some(pos) = deque.iter().position(|e| e.user_id == user_id) {
            deque.remove(pos);
            crate::metrics::queue_gauge(mode).dec();
            true
        } else {
            false
        }
    }

    pub fn is_in_queue(&self, user_id: &str) -> Option<QueueStatus> {
        let inner = self.inner.lock();
        let (mode, was_priority) = *inner.index.get(user_id)?;
        let tier = &inner.tiers[mode.index()];
        let deque = if was_priority { &tier.priority } else { &tier.normal };
        let entry = deque.iter().find(|e| e.user_id == user_id)?;
        Some(QueueStatus {
            mode,
            priority: entry.priority,
            wait_time: elapsed_since(entry.enqueued_at),
        })
    }

    /// Total number of waiting users across every mode and tier.
    pub fn total_len(&self) -> usize {
        self.inner.lock().index.len()
    }

    /// Number of waiting users for a single mode (both tiers).
    pub fn len_for_mode(&self, mode: Mode) -> usize {
        let inner = self.inner.lock();
        let tier = &inner.tiers[mode.index()];
        tier.priority.len() + tier.normal.len()
    }

    /// Sweep entries older than `queue_timeout`, returning how many were evicted.
    pub fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let timeout = self.queue_timeout;
        let mut removed = 0;

        for (idx, tier) in inner.tiers.iter_mut().enumerate() {
            let mode = Mode::ALL[idx];
            for deque in [&mut tier.priority, &mut tier.normal] {
                let before = deque.len();
                deque.retain(|entry| elapsed_since(entry.enqueued_at) <= timeout);
                let evicted = before - deque.len();
                if evicted > 0 {
                    crate::metrics::queue_gauge(mode).sub(evicted as i64);
                }
                removed += evicted;
            }
        }

        if removed > 0 {
            // Rebuild the index since individual entries above were dropped
            // without a matching index removal.
            inner.index.retain(|user_id, (mode, was_priority)| {
                let tier = &inner_tiers_ref(&inner.tiers, *mode);
                let deque = if *was_priority { &tier.priority } else { &tier.normal };
                deque.iter().any(|e| &e.user_id == user_id)
            });
            self.timeouts
                .fetch_add(removed as u64, std::sync::atomic::Ordering::Relaxed);
        }

        removed
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeouts.load(std::sync::atomic::Ordering::Relaxed)
    }
}

fn inner_tiers_ref(tiers: &[ModeTiers; 3], mode: Mode) -> &ModeTiers {
    &tiers[mode.index()]
}

fn elapsed_since(at: Instant) -> Duration {
    Instant::now().saturating_duration_since(at)
}

fn elapsed_max(a: Instant, b: Instant) -> Duration {
    elapsed_since(a).max(elapsed_since(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> QueueManager {
        QueueManager::new(10, Duration::from_secs(300))
    }

    #[test]
    fn no_match_with_one_waiting_user() {
        let q = mgr();
        q.add_to_queue("a".into(), Mode::Text, 0);
        assert!(q.match_users(Mode::Text).is_none());
    }

    #[test]
    fn matches_two_normal_tier_users_fifo() {
        let q = mgr();
        q.add_to_queue("a".into(), Mode::Text, 0);
        q.add_to_queue("b".into(), Mode::Text, 0);
        let m = q.match_users(Mode::Text).unwrap();
        assert_eq!(m.user1, "a");
        assert_eq!(m.user2, "b");
        assert_eq!(q.total_len(), 0);
    }

    #[test]
    fn priority_tier_is_matched_before_normal() {
        let q = mgr();
        q.add_to_queue("normal1".into(), Mode::Text, 0);
        q.add_to_queue("priority1".into(), Mode::Text, 5);
        q.add_to_queue("priority2".into(), Mode::Text, 5);
        let m = q.match_users(Mode::Text).unwrap();
        assert_eq!(m.user1, "priority1");
        assert_eq!(m.user2, "priority2");
        assert_eq!(q.total_len(), 1);
    }

    #[test]
    fn one_priority_one_normal_pairs_across_tiers() {
        let q = mgr();
        q.add_to_queue("normal1".into(), Mode::Text, 0);
        q.add_to_queue("priority1".into(), Mode::Text, 5);
        let m = q.match_users(Mode::Text).unwrap();
        assert_eq!(m.user1, "priority1");
        assert_eq!(m.user2, "normal1");
    }

    #[test]
    fn rejoining_moves_existing_entry() {
        let q = mgr();
        q.add_to_queue("a".into(), Mode::Text, 0);
        q.add_to_queue("a".into(), Mode::Video, 0);
        assert!(q.is_in_queue("a").unwrap().mode == Mode::Video);
        assert_eq!(q.len_for_mode(Mode::Text), 0);
    }

    #[test]
    fn remove_from_queue_clears_entry() {
        let q = mgr();
        q.add_to_queue("a".into(), Mode::Text, 0);
        assert!(q.remove_from_queue("a"));
        assert!(!q.remove_from_queue("a"));
        assert!(q.is_in_queue("a").is_none());
    }

    #[test]
    fn queue_full_rejects_admission() {
        let q = QueueManager::new(1, Duration::from_secs(300));
        assert_eq!(q.add_to_queue("a".into(), Mode::Text, 0), AddOutcome::Admitted);
        assert_eq!(
            q.add_to_queue("b".into(), Mode::Text, 0),
            AddOutcome::RejectedFull
        );
    }

    #[test]
    fn different_modes_do_not_interfere() {
        let q = mgr();
        q.add_to_queue("a".into(), Mode::Text, 0);
        q.add_to_queue("b".into(), Mode::Video, 0);
        assert!(q.match_users(Mode::Text).is_none());
        assert!(q.match_users(Mode::Video).is_none());
    }
}
