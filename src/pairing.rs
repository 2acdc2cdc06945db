//! Pairing Manager — authoritative pair relation, session state, and the
//! two-step mode-switch handshake.
//!
//! A session is stored once per side (so `get_pair`/`is_paired` are O(1)
//! from either user's id) but both copies share a `pair_id` and are kept in
//! sync by explicit double-writes in [`increment_message_count`] and
//! [`commit_switch`]. A user's *individual* mode (tracked in `user_modes`)
//! can briefly diverge from the session's canonical mode while a mode
//! switch is pending — only the first caller's own mode moves until the
//! second call commits the switch for both sides.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::queue::Mode;

pub type UserId = String;

#[derive(Debug, Clone)]
pub struct SwitchRecord {
    pub from: Mode,
    pub to: Mode,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub pair_id: String,
    pub partner_id: UserId,
    pub mode: Mode,
    pub started_at: Instant,
    pub message_count: u64,
    pub switch_history: Vec<SwitchRecord>,
}

#[derive(Debug, Clone)]
struct PendingSwitch {
    initiator: UserId,
    target_mode: Mode,
    requested_at: Instant,
}

struct Inner {
    sessions: HashMap<UserId, Session>,
    user_modes: HashMap<UserId, Mode>,
    /// Keyed by the user who still needs to respond.
    pending: HashMap<UserId, PendingSwitch>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreatePairError {
    SelfPair,
    AlreadyPaired,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SwitchError {
    NotPaired,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// First arrival; partner has not yet called with a matching request.
    Pending,
    /// Second arrival committed the switch. `initiator` is the offerer.
    Ready { initiator: UserId },
}

fn sorted_pair_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

pub struct PairingManager {
    inner: Mutex<Inner>,
    mode_switch_timeout: Duration,
}

impl PairingManager {
    pub fn new(mode_switch_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                user_modes: HashMap::new(),
                pending: HashMap::new(),
            }),
            mode_switch_timeout,
        }
    }

    pub fn create_pair(
        &self,
        user1: UserId,
        user2: UserId,
        mode: Mode,
    ) -> Result<(), CreatePairError> {
        if user1 == user2 {
            return Err(CreatePairError::SelfPair);
        }

        let mut inner = self.inner.lock();
        if inner.sessions.contains_key(&user1) || inner.sessions.contains_key(&user2) {
            return Err(CreatePairError::AlreadyPaired);
        }

        let pair_id = sorted_pair_id(&user1, &user2);
        let now = Instant::now();
        inner.sessions.insert(
            user1.clone(),
            Session {
                pair_id: pair_id.clone(),
                partner_id: user2.clone(),
                mode,
                started_at: now,
                message_count: 0,
                switch_history: Vec::new(),
            },
        );
        inner.sessions.insert(
            user2.clone(),
            Session {
                pair_id,
                partner_id: user1.clone(),
                mode,
                started_at: now,
                message_count: 0,
                switch_history: Vec::new(),
            },
        );
        inner.user_modes.insert(user1, mode);
        inner.user_modes.insert(user2, mode);
        Ok(())
    }

    pub fn get_pair(&self, user_id: &str) -> Option<Session> {
        self.inner.lock().sessions.get(user_id).cloned()
    }

    pub fn get_session_data(&self, user_id: &str) -> Option<Session> {
        self.get_pair(user_id)
    }

    pub fn is_paired(&self, user_id: &str) -> bool {
        self.inner.lock().sessions.contains_key(user_id)
    }

    /// Verifies `pair(user_id) == partner_id`, guarding against stale ids.
    pub fn is_paired_with(&self, user_id: &str, partner_id: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .get(user_id)
            .is_some_and(|s| s.partner_id == partner_id)
    }

    /// The user's individual mode, which may briefly lead the session's
    /// canonical mode during a pending switch.
    pub fn get_user_mode(&self, user_id: &str) -> Option<Mode> {
        self.inner.lock().user_modes.get(user_id).copied()
    }

    /// Atomically removes both sides of the pair, the session, and any
    /// pending mode-switch entries keyed by either side.
    pub fn break_pair(&self, user_id: &str) -> Option<UserId> {
        let mut inner = self.inner.lock();
        let session = inner.sessions.remove(user_id)?;
        let partner_id = session.partner_id;
        inner.sessions.remove(&partner_id);
        inner.user_modes.remove(user_id);
        inner.user_modes.remove(&partner_id);
        inner.pending.remove(user_id);
        inner.pending.remove(&partner_id);
        inner
            .pending
            .retain(|_, p| p.initiator != user_id && p.initiator != partner_id);
        Some(partner_id)
    }

    pub fn increment_message_count(&self, user_id: &str) {
        let mut inner = self.inner.lock();
        let Some(partner_id) = inner.sessions.get(user_id).map(|s| s.partner_id.clone()) else {
            return;
        };
        if let Some(s) = inner.sessions.get_mut(user_id) {
            s.message_count += 1;
        }
        if let Some(s) = inner.sessions.get_mut(&partner_id) {
            s.message_count += 1;
        }
    }

    /// `user_id` requests switching the pair to `new_mode`, naming
    /// `partner_id` explicitly (the router re-verifies the pairing).
    pub fn switch_mode(
        &self,
        user_id: &str,
        partner_id: &str,
        new_mode: Mode,
    ) -> Result<SwitchOutcome, SwitchError> {
        let mut inner = self.inner.lock();
        let paired_with = inner
            .sessions
            .get(user_id)
            .map(|s| s.partner_id.clone());
        if paired_with.as_deref() != Some(partner_id) {
            return Err(SwitchError::NotPaired);
        }

        let pending = inner.pending.get(user_id).cloned();
        let pending_is_valid = pending
            .as_ref()
            .is_some_and(|p| p.initiator == partner_id && !self.is_expired(p));

        if pending_is_valid {
            inner.pending.remove(user_id);
            // Re-verify the pairing survived the wait (guards against an
            // intervening break between the two calls).
            let still_paired = inner
                .sessions
                .get(user_id)
                .map(|s| s.partner_id.clone())
                .as_deref()
                == Some(partner_id);
            if !still_paired {
                return Err(SwitchError::NotPaired);
            }
            self.commit_switch(&mut inner, user_id, partner_id, new_mode);
            return Ok(SwitchOutcome::Ready {
                initiator: partner_id.to_string(),
            });
        }

        if pending.is_some() {
            // Stale/mismatched entry (e.g. partner started a different
            // handshake). Drop it and start fresh below.
            inner.pending.remove(user_id);
        }

        inner.pending.insert(
            partner_id.to_string(),
            PendingSwitch {
                initiator: user_id.to_string(),
                target_mode: new_mode,
                requested_at: Instant::now(),
            },
        );
        inner.user_modes.insert(user_id.to_string(), new_mode);
        Ok(SwitchOutcome::Pending)
    }

    fn is_expired(&self, pending: &PendingSwitch) -> bool {
        crate::clock::elapsed_since(pending.requested_at) > self.mode_switch_timeout
    }

    fn commit_switch(&self, inner: &mut Inner, user_id: &str, partner_id: &str, new_mode: Mode) {
        let old_mode = inner
            .sessions
            .get(user_id)
            .map(|s| s.mode)
            .unwrap_or(new_mode);
        let record = SwitchRecord {
            from: old_mode,
            to: new_mode,
            at: Instant::now(),
        };
        inner.user_modes.insert(user_id.to_string(), new_mode);
        for id in [user_id, partner_id] {
            if let Some(s) = inner.sessions.get_mut(id) {
                s.mode = new_mode;
                s.switch_history.push(record.clone());
            }
        }
    }

    /// Drop pending mode-switch requests older than the configured timeout.
    pub fn sweep_expired_switches(&self) -> usize {
        let mut inner = self.inner.lock();
        let timeout = self.mode_switch_timeout;
        let before = inner.pending.len();
        inner
            .pending
            .retain(|_, p| crate::clock::elapsed_since(p.requested_at) <= timeout);
        let removed = before - inner.pending.len();
        if removed > 0 {
            warn!(count = removed, "swept expired mode-switch requests");
        }
        removed
    }

    pub fn active_pair_count(&self) -> usize {
        self.inner.lock().sessions.len() / 2
    }
}
