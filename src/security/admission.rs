//! IP admission: the ban table and the connection-flood window.
//!
//! Both tables key on [`IpAddr`] and expire entries lazily on read, matching
//! the teacher's ban-cache approach of never scanning proactively for
//! expiry — a background sweep (see [`super::SecurityManager::cleanup`])
//! exists only to bound memory, not to enforce correctness.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct BanEntry {
    until: Instant,
    #[allow(dead_code)]
    reason: String,
}

pub struct AdmissionTable {
    bans: DashMap<IpAddr, BanEntry>,
    connection_windows: DashMap<IpAddr, VecDeque<Instant>>,
    max_connections_per_ip: usize,
}

const CONNECTION_WINDOW: Duration = Duration::from_secs(60);

impl AdmissionTable {
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            bans: DashMap::new(),
            connection_windows: DashMap::new(),
            max_connections_per_ip,
        }
    }

    /// Whether `ip` is currently banned. Removes the entry if it has expired.
    pub fn is_ip_banned(&self, ip: IpAddr) -> bool {
        let Some(entry) = self.bans.get(&ip) else {
            return false;
        };
        let still_banned = Instant::now() < entry.until;
        if !still_banned {
            drop(entry);
            self.bans.remove(&ip);
        }
        still_banned
    }

    pub fn ban_ip(&self, ip: IpAddr, duration: Duration, reason: impl Into<String>) {
        self.bans.insert(
            ip,
            BanEntry {
                until: Instant::now() + duration,
                reason: reason.into(),
            },
        );
    }

    pub fn unban_ip(&self, ip: IpAddr) {
        self.bans.remove(&ip);
    }

    /// Drops timestamps older than the 60 s window, then admits `ip` if the
    /// resulting window length is below the cap.
    pub fn track_ip_connection(&self, ip: IpAddr) -> bool {
        let mut window = self.connection_windows.entry(ip).or_default();
        let now = Instant::now();
        window.retain(|t| now.saturating_duration_since(*t) <= CONNECTION_WINDOW);

        if window.len() >= self.max_connections_per_ip {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Drop bans that have expired and connection windows idle for an hour.
    pub fn cleanup(&self) {
        self.bans.retain(|_, entry| Instant::now() < entry.until);
        self.connection_windows.retain(|_, window| {
            window
                .back()
                .is_some_and(|t| crate::clock::elapsed_since(*t) <= Duration::from_secs(3600))
        });
    }
}
