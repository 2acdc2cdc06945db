//! Security Manager — admission, rate limiting, reputation, content, and
//! abuse-pattern enforcement, aggregated behind one handle the Router holds.
//!
//! ```text
//!            ┌────────────────────┐
//!  upgrade -> │ AdmissionTable     │ ban table + connection flood window
//!            └────────────────────┘
//!            ┌────────────────────┐
//!  identify -> │ ReputationTable    │ fingerprint -> userIds, reports, bans
//!            └────────────────────┘
//!            ┌────────────────────┐
//!  per-frame -> │ RateLimiter        │ sliding window per (user, action)
//!            └────────────────────┘
//!            ┌────────────────────┐
//! text-msg -> │ content::validate  │ dangerous patterns + profanity filter
//!            └────────────────────┘
//!            ┌────────────────────┐
//!  ongoing -> │ AbuseTracker       │ spammer / skip_abuser / harasser
//!            └────────────────────┘
//! ```

pub mod abuse;
pub mod admission;
pub mod content;
pub mod crypto;
pub mod rate_limit;
pub mod reputation;
pub mod tokens;

use std::net::IpAddr;

use crate::config::Config;

pub use abuse::{AbusePattern, AbuseTracker, UserAction};
pub use admission::AdmissionTable;
pub use content::ContentError;
pub use rate_limit::{ActionClass, RateLimiter};
pub use reputation::{ReputationTable, TrackResult};

pub struct SecurityManager {
    pub admission: AdmissionTable,
    pub rate_limiter: RateLimiter,
    pub reputation: ReputationTable,
    pub abuse: AbuseTracker,
    pub cipher: Option<crypto::MessageCipher>,
    pub tokens: Option<tokens::TokenMinter>,
    max_message_length: usize,
}

impl SecurityManager {
    pub fn new(config: &Config) -> Self {
        Self {
            admission: AdmissionTable::new(config.max_connections_per_ip),
            rate_limiter: RateLimiter::new(),
            reputation: ReputationTable::new(),
            abuse: AbuseTracker::new(),
            cipher: None,
            tokens: config
                .jwt_secret
                .as_ref()
                .map(|s| tokens::TokenMinter::new(s.as_bytes().to_vec())),
            max_message_length: config.max_message_length,
        }
    }

    pub fn is_ip_banned(&self, ip: IpAddr) -> bool {
        self.admission.is_ip_banned(ip)
    }

    pub fn track_ip_connection(&self, ip: IpAddr) -> bool {
        self.admission.track_ip_connection(ip)
    }

    pub fn ban_ip(&self, ip: IpAddr, duration: std::time::Duration, reason: &str) {
        crate::metrics::BANS_ISSUED.inc();
        self.admission.ban_ip(ip, duration, reason);
    }

    pub fn check_rate_limit(
        &self,
        user_id: &str,
        action: ActionClass,
        rule: &crate::config::RateLimitRule,
    ) -> bool {
        let ok = self.rate_limiter.check(user_id, action, rule);
        if !ok {
            crate::metrics::RATE_LIMITED.inc();
        }
        ok
    }

    pub fn track_fingerprint(&self, fingerprint: &str, user_id: &str) -> TrackResult {
        self.reputation.track_fingerprint(fingerprint, user_id)
    }

    pub fn validate_message(&self, content: &str) -> Result<String, ContentError> {
        content::validate_message(content, self.max_message_length)
    }

    pub fn track_user_action(&self, user_id: &str, action: UserAction) {
        self.abuse.track_user_action(user_id, action)
    }

    pub fn detect_abuse_patterns(&self, user_id: &str) -> std::collections::HashSet<AbusePattern> {
        self.abuse.detect_abuse_patterns(user_id)
    }

    pub fn remove_user(&self, user_id: &str) {
        self.rate_limiter.remove_user(user_id);
        self.abuse.remove_user(user_id);
    }

    /// Background sweep: expired bans, idle connection windows, idle rate
    /// windows, and stale abuse records.
    pub fn cleanup(&self) {
        self.admission.cleanup();
        self.rate_limiter.cleanup();
        self.abuse.cleanup();
    }
}
