//! Per-message-type handlers invoked by [`crate::router::route`].
//!
//! Each handler owns exactly the manager calls and wire replies for one
//! frame type; none of them touch the transport directly — delivery goes
//! through [`crate::connection::ConnectionManager`] so a handler never
//! needs to know whether its target is on this task or another.

mod disconnect;
mod join;
mod mode_switch;
mod relay;
mod report;
mod text_message;

pub use disconnect::handle_disconnect;
pub use join::handle_join;
pub use mode_switch::handle_mode_switch;
pub use relay::{handle_signaling, handle_typing, handle_video_signal};
pub use report::handle_report_user;
pub use text_message::handle_text_message;

use std::time::Duration;

use crate::security::{AbusePattern, TrackResult};
use crate::state::AppState;
use crate::wire::ServerMessage;

const SPAMMER_BAN_DURATION: Duration = Duration::from_secs(3600);

pub fn handle_identify(state: &AppState, user_id: &str, fingerprint: &str) {
    let TrackResult { suspicious } = state.security.track_fingerprint(fingerprint, user_id);
    if suspicious {
        state.connections.send_to_user(
            user_id,
            ServerMessage::Warning {
                message: "this fingerprint has a history of violations".to_string(),
            },
        );
    }
}

pub fn handle_ping(_state: &AppState, _user_id: &str) {
    // No-op at this layer; the transport-level pong keeps heartbeat alive.
}

/// Checks `user_id`'s rolling abuse counters against the escalation policy
/// (spec §7): harasser and spammer both warn, ban the IP, and force a
/// disconnect; skip_abuser only warns. Called after every tracked action so
/// escalation happens as soon as a threshold is crossed, not just at
/// disconnect time.
pub fn escalate_abuse(state: &AppState, user_id: &str) {
    let patterns = state.security.detect_abuse_patterns(user_id);
    if patterns.is_empty() {
        return;
    }

    let warn = |message: &str| {
        state.connections.send_to_user(
            user_id,
            ServerMessage::Warning {
                message: message.to_string(),
            },
        );
    };

    if patterns.contains(&AbusePattern::Harasser) {
        warn("repeated reports against you have triggered a ban");
        ban_and_disconnect(state, user_id, state.config.ban_duration, "harasser pattern");
    } else if patterns.contains(&AbusePattern::Spammer) {
        warn("message rate triggered a ban");
        ban_and_disconnect(state, user_id, SPAMMER_BAN_DURATION, "spammer pattern");
    } else if patterns.contains(&AbusePattern::SkipAbuser) {
        warn("excessive skipping detected");
    }
}

fn ban_and_disconnect(state: &AppState, user_id: &str, duration: Duration, reason: &str) {
    if let Some(ip) = state.connections.ip_of(user_id) {
        state.security.ban_ip(ip, duration, reason);
        tracing::warn!(user_id, %ip, reason, "banned IP for abuse escalation");
    }
    state.connections.force_disconnect(user_id);
}
