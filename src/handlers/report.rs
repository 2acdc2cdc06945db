use crate::error::RouterError;
use crate::security::{ActionClass, UserAction};
use crate::state::AppState;
use crate::wire::ServerMessage;

const REPORT_BAN_THRESHOLD: u64 = 5;

/// `report-user`: rate-limited per reporter; escalates to a 24h IP ban and
/// forced disconnect once the fifth distinct accepted report against the
/// same target lands.
pub fn handle_report_user(state: &AppState, user_id: &str, reported_id: &str, reason: &str) {
    if !state.security.check_rate_limit(
        user_id,
        ActionClass::Report,
        &state.config.rate_limits.reports,
    ) {
        state.connections.send_to_user(
            user_id,
            ServerMessage::Error {
                message: RouterError::RateLimited.client_message(),
            },
        );
        return;
    }

    state
        .security
        .track_user_action(reported_id, UserAction::Report);
    tracing::info!(reporter = user_id, reported_id, reason, "report accepted");
    crate::handlers::escalate_abuse(state, reported_id);

    let total_reports = state.security.reputation.record_report_against(reported_id);
    if total_reports < REPORT_BAN_THRESHOLD {
        return;
    }

    let Some(ip) = state.connections.ip_of(reported_id) else {
        return;
    };
    state
        .security
        .ban_ip(ip, state.config.ban_duration, "report cascade");
    state.security.reputation.record_ban_against(reported_id);
    tracing::warn!(reported_id, %ip, "banned IP after report cascade");

    // The connection task's read loop observes the close signal and runs
    // the normal disconnect sequence (queue/pair cleanup, partner notice).
    state.connections.force_disconnect(reported_id);
}
