use crate::error::RouterError;
use crate::security::{ActionClass, UserAction};
use crate::state::AppState;
use crate::wire::ServerMessage;

/// `text-message`: rate-limited, content-validated relay between a paired
/// sender and target.
pub fn handle_text_message(state: &AppState, user_id: &str, target_id: &str, message: &str) {
    if !state.security.check_rate_limit(
        user_id,
        ActionClass::Message,
        &state.config.rate_limits.messages,
    ) {
        state.connections.send_to_user(
            user_id,
            ServerMessage::Error {
                message: RouterError::RateLimited.client_message(),
            },
        );
        return;
    }

    let filtered = match state.security.validate_message(message) {
        Ok(filtered) => filtered,
        Err(reason) => {
            state.connections.send_to_user(
                user_id,
                ServerMessage::Error {
                    message: reason.reason(),
                },
            );
            return;
        }
    };

    if !state.pairing.is_paired_with(user_id, target_id) {
        tracing::debug!(user_id, target_id, "dropping text-message: not paired");
        return;
    }

    state.security.track_user_action(user_id, UserAction::Message);
    state.pairing.increment_message_count(user_id);
    crate::handlers::escalate_abuse(state, user_id);

    state.connections.send_to_user(
        target_id,
        ServerMessage::TextMessage {
            from: user_id.to_string(),
            message: filtered,
        },
    );
    crate::metrics::MESSAGES_RELAYED.inc();
}
