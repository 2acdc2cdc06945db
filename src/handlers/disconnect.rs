use crate::security::UserAction;
use crate::state::AppState;
use crate::wire::ServerMessage;

/// The disconnect sequence (spec §4.5.1) — the most order-sensitive flow in
/// the router. Called both for an explicit `disconnect` frame and when a
/// connection task's read loop ends (transport drop or forced close).
///
/// Step ordering matters: queue removal and abuse tracking happen before
/// the pair is broken, and the partner is notified of the disconnect
/// before being re-queued.
pub fn handle_disconnect(state: &AppState, user_id: &str) {
    state.queue.remove_from_queue(user_id);

    // Only meaningful if `user_id` was actually paired, matching the
    // upstream behavior this spec preserves: any disconnect while paired
    // counts as a skip, whether the user left deliberately or the
    // transport just dropped.
    let was_paired = state.pairing.is_paired(user_id);
    if was_paired {
        state.security.track_user_action(user_id, UserAction::Skip);
    }
    crate::handlers::escalate_abuse(state, user_id);

    // Snapshot the partner's mode before breaking the pair: `break_pair`
    // clears both sides' individual mode entries.
    let partner_mode = state
        .pairing
        .get_pair(user_id)
        .and_then(|session| state.pairing.get_user_mode(&session.partner_id));

    let Some(partner_id) = state.pairing.break_pair(user_id) else {
        state.security.remove_user(user_id);
        return;
    };

    state
        .connections
        .send_to_user(&partner_id, ServerMessage::PartnerDisconnected);

    if state.connections.is_connected(&partner_id) {
        if let Some(mode) = partner_mode {
            state.queue.add_to_queue(partner_id.clone(), mode, 0);
            state
                .connections
                .send_to_user(&partner_id, ServerMessage::Waiting);
        }
    }

    state.security.remove_user(user_id);
}
