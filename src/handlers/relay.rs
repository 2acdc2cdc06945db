use serde_json::Value;

use crate::state::AppState;
use crate::wire::ServerMessage;

/// `offer` / `answer` / `ice-candidate`: opaque relay, pass the payload
/// through untouched.
pub fn handle_signaling(
    state: &AppState,
    user_id: &str,
    target_id: &str,
    payload: Value,
    wrap: fn(String, Value) -> ServerMessage,
) {
    if !state.pairing.is_paired_with(user_id, target_id) {
        tracing::debug!(user_id, target_id, "dropping signaling relay: not paired");
        return;
    }
    state
        .connections
        .send_to_user(target_id, wrap(user_id.to_string(), payload));
}

/// `typing-start` / `typing-stop`: relay to `targetId`, no pairing guard in
/// the spec's schema table (already-disconnected targets simply drop it).
pub fn handle_typing(state: &AppState, user_id: &str, target_id: &str, starting: bool) {
    let message = if starting {
        ServerMessage::TypingStart { from: user_id.to_string() }
    } else {
        ServerMessage::TypingStop { from: user_id.to_string() }
    };
    state.connections.send_to_user(target_id, message);
}

/// `video-request` / `-accept` / `-decline` / `-cancel`: relay only if
/// `from`/`to` are actually paired with each other; no state transition —
/// the client drives the real switch via `mode-switch-to-video`.
pub fn handle_video_signal(
    state: &AppState,
    from: &str,
    to: &str,
    wrap: fn(String) -> ServerMessage,
) {
    if !state.pairing.is_paired_with(from, to) {
        tracing::debug!(from, to, "dropping video signal: not paired");
        return;
    }
    state.connections.send_to_user(to, wrap(from.to_string()));
}
