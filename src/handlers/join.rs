use tracing::info;

use crate::error::RouterError;
use crate::queue::{AddOutcome, Mode};
use crate::state::AppState;
use crate::wire::ServerMessage;

/// `join-text` / `join-video` / `join-voice`.
///
/// Enqueues `user_id`, then attempts a match for `mode`. The matched pair
/// returned by the queue is not necessarily `(user_id, ...)` — the queue
/// only ever holds more than one waiting entry transiently, but whichever
/// two entries come back are the ones notified; `user_id` is only told
/// `waiting` when no match results from this attempt.
pub fn handle_join(state: &AppState, user_id: &str, mode: Mode) {
    match state.queue.add_to_queue(user_id.to_string(), mode, 0) {
        AddOutcome::RejectedFull => {
            state.connections.send_to_user(
                user_id,
                ServerMessage::Error {
                    message: RouterError::QueueFull.client_message(),
                },
            );
            return;
        }
        AddOutcome::Admitted => {}
    }

    let Some(matched) = state.queue.match_users(mode) else {
        state.connections.send_to_user(user_id, ServerMessage::Waiting);
        return;
    };

    if state
        .pairing
        .create_pair(matched.user1.clone(), matched.user2.clone(), mode)
        .is_err()
    {
        // Should be unreachable: match_users already removed both entries
        // from the queue, so neither side can already be paired.
        return;
    }

    crate::metrics::MATCHES_MADE.inc();
    info!(
        user1 = %matched.user1,
        user2 = %matched.user2,
        mode = ?mode,
        wait_ms = matched.wait_time.as_millis() as u64,
        "matched pair"
    );

    let is_video = mode == Mode::Video;
    state.connections.send_to_user(
        &matched.user1,
        ServerMessage::Paired {
            partner_id: matched.user2.clone(),
            is_offerer: is_video.then_some(true),
        },
    );
    state.connections.send_to_user(
        &matched.user2,
        ServerMessage::Paired {
            partner_id: matched.user1,
            is_offerer: is_video.then_some(false),
        },
    );
}
