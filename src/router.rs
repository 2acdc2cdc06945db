//! Message Router — the only module that orchestrates the other managers.
//!
//! Frame-level validation (size cap, JSON decoding, unknown type) happens
//! in [`crate::gateway`] before a [`ClientMessage`] ever reaches here;
//! `route` assumes the frame already deserialized into a known, schema-valid
//! variant and only has to decide what to call and what to relay.

use serde_json::Value;

use crate::handlers;
use crate::queue::Mode;
use crate::state::AppState;
use crate::wire::{ClientMessage, ServerMessage};

pub fn route(state: &AppState, msg: ClientMessage) {
    match msg {
        ClientMessage::Identify { user_id, fingerprint } => {
            handlers::handle_identify(state, &user_id, &fingerprint);
        }
        ClientMessage::JoinText { user_id } => handlers::handle_join(state, &user_id, Mode::Text),
        ClientMessage::JoinVideo { user_id } => handlers::handle_join(state, &user_id, Mode::Video),
        ClientMessage::JoinVoice { user_id } => handlers::handle_join(state, &user_id, Mode::Voice),
        ClientMessage::TextMessage { user_id, target_id, message } => {
            handlers::handle_text_message(state, &user_id, &target_id, &message);
        }
        ClientMessage::Offer { user_id, target_id, payload } => {
            handlers::handle_signaling(state, &user_id, &target_id, payload, wrap_offer);
        }
        ClientMessage::Answer { user_id, target_id, payload } => {
            handlers::handle_signaling(state, &user_id, &target_id, payload, wrap_answer);
        }
        ClientMessage::IceCandidate { user_id, target_id, payload } => {
            handlers::handle_signaling(state, &user_id, &target_id, payload, wrap_ice_candidate);
        }
        ClientMessage::Disconnect { user_id } => {
            handlers::handle_disconnect(state, &user_id);
        }
        ClientMessage::TypingStart { user_id, target_id } => {
            handlers::handle_typing(state, &user_id, &target_id, true);
        }
        ClientMessage::TypingStop { user_id, target_id } => {
            handlers::handle_typing(state, &user_id, &target_id, false);
        }
        ClientMessage::ReportUser { user_id, reported_id, reason } => {
            handlers::handle_report_user(state, &user_id, &reported_id, &reason);
        }
        ClientMessage::VideoRequest { to, from } => {
            handlers::handle_video_signal(state, &from, &to, wrap_video_request);
        }
        ClientMessage::VideoAccept { to, from } => {
            handlers::handle_video_signal(state, &from, &to, wrap_video_accept);
        }
        ClientMessage::VideoDecline { to, from } => {
            handlers::handle_video_signal(state, &from, &to, wrap_video_decline);
        }
        ClientMessage::VideoCancel { to, from } => {
            handlers::handle_video_signal(state, &from, &to, wrap_video_cancel);
        }
        ClientMessage::ModeSwitchToVideo { user_id, partner_id } => {
            handlers::handle_mode_switch(state, &user_id, &partner_id);
        }
        ClientMessage::Ping => handlers::handle_ping(state, ""),
    }
}

fn wrap_offer(from: String, payload: Value) -> ServerMessage {
    ServerMessage::Offer { from, payload }
}
fn wrap_answer(from: String, payload: Value) -> ServerMessage {
    ServerMessage::Answer { from, payload }
}
fn wrap_ice_candidate(from: String, payload: Value) -> ServerMessage {
    ServerMessage::IceCandidate { from, payload }
}
fn wrap_video_request(from: String) -> ServerMessage {
    ServerMessage::VideoRequest { from }
}
fn wrap_video_accept(from: String) -> ServerMessage {
    ServerMessage::VideoAccept { from }
}
fn wrap_video_decline(from: String) -> ServerMessage {
    ServerMessage::VideoDecline { from }
}
fn wrap_video_cancel(from: String) -> ServerMessage {
    ServerMessage::VideoCancel { from }
}
