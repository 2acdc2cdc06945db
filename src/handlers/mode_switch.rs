use crate::pairing::SwitchOutcome;
use crate::queue::Mode;
use crate::state::AppState;
use crate::wire::ServerMessage;

/// `mode-switch-to-video`: drives the two-step handshake in
/// [`crate::pairing::PairingManager::switch_mode`]. Only the second caller
/// triggers any wire traffic — the first caller waits silently until their
/// partner calls with the same target mode.
pub fn handle_mode_switch(state: &AppState, user_id: &str, partner_id: &str) {
    match state.pairing.switch_mode(user_id, partner_id, Mode::Video) {
        Ok(SwitchOutcome::Pending) => {}
        Ok(SwitchOutcome::Ready { initiator }) => {
            state.connections.send_to_user(
                &initiator,
                ServerMessage::VideoModeReady {
                    is_offerer: true,
                    partner_id: user_id.to_string(),
                },
            );
            state.connections.send_to_user(
                user_id,
                ServerMessage::VideoModeReady {
                    is_offerer: false,
                    partner_id: initiator,
                },
            );
        }
        Err(_) => {
            tracing::debug!(user_id, partner_id, "mode-switch-to-video: not paired");
        }
    }
}
