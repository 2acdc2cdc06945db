//! Wire message schema.
//!
//! Every frame is a JSON object with a string `type`. Client-originated and
//! server-originated messages are modeled as separate tagged enums so a
//! handler can never accidentally construct a message shape the other side
//! doesn't expect. Signaling payloads (offer/answer/candidate) are kept as
//! an opaque [`serde_json::Value`] — the server relays them without
//! inspecting their contents, per the spec's peer-to-peer setup contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Identify {
        #[serde(rename = "userId")]
        user_id: String,
        fingerprint: String,
    },
    JoinText {
        #[serde(rename = "userId")]
        user_id: String,
    },
    JoinVideo {
        #[serde(rename = "userId")]
        user_id: String,
    },
    JoinVoice {
        #[serde(rename = "userId")]
        user_id: String,
    },
    TextMessage {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        message: String,
    },
    Offer {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        payload: Value,
    },
    Answer {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        payload: Value,
    },
    IceCandidate {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        payload: Value,
    },
    Disconnect {
        #[serde(rename = "userId")]
        user_id: String,
    },
    TypingStart {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    TypingStop {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    ReportUser {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "reportedId")]
        reported_id: String,
        reason: String,
    },
    VideoRequest {
        to: String,
        from: String,
    },
    VideoAccept {
        to: String,
        from: String,
    },
    VideoDecline {
        to: String,
        from: String,
    },
    VideoCancel {
        to: String,
        from: String,
    },
    ModeSwitchToVideo {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "partnerId")]
        partner_id: String,
    },
    Ping,
}

/// Every `type` tag a well-formed client frame may declare, in the same
/// order as [`ClientMessage::type_name`]. Checked before attempting to
/// deserialize a frame's body so an unrecognized type can be reported
/// without the transport closing.
pub const KNOWN_TYPES: &[&str] = &[
    "identify",
    "join-text",
    "join-video",
    "join-voice",
    "text-message",
    "offer",
    "answer",
    "ice-candidate",
    "disconnect",
    "typing-start",
    "typing-stop",
    "report-user",
    "video-request",
    "video-accept",
    "video-decline",
    "video-cancel",
    "mode-switch-to-video",
    "ping",
];

impl ClientMessage {
    /// The frame's declared `type`, used for schema-validation error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Identify { .. } => "identify",
            ClientMessage::JoinText { .. } => "join-text",
            ClientMessage::JoinVideo { .. } => "join-video",
            ClientMessage::JoinVoice { .. } => "join-voice",
            ClientMessage::TextMessage { .. } => "text-message",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::Disconnect { .. } => "disconnect",
            ClientMessage::TypingStart { .. } => "typing-start",
            ClientMessage::TypingStop { .. } => "typing-stop",
            ClientMessage::ReportUser { .. } => "report-user",
            ClientMessage::VideoRequest { .. } => "video-request",
            ClientMessage::VideoAccept { .. } => "video-accept",
            ClientMessage::VideoDecline { .. } => "video-decline",
            ClientMessage::VideoCancel { .. } => "video-cancel",
            ClientMessage::ModeSwitchToVideo { .. } => "mode-switch-to-video",
            ClientMessage::Ping => "ping",
        }
    }
}

/// A message the server sends to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Waiting,
    Paired {
        #[serde(rename = "partnerId")]
        partner_id: String,
        #[serde(rename = "isOfferer", skip_serializing_if = "Option::is_none")]
        is_offerer: Option<bool>,
    },
    TextMessage {
        from: String,
        message: String,
    },
    Offer {
        from: String,
        payload: Value,
    },
    Answer {
        from: String,
        payload: Value,
    },
    IceCandidate {
        from: String,
        payload: Value,
    },
    TypingStart {
        from: String,
    },
    TypingStop {
        from: String,
    },
    PartnerDisconnected,
    UserCount {
        count: usize,
    },
    VideoRequest {
        from: String,
    },
    VideoAccept {
        from: String,
    },
    VideoDecline {
        from: String,
    },
    VideoCancel {
        from: String,
    },
    VideoModeReady {
        #[serde(rename = "isOfferer")]
        is_offerer: bool,
        #[serde(rename = "partnerId")]
        partner_id: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
}
