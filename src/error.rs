//! Unified error taxonomy for the router and managers.
//!
//! Mirrors the policy table in the spec's error handling design: most
//! variants resolve to a terse `error` reply on the wire rather than
//! closing the transport. Only [`RouterError::close_transport`] variants
//! warrant tearing the connection down.

use thiserror::Error;

/// Errors surfaced while routing a single inbound frame.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("frame too large")]
    FrameTooLarge,

    #[error("malformed json")]
    MalformedJson,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("not paired with target")]
    NotPaired,

    #[error("queue is full")]
    QueueFull,
}

impl RouterError {
    /// Whether this error warrants closing the transport outright.
    ///
    /// Only undecodable JSON does; every other protocol violation gets a
    /// terse `error` reply and the connection stays open.
    pub fn close_transport(&self) -> bool {
        matches!(self, RouterError::MalformedJson)
    }

    /// The message sent back to the client in an `error` frame.
    pub fn client_message(&self) -> String {
        match self {
            RouterError::FrameTooLarge => "frame too large".to_string(),
            RouterError::MalformedJson => "malformed message".to_string(),
            RouterError::UnknownType(t) => format!("unknown message type: {t}"),
            RouterError::MissingField(f) => format!("missing required field: {f}"),
            RouterError::RateLimited => "rate limit exceeded".to_string(),
            RouterError::InvalidContent(reason) => reason.clone(),
            RouterError::NotPaired => "not paired".to_string(),
            RouterError::QueueFull => "queue is full".to_string(),
        }
    }
}
