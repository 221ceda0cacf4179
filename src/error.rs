use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures a call session can surface
///
/// Only `DecodeFailed` and `Playback` are contained per inbound message; every other
/// kind is fatal to streaming and is returned from [`Session::run`](crate::Session::run).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("handshake with {url} failed: {reason}")]
    HandshakeFailed { url: String, reason: String },

    #[error("microphone unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("capture device lost: {0}")]
    DeviceLost(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode audio payload: {0}")]
    DecodeFailed(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Copyable discriminant of [`SessionError`], carried by `SessionState::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionErrorKind {
    HandshakeFailed,
    CaptureUnavailable,
    DeviceLost,
    Transport,
    DecodeFailed,
    Playback,
}

impl SessionError {
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::HandshakeFailed { .. } => SessionErrorKind::HandshakeFailed,
            SessionError::CaptureUnavailable(_) => SessionErrorKind::CaptureUnavailable,
            SessionError::DeviceLost(_) => SessionErrorKind::DeviceLost,
            SessionError::Transport(_) => SessionErrorKind::Transport,
            SessionError::DecodeFailed(_) => SessionErrorKind::DecodeFailed,
            SessionError::Playback(_) => SessionErrorKind::Playback,
        }
    }

    /// Whether the error only affects a single inbound message
    pub fn is_contained(&self) -> bool {
        matches!(
            self.kind(),
            SessionErrorKind::DecodeFailed | SessionErrorKind::Playback
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}
