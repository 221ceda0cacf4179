use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionErrorKind;

/// Lifecycle of a call session
///
/// ```text
/// CONNECTING -> OPEN -> STREAMING -> CLOSED
///      \          \         \
///       +----------+---------+--> ERROR -> CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Connecting,
    Open,
    Streaming,
    Error(SessionErrorKind),
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (*self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (_, Error(_)) => true,
            (Connecting, Open) => true,
            (Open, Streaming) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "CONNECTING"),
            SessionState::Open => write!(f, "OPEN"),
            SessionState::Streaming => write!(f, "STREAMING"),
            SessionState::Error(kind) => write!(f, "ERROR({:?})", kind),
            SessionState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Rejected state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid session transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

/// Current state plus every state entered so far
#[derive(Debug, Clone)]
pub struct Lifecycle {
    current: SessionState,
    history: Vec<SessionState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: SessionState::Connecting,
            history: vec![SessionState::Connecting],
        }
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn advance(&mut self, next: SessionState) -> Result<SessionState, InvalidTransition> {
        if !self.current.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        let previous = self.current;
        self.current = next;
        self.history.push(next);
        Ok(previous)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
