use crate::audio::ClipInfo;

use super::state::SessionState;

/// Observable things a session does, published in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    FrameSent { sequence: u64, bytes: usize },
    /// Captured while the transport was not sendable
    FrameDropped { sequence: u64 },
    TextReceived { len: usize },
    AudioReceived { index: u64, bytes: usize },
    PlaybackFinished { index: u64, clip: ClipInfo },
    /// Decode or playback failed for one payload; the session continues
    PlaybackFailed { index: u64, error: String },
}

/// Receives text notifications from the call server
pub trait TextHandler: Send {
    fn on_text(&mut self, text: &str);
}

impl<F> TextHandler for F
where
    F: FnMut(&str) + Send,
{
    fn on_text(&mut self, text: &str) {
        self(text)
    }
}
