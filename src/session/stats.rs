use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Encoded frames transmitted
    pub frames_sent: u64,

    /// Frames captured while the transport was not sendable
    pub frames_dropped: u64,

    /// Bytes transmitted in encoded frames
    pub bytes_sent: u64,

    /// Text notifications forwarded to the handler
    pub text_messages: u64,

    /// Audio payloads received
    pub audio_payloads: u64,

    /// Payloads decoded and played to completion
    pub playbacks_completed: u64,

    /// Payloads that failed to decode or play
    pub playback_failures: u64,

    /// Every lifecycle state entered, in order
    pub transitions: Vec<SessionState>,
}

impl SessionStats {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            duration_secs: 0.0,
            frames_sent: 0,
            frames_dropped: 0,
            bytes_sent: 0,
            text_messages: 0,
            audio_payloads: 0,
            playbacks_completed: 0,
            playback_failures: 0,
            transitions: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self, transitions: &[SessionState]) {
        let duration = Utc::now().signed_duration_since(self.started_at);
        self.duration_secs = duration.num_milliseconds() as f64 / 1000.0;
        self.transitions = transitions.to_vec();
    }
}
