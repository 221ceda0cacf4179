use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::{CaptureConfig, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE};

/// Configuration for a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "call-6f1c...")
    pub session_id: String,

    /// Websocket URL of the call server
    pub url: String,

    /// Outbound sample rate in Hz (mono)
    pub sample_rate: u32,

    /// Samples per outbound frame; each message is twice this many bytes
    pub frame_length: usize,

    /// Keep receiving after the microphone is unavailable instead of closing
    pub keep_open_without_capture: bool,

    /// Archive the call under this directory when set
    pub recordings_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("call-{}", uuid::Uuid::new_v4()),
            url: "ws://localhost:8000/ws".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_length: DEFAULT_FRAME_LENGTH,
            keep_open_without_capture: false,
            recordings_path: None,
        }
    }
}

impl SessionConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            frame_length: self.frame_length,
        }
    }

    /// Size of one outbound binary message
    pub fn frame_bytes(&self) -> usize {
        self.frame_length * 2
    }
}
