use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Default capture rate in Hz (mono)
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Default number of samples per Audio Frame
pub const DEFAULT_FRAME_LENGTH: usize = 4096;

/// Capacity of the frame channel between a device thread and the session
pub(crate) const FRAME_CHANNEL_CAPACITY: usize = 32;

/// One fixed-length block of mono samples in `[-1.0, 1.0]`
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples, exactly `frame_length` of them
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Capture order, starting at 0
    pub sequence: u64,
    /// Milliseconds of audio captured before this frame
    pub timestamp_ms: u64,
}

/// Output of a running capture source
#[derive(Debug)]
pub enum CaptureEvent {
    Frame(AudioFrame),
    /// The device disappeared mid-stream; no further frames follow
    DeviceLost(String),
}

/// Configuration shared by capture sources
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (device audio is resampled if needed)
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_length: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_length: DEFAULT_FRAME_LENGTH,
        }
    }
}

impl CaptureConfig {
    /// Duration of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> u64 {
        (self.frame_length as u64 * 1000) / self.sample_rate.max(1) as u64
    }
}

/// Audio capture capability
///
/// Implementations:
/// - [`MicrophoneCapture`](super::MicrophoneCapture): default input device via cpal
/// - [`FileCapture`](super::FileCapture): replays a WAV file (testing, scripted calls)
#[async_trait]
pub trait CaptureSource: Send {
    /// Start capturing audio
    ///
    /// Suspends until the device is acquired. Returns a channel of capture events;
    /// the channel closing means capture ended. Fails with
    /// [`SessionError::CaptureUnavailable`] when the device cannot be opened or a
    /// capture is already running.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, SessionError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<(), SessionError>;

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Capture source selection
#[derive(Debug, Clone)]
pub enum CaptureKind {
    /// Default microphone
    Microphone,
    /// WAV file, paced in real time when `realtime` is set
    File { path: PathBuf, realtime: bool },
}

/// Capture source factory
pub struct CaptureFactory;

impl CaptureFactory {
    pub fn create(kind: CaptureKind, config: CaptureConfig) -> Box<dyn CaptureSource> {
        match kind {
            CaptureKind::Microphone => Box::new(super::MicrophoneCapture::new(config)),
            CaptureKind::File { path, realtime } => {
                Box::new(super::FileCapture::new(path, config).realtime(realtime))
            }
        }
    }
}
