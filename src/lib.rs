pub mod audio;
pub mod config;
pub mod error;
pub mod recording;
pub mod session;
pub mod transport;

pub use audio::{
    AudioFile, AudioFrame, CaptureConfig, CaptureEvent, CaptureFactory, CaptureKind,
    CaptureSource, ClipInfo, DecodeOnlySink, DecodedClip, FileCapture, FrameAssembler,
    MicrophoneCapture, PlaybackSink, SpeakerPlayback,
};
pub use config::Config;
pub use error::{SessionError, SessionErrorKind};
pub use recording::{CallRecorder, RecordingSummary};
pub use session::{
    begin_session, Session, SessionConfig, SessionEvent, SessionState, SessionStats,
    ShutdownHandle, TextHandler,
};
pub use transport::{websocket_url, CallTransport, InboundMessage};
