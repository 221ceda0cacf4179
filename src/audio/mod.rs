pub mod backend;
pub mod decoder;
pub mod file;
pub mod framer;
pub mod microphone;
pub mod pcm;
pub mod playback;

pub use backend::{
    AudioFrame, CaptureConfig, CaptureEvent, CaptureFactory, CaptureKind, CaptureSource,
    DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE,
};
pub use decoder::{decode_clip, sniff_extension, ClipInfo, DecodedClip};
pub use file::{AudioFile, FileCapture};
pub use framer::FrameAssembler;
pub use microphone::MicrophoneCapture;
pub use playback::{DecodeOnlySink, PlaybackSink, SpeakerPlayback};
