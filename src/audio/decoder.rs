//! Inbound audio payload decoding
//!
//! Payloads are self-contained clips (WAV, MP3, FLAC, OGG...). They are decoded in
//! full with symphonia before anything is played.

use std::io::{Cursor, ErrorKind};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::SessionError;

/// A fully decoded clip
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// Interleaved samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn info(&self) -> ClipInfo {
        ClipInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            duration_secs: self.frames() as f64 / self.sample_rate.max(1) as f64,
        }
    }
}

/// Summary of a clip that was decoded (and possibly played)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

/// Guess a container from magic bytes
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some("wav"),
        [b'O', b'g', b'g', b'S', ..] => Some("ogg"),
        [b'f', b'L', b'a', b'C', ..] => Some("flac"),
        [b'I', b'D', b'3', ..] => Some("mp3"),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some("mp3"),
        _ => None,
    }
}

/// Decode a complete payload
pub fn decode_clip(bytes: &[u8]) -> Result<DecodedClip, SessionError> {
    if bytes.is_empty() {
        return Err(SessionError::DecodeFailed("empty payload".to_string()));
    }

    let mut hint = Hint::new();
    if let Some(extension) = sniff_extension(bytes) {
        hint.with_extension(extension);
    }

    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SessionError::DecodeFailed(format!("unrecognised container: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SessionError::DecodeFailed("no audio track".to_string()))?;
    let track_id = track.id;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SessionError::DecodeFailed(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(SessionError::DecodeFailed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
                sample_rate = Some(spec.rate);
                channels = Some(spec.channels.count() as u16);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping corrupt packet: {}", e);
            }
            Err(e) => return Err(SessionError::DecodeFailed(e.to_string())),
        }
    }

    let (sample_rate, channels) = match (sample_rate, channels) {
        (Some(rate), Some(channels)) if rate > 0 && channels > 0 => (rate, channels),
        _ => {
            return Err(SessionError::DecodeFailed(
                "missing sample rate or channel layout".to_string(),
            ))
        }
    };

    if samples.is_empty() {
        return Err(SessionError::DecodeFailed("payload contains no audio".to_string()));
    }

    debug!(
        "Decoded clip: {} samples, {}Hz, {} channels",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedClip {
        samples,
        sample_rate,
        channels,
    })
}
