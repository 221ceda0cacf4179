//! Audio response playback
//!
//! Each payload is decoded completely, then played on its own output stream. Two
//! payloads may play at the same time; nothing mixes or ducks them.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::decoder::{decode_clip, ClipInfo, DecodedClip};
use crate::error::SessionError;

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Decode-and-play capability for inbound audio payloads
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Decode `payload` in full, then play it to completion
    ///
    /// Dropping the returned future stops playback.
    async fn play(&self, payload: Vec<u8>) -> Result<ClipInfo, SessionError>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Decode on the blocking pool so large clips don't stall the session loop
pub async fn decode_payload(payload: Vec<u8>) -> Result<DecodedClip, SessionError> {
    tokio::task::spawn_blocking(move || decode_clip(&payload))
        .await
        .map_err(|e| SessionError::DecodeFailed(format!("decoder task failed: {e}")))?
}

/// Plays clips on the default output device
#[derive(Debug, Default)]
pub struct SpeakerPlayback;

impl SpeakerPlayback {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlaybackSink for SpeakerPlayback {
    async fn play(&self, payload: Vec<u8>) -> Result<ClipInfo, SessionError> {
        let clip = decode_payload(payload).await?;
        let info = clip.info();

        let (done_tx, done_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopOnDrop(Arc::clone(&stop));

        std::thread::Builder::new()
            .name("loqa-playback".to_string())
            .spawn(move || {
                let _ = done_tx.send(play_clip(clip, stop));
            })
            .map_err(|e| SessionError::Playback(format!("failed to spawn playback thread: {e}")))?;

        match done_rx.await {
            Ok(result) => result.map(|()| info),
            Err(_) => Err(SessionError::Playback(
                "playback thread exited unexpectedly".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "cpal speaker"
    }
}

/// Decodes payloads without touching an output device
#[derive(Debug, Default)]
pub struct DecodeOnlySink;

#[async_trait]
impl PlaybackSink for DecodeOnlySink {
    async fn play(&self, payload: Vec<u8>) -> Result<ClipInfo, SessionError> {
        let clip = decode_payload(payload).await?;
        Ok(clip.info())
    }

    fn name(&self) -> &str {
        "decode only"
    }
}

struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn play_clip(clip: DecodedClip, stop: Arc<AtomicBool>) -> Result<(), SessionError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SessionError::Playback("no output device found".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| SessionError::Playback(format!("no usable output config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.config();

    let rendered = Arc::new(render_for_output(&clip, config.sample_rate.0, config.channels));
    let cursor = Arc::new(AtomicUsize::new(0));

    info!(
        "Playing {:.2}s clip on {} ({}Hz, {} channels)",
        clip.info().duration_secs,
        device.name().unwrap_or_else(|_| "unknown device".to_string()),
        config.sample_rate.0,
        config.channels
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_output::<f32>(&device, &config, &rendered, &cursor),
        SampleFormat::I16 => build_output::<i16>(&device, &config, &rendered, &cursor),
        SampleFormat::U16 => build_output::<u16>(&device, &config, &rendered, &cursor),
        other => {
            return Err(SessionError::Playback(format!(
                "unsupported output sample format {other:?}"
            )))
        }
    }
    .map_err(|e| SessionError::Playback(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| SessionError::Playback(format!("failed to start output stream: {e}")))?;

    while cursor.load(Ordering::Relaxed) < rendered.len() && !stop.load(Ordering::SeqCst) {
        std::thread::sleep(DRAIN_POLL);
    }
    // Let the device flush its last buffer
    if !stop.load(Ordering::SeqCst) {
        std::thread::sleep(DRAIN_POLL * 2);
    }

    drop(stream);
    debug!("Playback finished");

    Ok(())
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rendered: &Arc<Vec<f32>>,
    cursor: &Arc<AtomicUsize>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let rendered = Arc::clone(rendered);
    let cursor = Arc::clone(cursor);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let start = cursor.load(Ordering::Relaxed);
            for (i, out) in data.iter_mut().enumerate() {
                let sample = rendered.get(start + i).copied().unwrap_or(0.0);
                *out = T::from_sample(sample);
            }
            cursor.store(start + data.len(), Ordering::Relaxed);
        },
        |err| tracing::warn!("Output stream error: {}", err),
        None,
    )
}

/// Convert a clip to the device's rate and channel count
///
/// Channels are mapped round-robin from the source (mono fans out to every output
/// channel); rates are converted by linear interpolation.
pub fn render_for_output(clip: &DecodedClip, output_rate: u32, output_channels: u16) -> Vec<f32> {
    let source_channels = clip.channels.max(1) as usize;
    let output_channels = output_channels.max(1) as usize;
    let source_frames = clip.frames();
    if source_frames == 0 {
        return Vec::new();
    }

    let ratio = clip.sample_rate as f64 / output_rate.max(1) as f64;
    let output_frames = ((source_frames as f64) / ratio).floor() as usize;
    let mut rendered = Vec::with_capacity(output_frames * output_channels);

    for frame in 0..output_frames {
        let position = frame as f64 * ratio;
        let index = (position.floor() as usize).min(source_frames - 1);
        let next = (index + 1).min(source_frames - 1);
        let t = (position - index as f64) as f32;

        for channel in 0..output_channels {
            let source_channel = channel % source_channels;
            let a = clip.samples[index * source_channels + source_channel];
            let b = clip.samples[next * source_channels + source_channel];
            rendered.push(a + (b - a) * t);
        }
    }

    rendered
}
