use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{CaptureConfig, CaptureEvent, CaptureSource, FRAME_CHANNEL_CAPACITY};
use super::framer::FrameAssembler;
use crate::error::SessionError;

/// Device-sized block fed to the assembler per iteration
const FILE_BLOCK_FRAMES: usize = 1024;

/// A WAV file loaded into interleaved f32 samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            (SampleFormat::Int, bits) if (8..=32).contains(&bits) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
            (format, bits) => bail!("Unsupported WAV encoding: {:?} {}-bit", format, bits),
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Capture source that replays a WAV file
pub struct FileCapture {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            realtime: false,
            task: None,
            capturing: false,
        }
    }

    /// Pace frames at the rate a live device would deliver them
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, SessionError> {
        if self.capturing {
            return Err(SessionError::CaptureUnavailable(
                "file capture already running".to_string(),
            ));
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| SessionError::CaptureUnavailable(e.to_string()))?
            .map_err(|e| SessionError::CaptureUnavailable(format!("{e:#}")))?;

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let config = self.config.clone();
        let pace = self
            .realtime
            .then(|| Duration::from_millis(config.frame_duration_ms().max(1)));

        let task = tokio::spawn(async move {
            let mut assembler = FrameAssembler::new(audio.sample_rate, audio.channels, &config);
            let block = FILE_BLOCK_FRAMES * audio.channels.max(1) as usize;
            let mut ticker = pace.map(tokio::time::interval);

            for chunk in audio.samples.chunks(block) {
                for frame in assembler.push(chunk) {
                    if let Some(ticker) = ticker.as_mut() {
                        ticker.tick().await;
                    }
                    if tx.send(CaptureEvent::Frame(frame)).await.is_err() {
                        return;
                    }
                }
            }

            debug!(
                "File capture finished ({} trailing samples discarded)",
                assembler.pending_len()
            );
        });

        info!("File capture started: {}", self.path.display());

        self.task = Some(task);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.capturing = false;

        info!("File capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
