use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audio::{pcm, sniff_extension};

/// What a finished recording left on disk
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    /// Directory holding this session's files
    pub session_dir: PathBuf,
    /// Outbound WAV file
    pub outbound_path: PathBuf,
    /// Samples written to the outbound WAV
    pub outbound_samples: usize,
    /// Inbound payloads saved under `responses/`
    pub responses_saved: usize,
    /// Text notifications appended to `transcript.txt`
    pub transcript_lines: usize,
}

/// Archives one call: transmitted microphone audio, every audio response and
/// every text notification
///
/// Layout:
/// ```text
/// <base>/<session_id>/outbound.wav
/// <base>/<session_id>/transcript.txt
/// <base>/<session_id>/responses/001_response.wav
/// ```
pub struct CallRecorder {
    session_dir: PathBuf,
    outbound_path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    transcript: Option<File>,
    outbound_samples: usize,
    responses_saved: usize,
    transcript_lines: usize,
}

impl CallRecorder {
    pub fn create(base: &Path, session_id: &str, sample_rate: u32) -> Result<Self> {
        let session_dir = base.join(session_id);
        fs::create_dir_all(session_dir.join("responses"))
            .with_context(|| format!("Failed to create recording directory: {:?}", session_dir))?;

        let outbound_path = session_dir.join("outbound.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&outbound_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", outbound_path))?;

        info!("Recording call to {}", session_dir.display());

        Ok(Self {
            session_dir,
            outbound_path,
            writer: Some(writer),
            transcript: None,
            outbound_samples: 0,
            responses_saved: 0,
            transcript_lines: 0,
        })
    }

    /// Append one transmitted frame (16-bit LE PCM bytes)
    pub fn write_outbound(&mut self, encoded: &[u8]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for sample in pcm::to_i16_samples(encoded) {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.outbound_samples += encoded.len() / pcm::BYTES_PER_SAMPLE;
        }
        Ok(())
    }

    /// Save an inbound audio payload verbatim
    pub fn save_response(&mut self, payload: &[u8]) -> Result<PathBuf> {
        let extension = sniff_extension(payload).unwrap_or("bin");
        let path = self.session_dir.join("responses").join(format!(
            "{:03}_response.{}",
            self.responses_saved + 1,
            extension
        ));

        fs::write(&path, payload)
            .with_context(|| format!("Failed to write response: {:?}", path))?;
        self.responses_saved += 1;

        Ok(path)
    }

    /// Append a text notification as `[<rfc3339 time>] <text>`
    ///
    /// The file is created on the first line.
    pub fn write_transcript(&mut self, text: &str) -> Result<()> {
        if self.transcript.is_none() {
            let path = self.session_dir.join("transcript.txt");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open transcript: {:?}", path))?;
            self.transcript = Some(file);
        }

        if let Some(file) = &mut self.transcript {
            writeln!(file, "[{}] {}", chrono::Utc::now().to_rfc3339(), text)
                .context("Failed to write transcript line")?;
            self.transcript_lines += 1;
        }
        Ok(())
    }

    /// Finalize the outbound WAV
    pub fn finish(mut self) -> Result<RecordingSummary> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        info!(
            "Recording complete: {} outbound samples, {} responses, {} transcript lines",
            self.outbound_samples, self.responses_saved, self.transcript_lines
        );

        Ok(RecordingSummary {
            session_dir: self.session_dir.clone(),
            outbound_path: self.outbound_path.clone(),
            outbound_samples: self.outbound_samples,
            responses_saved: self.responses_saved,
            transcript_lines: self.transcript_lines,
        })
    }
}

impl Drop for CallRecorder {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
