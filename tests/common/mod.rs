// Shared fixtures for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use loqa_call::{AudioFrame, CaptureEvent, CaptureSource, SessionError, SessionEvent};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Encode samples (interleaved when `channels > 1`) as an in-memory 16-bit WAV
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for &sample in samples {
            writer.write_sample((sample * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// Write a 16-bit WAV file to disk
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    std::fs::write(path, wav_bytes(samples, sample_rate, channels)).unwrap();
}

/// A short tone clip suitable as an audio response
pub fn tone_clip(sample_rate: u32, frames: usize) -> Vec<u8> {
    let samples: Vec<f32> = (0..frames)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / sample_rate as f32).sin() * 0.5)
        .collect();
    wav_bytes(&samples, sample_rate, 1)
}

/// What the peer does once a client connects
#[derive(Debug, Clone)]
pub enum PeerAction {
    SendText(String),
    SendBinary(Vec<u8>),
    /// Read this many binary messages before continuing
    ExpectBinary(usize),
    Close,
}

/// Everything the peer observed from the client
#[derive(Debug, Default)]
pub struct PeerLog {
    pub binary: Vec<Vec<u8>>,
    pub text: Vec<String>,
    pub saw_close: bool,
}

/// Start a one-connection websocket peer; returns its URL and a handle to its log
pub async fn spawn_peer(script: Vec<PeerAction>) -> (String, tokio::task::JoinHandle<PeerLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let mut log = PeerLog::default();

        for action in script {
            match action {
                PeerAction::SendText(text) => {
                    if ws.send(Message::Text(text)).await.is_err() {
                        return log;
                    }
                }
                PeerAction::SendBinary(bytes) => {
                    if ws.send(Message::Binary(bytes)).await.is_err() {
                        return log;
                    }
                }
                PeerAction::ExpectBinary(count) => {
                    while log.binary.len() < count {
                        match ws.next().await {
                            Some(Ok(Message::Binary(bytes))) => log.binary.push(bytes),
                            Some(Ok(Message::Text(text))) => log.text.push(text),
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                                log.saw_close = true;
                                return log;
                            }
                            Some(Ok(_)) => {}
                        }
                    }
                }
                PeerAction::Close => {
                    let _ = ws.close(None).await;
                }
            }
        }

        // Drain until the client goes away
        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Binary(bytes)) => log.binary.push(bytes),
                Ok(Message::Text(text)) => log.text.push(text),
                Ok(Message::Close(_)) => log.saw_close = true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        log
    });

    (format!("ws://{}/ws", addr), handle)
}

/// Capture source driven by the test
pub struct ScriptedCapture {
    denied: bool,
    frames: Vec<Vec<f32>>,
    lose_device: bool,
    capturing: bool,
    live: Option<mpsc::Sender<CaptureEvent>>,
}

impl ScriptedCapture {
    /// Microphone permission denied
    pub fn denied() -> Self {
        Self {
            denied: true,
            frames: Vec::new(),
            lose_device: false,
            capturing: false,
            live: None,
        }
    }

    /// Yields these frames, then stays open like a live device
    pub fn frames(frames: Vec<Vec<f32>>) -> Self {
        Self {
            denied: false,
            frames,
            lose_device: false,
            capturing: false,
            live: None,
        }
    }

    /// Yields these frames, then reports the device lost
    pub fn frames_then_lost(frames: Vec<Vec<f32>>) -> Self {
        Self {
            lose_device: true,
            ..Self::frames(frames)
        }
    }
}

#[async_trait]
impl CaptureSource for ScriptedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, SessionError> {
        if self.denied {
            return Err(SessionError::CaptureUnavailable(
                "permission denied".to_string(),
            ));
        }
        if self.capturing {
            return Err(SessionError::CaptureUnavailable(
                "already capturing".to_string(),
            ));
        }
        self.capturing = true;

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for (sequence, samples) in self.frames.drain(..).enumerate() {
            let frame = AudioFrame {
                sample_rate: 16000,
                sequence: sequence as u64,
                timestamp_ms: sequence as u64 * 256,
                samples,
            };
            tx.try_send(CaptureEvent::Frame(frame)).unwrap();
        }

        if self.lose_device {
            tx.try_send(CaptureEvent::DeviceLost("unplugged".to_string()))
                .unwrap();
        } else {
            self.live = Some(tx);
        }

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        self.capturing = false;
        self.live = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Collect every event published so far (the session must have finished)
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
