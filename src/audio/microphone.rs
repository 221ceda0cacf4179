// Microphone capture using cpal
//
// cpal streams are not Send, so the stream is built, played and dropped on a
// dedicated thread. The async side only sees the ready signal and the frame channel.
// Device loss is routed through the thread's control channel so it is never dropped
// when the frame channel is full.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{CaptureConfig, CaptureEvent, CaptureSource, FRAME_CHANNEL_CAPACITY};
use super::framer::FrameAssembler;
use crate::error::SessionError;

/// Messages to a parked capture thread
#[derive(Debug)]
enum ThreadControl {
    Stop,
    DeviceLost(String),
}

/// Default input device capture
pub struct MicrophoneCapture {
    config: CaptureConfig,
    stop_tx: Option<std_mpsc::Sender<ThreadControl>>,
    thread: Option<JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait]
impl CaptureSource for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, SessionError> {
        if self.capturing {
            return Err(SessionError::CaptureUnavailable(
                "microphone capture already running".to_string(),
            ));
        }

        info!(
            "Requesting microphone ({}Hz mono, {} samples/frame)",
            self.config.sample_rate, self.config.frame_length
        );

        let (event_tx, event_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let control_tx = stop_tx.clone();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("loqa-capture".to_string())
            .spawn(move || run_capture_thread(config, event_tx, ready_tx, control_tx, stop_rx))
            .map_err(|e| SessionError::CaptureUnavailable(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(device_name)) => {
                info!("Microphone capture started on {}", device_name);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                self.capturing = true;
                Ok(event_rx)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::CaptureUnavailable(
                "capture thread exited before the device was ready".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(ThreadControl::Stop);
        }

        if let Some(thread) = self.thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => error!("Capture thread panicked"),
                Err(e) => error!("Failed to join capture thread: {}", e),
            }
        }

        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(ThreadControl::Stop);
        }
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    events: mpsc::Sender<CaptureEvent>,
    ready: oneshot::Sender<Result<String, SessionError>>,
    control_tx: std_mpsc::Sender<ThreadControl>,
    control: std_mpsc::Receiver<ThreadControl>,
) {
    let (stream, device_name) = match open_input_stream(&config, events.clone(), control_tx) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(SessionError::CaptureUnavailable(format!(
            "failed to start input stream: {e}"
        ))));
        return;
    }

    if ready.send(Ok(device_name)).is_err() {
        return;
    }

    let lost = park_until_stopped(&control, &events);
    drop(stream);
    if lost {
        info!("Capture thread exiting after device loss");
    }
}

/// Block until stopped; a device loss is delivered on `events` before returning
///
/// Waits for room in the frame channel rather than dropping the loss. Gives up only
/// when the receiver is gone. Returns whether the device was lost.
fn park_until_stopped(
    control: &std_mpsc::Receiver<ThreadControl>,
    events: &mpsc::Sender<CaptureEvent>,
) -> bool {
    match control.recv() {
        Ok(ThreadControl::DeviceLost(reason)) => {
            warn!("Input device lost: {}", reason);
            let _ = events.blocking_send(CaptureEvent::DeviceLost(reason));
            true
        }
        Ok(ThreadControl::Stop) | Err(_) => false,
    }
}

fn open_input_stream(
    config: &CaptureConfig,
    events: mpsc::Sender<CaptureEvent>,
    control: std_mpsc::Sender<ThreadControl>,
) -> Result<(cpal::Stream, String), SessionError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| SessionError::CaptureUnavailable("no input device found".to_string()))?;
    let device_name = device.name().unwrap_or_else(|_| "unknown device".to_string());

    let supported = select_input_config(&device, config.sample_rate)?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.config();

    info!(
        "Input device {}: {}Hz, {} channels, {:?}",
        device_name, stream_config.sample_rate.0, stream_config.channels, sample_format
    );

    let assembler = FrameAssembler::new(stream_config.sample_rate.0, stream_config.channels, config);

    let on_error = move |err: cpal::StreamError| match err {
        cpal::StreamError::DeviceNotAvailable => {
            let _ = control.send(ThreadControl::DeviceLost(
                "input device no longer available".to_string(),
            ));
        }
        other => warn!("Input stream error: {}", other),
    };

    let stream = match sample_format {
        SampleFormat::F32 => {
            build_input::<f32, _>(&device, &stream_config, assembler, events, on_error, |s| s)
        }
        SampleFormat::I16 => build_input::<i16, _>(
            &device,
            &stream_config,
            assembler,
            events,
            on_error,
            |s| s as f32 / 32768.0,
        ),
        SampleFormat::U16 => build_input::<u16, _>(
            &device,
            &stream_config,
            assembler,
            events,
            on_error,
            |s| (s as f32 - 32768.0) / 32768.0,
        ),
        other => {
            return Err(SessionError::CaptureUnavailable(format!(
                "unsupported input sample format {other:?}"
            )))
        }
    }
    .map_err(|e| SessionError::CaptureUnavailable(format!("failed to build input stream: {e}")))?;

    Ok((stream, device_name))
}

/// Prefer a config that runs natively at the target rate, fewest channels, f32 first
fn select_input_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig, SessionError> {
    let target = cpal::SampleRate(sample_rate);

    if let Ok(ranges) = device.supported_input_configs() {
        let mut candidates: Vec<_> = ranges
            .filter(|range| {
                matches!(
                    range.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
            })
            .filter(|range| range.min_sample_rate() <= target && target <= range.max_sample_rate())
            .collect();
        candidates.sort_by_key(|range| (range.channels(), range.sample_format() != SampleFormat::F32));

        if let Some(range) = candidates.into_iter().next() {
            return Ok(range.with_sample_rate(target));
        }
    }

    device
        .default_input_config()
        .map_err(|e| SessionError::CaptureUnavailable(format!("no usable input config: {e}")))
}

fn build_input<T, E>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut assembler: FrameAssembler,
    events: mpsc::Sender<CaptureEvent>,
    on_error: E,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + Send + 'static,
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| convert(s)));

            for frame in assembler.push(&scratch) {
                match events.try_send(CaptureEvent::Frame(frame)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => warn!("Frame channel full, dropping frame"),
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        },
        on_error,
        None,
    )
}
