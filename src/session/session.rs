use futures::future::OptionFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::dispatch::{Dispatched, InboundDispatcher, PlaybackOutcome};
use super::events::{SessionEvent, TextHandler};
use super::state::{Lifecycle, SessionState};
use super::stats::SessionStats;
use crate::audio::{pcm, CaptureEvent, CaptureSource, PlaybackSink};
use crate::error::SessionError;
use crate::recording::CallRecorder;
use crate::transport::{CallTransport, Inbound, InboundMessage};

/// One end-to-end call: microphone out, notifications and audio responses in
///
/// The session owns the transport and is the only thing that sends on it. All
/// work runs on one task: the loop in [`Session::run`] reacts to transport
/// messages, capture events, finished playbacks and shutdown requests in turn.
pub struct Session {
    config: SessionConfig,
    capture: Box<dyn CaptureSource>,
    dispatcher: InboundDispatcher,
    tracker: Tracker,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    events_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

/// Requests a local shutdown of a running session
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

enum Exit {
    PeerClosed,
    Shutdown,
    Failed(SessionError),
}

impl Session {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn CaptureSource>,
        sink: Arc<dyn PlaybackSink>,
        handler: impl TextHandler + 'static,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tracker = Tracker::new(config.session_id.clone(), events_tx);

        info!(
            "Created call session {} ({} -> {})",
            config.session_id,
            capture.name(),
            config.url
        );

        Self {
            config,
            capture,
            dispatcher: InboundDispatcher::new(Box::new(handler), sink),
            tracker,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            events_rx: Some(events_rx),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    pub fn state(&self) -> SessionState {
        self.tracker.state()
    }

    /// Take the event stream; only the first call returns it
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events_rx.take()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Connect, stream and receive until the transport closes
    ///
    /// Fatal errors (`HandshakeFailed`, `CaptureUnavailable`, `DeviceLost`,
    /// `Transport`) are returned; per-message decode or playback failures are not.
    pub async fn run(mut self) -> Result<SessionStats, SessionError> {
        self.release_unobserved_events();
        let result = self.drive().await;

        let Tracker {
            lifecycle,
            mut stats,
            ..
        } = self.tracker;
        stats.finish(lifecycle.history());

        match result {
            Ok(()) => {
                info!(
                    "Call session {} finished: {} frames sent, {} dropped, {} text, {} audio",
                    stats.session_id,
                    stats.frames_sent,
                    stats.frames_dropped,
                    stats.text_messages,
                    stats.audio_payloads
                );
                Ok(stats)
            }
            Err(e) => {
                error!("Call session {} failed: {}", stats.session_id, e);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        // TODO: bound the handshake and microphone acquisition with a timeout once a value is agreed
        let connected = tokio::select! {
            connected = CallTransport::connect(&self.config.url) => connected,
            _ = self.shutdown_rx.changed() => {
                info!("Local shutdown requested during handshake");
                self.tracker.enter(SessionState::Closed);
                return Ok(());
            }
        };
        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                self.tracker.fail(&e);
                self.tracker.enter(SessionState::Closed);
                return Err(e);
            }
        };
        self.tracker.enter(SessionState::Open);

        let mut recorder = self.open_recorder();

        let config = &self.config;
        let capture = &mut self.capture;
        let dispatcher = &mut self.dispatcher;
        let tracker = &mut self.tracker;
        let shutdown = &mut self.shutdown_rx;

        info!("Acquiring {}", capture.name());

        // Started exactly once; the capture source itself rejects a second start
        let mut starting = Some(capture.start());
        let mut frames: Option<mpsc::Receiver<CaptureEvent>> = None;
        let mut deferred: Option<SessionError> = None;

        let exit = loop {
            tokio::select! {
                _ = shutdown.changed() => break Exit::Shutdown,

                Some(started) = OptionFuture::from(starting.as_mut()), if starting.is_some() => {
                    starting = None;
                    match started {
                        Ok(rx) => {
                            frames = Some(rx);
                            tracker.enter(SessionState::Streaming);
                        }
                        Err(e) => {
                            tracker.fail(&e);
                            if !config.keep_open_without_capture {
                                break Exit::Failed(e);
                            }
                            warn!("Continuing without capture (inbound only)");
                            deferred = Some(e);
                        }
                    }
                }

                event = next_capture_event(&mut frames), if frames.is_some() => match event {
                    Some(CaptureEvent::Frame(frame)) => {
                        let encoded = pcm::encode_frame(&frame.samples);

                        // Guard only: the loop exits as soon as either condition changes
                        if tracker.state() != SessionState::Streaming || !transport.is_open() {
                            tracker.frame_dropped(frame.sequence);
                            continue;
                        }

                        let bytes = encoded.len();
                        if let Some(recorder) = recorder.as_mut() {
                            if let Err(e) = recorder.write_outbound(&encoded) {
                                warn!("Failed to record outbound frame: {:#}", e);
                            }
                        }
                        if let Err(e) = transport.send_frame(encoded).await {
                            tracker.fail(&e);
                            break Exit::Failed(e);
                        }
                        tracker.frame_sent(frame.sequence, bytes);
                    }
                    Some(CaptureEvent::DeviceLost(reason)) => {
                        let e = SessionError::DeviceLost(reason);
                        tracker.fail(&e);
                        break Exit::Failed(e);
                    }
                    None => {
                        info!("Capture stream ended");
                        frames = None;
                    }
                },

                inbound = transport.next_inbound() => match inbound {
                    Some(Ok(Inbound::Message(message))) => {
                        if let Some(recorder) = recorder.as_mut() {
                            let archived = match &message {
                                InboundMessage::Audio(payload) => recorder.save_response(payload).map(|_| ()),
                                InboundMessage::Text(text) => recorder.write_transcript(text),
                            };
                            if let Err(e) = archived {
                                warn!("Failed to archive {} message: {:#}", message.kind(), e);
                            }
                        }
                        match dispatcher.dispatch(message) {
                            Dispatched::Text { len } => tracker.text_received(len),
                            Dispatched::Audio { index, bytes } => tracker.audio_received(index, bytes),
                        }
                    }
                    Some(Ok(Inbound::Closed { code, reason })) => {
                        info!("Peer closed the connection (code {:?}) {}", code, reason);
                        break Exit::PeerClosed;
                    }
                    Some(Ok(Inbound::Control)) => {}
                    Some(Err(e)) => {
                        tracker.fail(&e);
                        break Exit::Failed(e);
                    }
                    None => {
                        info!("Connection ended");
                        break Exit::PeerClosed;
                    }
                },

                Some(outcome) = dispatcher.next_finished(), if dispatcher.in_flight() > 0 => {
                    tracker.playback_done(outcome);
                }
            }
        };

        // Frames captured but never handed to the transport
        if let Some(rx) = frames.as_mut() {
            while let Ok(CaptureEvent::Frame(frame)) = rx.try_recv() {
                tracker.frame_dropped(frame.sequence);
            }
        }

        drop(starting);
        drop(frames);
        if capture.is_capturing() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop {}: {}", capture.name(), e);
            }
        }

        let result = match exit {
            Exit::PeerClosed => {
                let _ = transport.close().await;
                tracker.enter(SessionState::Closed);
                // Responses that already arrived are allowed to finish
                while let Some(outcome) = dispatcher.next_finished().await {
                    tracker.playback_done(outcome);
                }
                deferred.map_or(Ok(()), Err)
            }
            Exit::Shutdown => {
                info!("Local shutdown requested");
                dispatcher.halt();
                if let Err(e) = transport.close().await {
                    warn!("Failed to close connection cleanly: {}", e);
                }
                tracker.enter(SessionState::Closed);
                deferred.map_or(Ok(()), Err)
            }
            Exit::Failed(e) => {
                dispatcher.halt();
                if let Err(close_err) = transport.close().await {
                    debug!("Close after failure: {}", close_err);
                }
                tracker.enter(SessionState::Closed);
                Err(e)
            }
        };

        if let Some(recorder) = recorder {
            if let Err(e) = recorder.finish() {
                warn!("Failed to finish call recording: {:#}", e);
            }
        }

        result
    }

    /// Nobody took the event stream, so stop queueing events for it
    fn release_unobserved_events(&mut self) {
        if self.events_rx.take().is_some() {
            debug!("Session {} has no event observer", self.config.session_id);
        }
    }

    fn open_recorder(&self) -> Option<CallRecorder> {
        let base = self.config.recordings_path.as_ref()?;
        match CallRecorder::create(base, &self.config.session_id, self.config.sample_rate) {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                warn!("Call recording disabled: {:#}", e);
                None
            }
        }
    }
}

async fn next_capture_event(
    frames: &mut Option<mpsc::Receiver<CaptureEvent>>,
) -> Option<CaptureEvent> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Lifecycle, statistics and event publishing for one session
struct Tracker {
    session_id: String,
    lifecycle: Lifecycle,
    stats: SessionStats,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Tracker {
    fn new(session_id: String, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let lifecycle = Lifecycle::new();
        let tracker = Self {
            stats: SessionStats::new(session_id.clone()),
            session_id,
            lifecycle,
            events,
        };
        tracker.emit(SessionEvent::StateChanged(tracker.lifecycle.current()));
        tracker
    }

    fn state(&self) -> SessionState {
        self.lifecycle.current()
    }

    fn enter(&mut self, next: SessionState) {
        match self.lifecycle.advance(next) {
            Ok(previous) => {
                info!("Session {}: {} -> {}", self.session_id, previous, next);
                self.emit(SessionEvent::StateChanged(next));
            }
            Err(e) => warn!("Session {}: {}", self.session_id, e),
        }
    }

    fn fail(&mut self, err: &SessionError) {
        error!("Session {}: {}", self.session_id, err);
        self.enter(SessionState::Error(err.kind()));
    }

    fn frame_sent(&mut self, sequence: u64, bytes: usize) {
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += bytes as u64;
        self.emit(SessionEvent::FrameSent { sequence, bytes });
    }

    fn frame_dropped(&mut self, sequence: u64) {
        debug!("Dropping frame {} (transport not sendable)", sequence);
        self.stats.frames_dropped += 1;
        self.emit(SessionEvent::FrameDropped { sequence });
    }

    fn text_received(&mut self, len: usize) {
        self.stats.text_messages += 1;
        self.emit(SessionEvent::TextReceived { len });
    }

    fn audio_received(&mut self, index: u64, bytes: usize) {
        self.stats.audio_payloads += 1;
        self.emit(SessionEvent::AudioReceived { index, bytes });
    }

    fn playback_done(&mut self, outcome: PlaybackOutcome) {
        match outcome.result {
            Ok(clip) => {
                info!(
                    "Audio payload #{} played ({:.2}s)",
                    outcome.index, clip.duration_secs
                );
                self.stats.playbacks_completed += 1;
                self.emit(SessionEvent::PlaybackFinished {
                    index: outcome.index,
                    clip,
                });
            }
            Err(e) => {
                warn!("Audio payload #{} skipped: {}", outcome.index, e);
                self.stats.playback_failures += 1;
                self.emit(SessionEvent::PlaybackFailed {
                    index: outcome.index,
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Create a session and run it to completion
pub async fn begin_session(
    config: SessionConfig,
    capture: Box<dyn CaptureSource>,
    sink: Arc<dyn PlaybackSink>,
    handler: impl TextHandler + 'static,
) -> Result<SessionStats, SessionError> {
    Session::new(config, capture, sink, handler).run().await
}
