use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::events::TextHandler;
use crate::audio::{ClipInfo, PlaybackSink};
use crate::error::SessionError;
use crate::transport::InboundMessage;

/// Result of one fire-and-forget playback
#[derive(Debug)]
pub struct PlaybackOutcome {
    pub index: u64,
    pub result: Result<ClipInfo, SessionError>,
}

/// How an inbound message was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Text { len: usize },
    Audio { index: u64, bytes: usize },
}

/// Routes inbound messages by payload kind
///
/// Text goes straight to the handler. Audio is handed to the playback sink on its
/// own task; the dispatcher never waits for it, so clips may overlap. A failed
/// decode only surfaces as that task's outcome.
pub struct InboundDispatcher {
    handler: Box<dyn TextHandler>,
    sink: Arc<dyn PlaybackSink>,
    playbacks: JoinSet<PlaybackOutcome>,
    next_index: u64,
}

impl InboundDispatcher {
    pub fn new(handler: Box<dyn TextHandler>, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            handler,
            sink,
            playbacks: JoinSet::new(),
            next_index: 0,
        }
    }

    pub fn dispatch(&mut self, message: InboundMessage) -> Dispatched {
        match message {
            InboundMessage::Text(text) => {
                debug!("Text notification ({} bytes)", text.len());
                self.handler.on_text(&text);
                Dispatched::Text { len: text.len() }
            }
            InboundMessage::Audio(payload) => {
                self.next_index += 1;
                let index = self.next_index;
                let bytes = payload.len();
                let sink = Arc::clone(&self.sink);

                info!(
                    "Audio payload #{} ({} bytes) -> {}",
                    index,
                    bytes,
                    sink.name()
                );

                self.playbacks.spawn(async move {
                    let result = AssertUnwindSafe(sink.play(payload))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Err(SessionError::Playback("playback task panicked".to_string()))
                        });
                    PlaybackOutcome { index, result }
                });

                Dispatched::Audio { index, bytes }
            }
        }
    }

    /// Playbacks still decoding or playing
    pub fn in_flight(&self) -> usize {
        self.playbacks.len()
    }

    /// Next playback to finish; `None` when nothing is in flight
    pub async fn next_finished(&mut self) -> Option<PlaybackOutcome> {
        loop {
            match self.playbacks.join_next().await? {
                Ok(outcome) => return Some(outcome),
                Err(e) if e.is_cancelled() => continue,
                Err(e) => warn!("Playback task failed: {}", e),
            }
        }
    }

    /// Silence every clip that is still playing
    pub fn halt(&mut self) {
        if !self.playbacks.is_empty() {
            info!("Stopping {} in-flight playback(s)", self.playbacks.len());
        }
        self.playbacks.abort_all();
    }
}
