//! Call session management
//!
//! This module provides the `Session` abstraction that manages:
//! - The duplex transport and its lifecycle (CONNECTING -> OPEN -> STREAMING -> CLOSED)
//! - Microphone capture, PCM encoding and frame transmission
//! - Dispatch of inbound text notifications and audio responses
//! - Session statistics and observable events

mod config;
mod dispatch;
mod events;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use dispatch::{Dispatched, InboundDispatcher, PlaybackOutcome};
pub use events::{SessionEvent, TextHandler};
pub use session::{begin_session, Session, ShutdownHandle};
pub use state::{InvalidTransition, Lifecycle, SessionState};
pub use stats::SessionStats;
