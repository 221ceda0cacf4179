//! Duplex transport to the call server
//!
//! Outbound: one binary message per encoded frame, no header.
//! Inbound: text notifications and binary audio clips.

pub mod client;
pub mod endpoint;
pub mod messages;

pub use client::CallTransport;
pub use endpoint::{websocket_url, DEFAULT_PATH};
pub use messages::{Inbound, InboundMessage};
