use tokio_tungstenite::tungstenite::Message;

/// Message received from the call server, keyed by transport-level type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Text frame, passed through verbatim
    Text(String),
    /// Binary frame holding a complete encoded audio clip
    Audio(Vec<u8>),
}

/// What a raw websocket message means to the session
#[derive(Debug)]
pub enum Inbound {
    Message(InboundMessage),
    /// Peer sent a close frame
    Closed { code: Option<u16>, reason: String },
    /// Ping/pong and raw frames, handled by the websocket layer
    Control,
}

impl From<Message> for Inbound {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Inbound::Message(InboundMessage::Text(text)),
            Message::Binary(bytes) => Inbound::Message(InboundMessage::Audio(bytes)),
            Message::Close(frame) => match frame {
                Some(frame) => Inbound::Closed {
                    code: Some(u16::from(frame.code)),
                    reason: frame.reason.into_owned(),
                },
                None => Inbound::Closed {
                    code: None,
                    reason: String::new(),
                },
            },
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Control,
        }
    }
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Text(_) => "text",
            InboundMessage::Audio(_) => "audio",
        }
    }
}
