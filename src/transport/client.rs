use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::messages::Inbound;
use crate::error::SessionError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Duplex websocket connection to the call server
///
/// Owned by exactly one session; nothing else sends on it.
pub struct CallTransport {
    url: String,
    stream: WsStream,
    open: bool,
}

impl CallTransport {
    /// Open the connection and complete the websocket handshake
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        info!("Connecting to {}", url);

        let (stream, response) =
            connect_async(url)
                .await
                .map_err(|e| SessionError::HandshakeFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        info!("Connected to {} (HTTP {})", url, response.status());

        Ok(Self {
            url: url.to_string(),
            stream,
            open: true,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether outbound messages can still be sent
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Send one encoded frame as a binary message
    pub async fn send_frame(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        if let Err(e) = self.stream.send(Message::Binary(bytes)).await {
            self.open = false;
            return Err(e.into());
        }
        Ok(())
    }

    /// Wait for the next inbound message; `None` once the stream has ended
    pub async fn next_inbound(&mut self) -> Option<Result<Inbound, SessionError>> {
        let next = self.stream.next().await;
        match &next {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => self.open = false,
            Some(Ok(_)) => {}
        }
        next.map(|result| result.map(Inbound::from).map_err(SessionError::from))
    }

    /// Send a close frame (if still open) and flush
    pub async fn close(&mut self) -> Result<(), SessionError> {
        let was_open = self.open;
        self.open = false;

        match self.stream.close(None).await {
            Ok(()) => {
                if was_open {
                    info!("Closed connection to {}", self.url);
                }
                Ok(())
            }
            Err(e) if !was_open => {
                debug!("Close after peer shutdown: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
