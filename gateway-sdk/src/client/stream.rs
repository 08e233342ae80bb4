use bytes::Bytes;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::ClientError;
use crate::objects::StreamServerMessage;

/// A running event source on the gateway.
///
/// Yields data units in production order until the server closes the
/// stream. A server-side failure is yielded once as
/// [`ClientError::Stream`], after which the stream ends.
pub struct EventStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventStream {
    pub(super) fn new(socket: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { socket }
    }

    /// Receive the next data unit.
    ///
    /// Returns `None` once the server has closed the stream.
    pub async fn next(&mut self) -> Option<Result<Bytes, ClientError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Text(text)) => {
                    return match serde_json::from_str::<StreamServerMessage>(&text) {
                        Ok(StreamServerMessage::Error { category, reason }) => {
                            Some(Err(ClientError::Stream { category, reason }))
                        }
                        Err(e) => Some(Err(ClientError::Json(e))),
                    };
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(ClientError::WebSocket(e))),
            }
        }
    }

    /// Close the stream, which stops the listener on the server.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
