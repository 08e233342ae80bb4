use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use gateway_core::{EventSink, EventSourceExecutor, ExecutorError, SinkError};
use gateway_sdk::objects::{EventSource, StreamCloseCode, StreamServerMessage};
use tracing::Instrument;
use uuid::Uuid;

use super::ApiError;
use crate::state::AppState;

/// `GET /api/v1/sources/{kind}/stream`: run an event source over a
/// WebSocket.
///
/// The executor is resolved before the upgrade so an unknown `kind` is
/// answered with a plain `404`. After the upgrade the first client frame
/// must carry the [`EventSource`] JSON; every data unit is then sent as
/// one binary frame until either side ends the stream.
pub(super) async fn event_stream(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let executor = match state.registry.get(&kind) {
        Ok(executor) => executor,
        Err(e) => return ApiError::from(e).into_response(),
    };
    ws.on_upgrade(move |socket| handle_stream(socket, executor, kind))
}

/// Drives a single WebSocket connection for the lifetime of one call.
async fn handle_stream(socket: WebSocket, executor: Arc<dyn EventSourceExecutor>, kind: String) {
    let (mut tx, mut rx) = socket.split();

    let source = match read_event_source(&mut rx).await {
        Ok(Some(source)) => source,
        Ok(None) => {
            tracing::debug!(kind = %kind, "Client left before sending an event source");
            return;
        }
        Err(e) => {
            tracing::info!(kind = %kind, error = %e, "Rejected stream request");
            close_with_error(&mut tx, &e).await;
            return;
        }
    };

    let call_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "event_stream",
        %call_id,
        kind = %kind,
        event_source = %source.name,
    );

    async move {
        tracing::info!("Event stream opened");
        let mut sink = WsSink { tx, rx };
        let result = executor.start_event_source(&source, &mut sink).await;
        let WsSink { mut tx, .. } = sink;

        match result {
            Ok(()) => {
                tracing::info!("Event stream finished");
                let _ = tx
                    .send(Message::Close(Some(CloseFrame {
                        code: StreamCloseCode::NORMAL,
                        reason: "".into(),
                    })))
                    .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, category = %e.category(), "Event stream failed");
                close_with_error(&mut tx, &e).await;
            }
        }
    }
    .instrument(span)
    .await
}

/// Wait for the event source frame.
///
/// `Ok(None)` when the client closed the connection first.
async fn read_event_source(
    rx: &mut SplitStream<WebSocket>,
) -> Result<Option<EventSource>, ExecutorError> {
    while let Some(msg) = rx.next().await {
        let parsed = match msg {
            Ok(Message::Text(text)) => serde_json::from_str(text.as_str()),
            Ok(Message::Binary(data)) => serde_json::from_slice(&data),
            Ok(Message::Close(_)) | Err(_) => return Ok(None),
            Ok(_) => continue,
        };
        return parsed
            .map(Some)
            .map_err(|e| ExecutorError::ParseFailed(e.to_string()));
    }
    Ok(None)
}

/// Send the error frame followed by the matching close frame.
///
/// Send failures are ignored; the peer may already be gone.
async fn close_with_error(tx: &mut SplitSink<WebSocket, Message>, error: &ExecutorError) {
    let category = error.category();
    let msg = StreamServerMessage::Error {
        category,
        reason: error.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&msg) {
        let _ = tx.send(Message::Text(json.into())).await;
    }
    let _ = tx
        .send(Message::Close(Some(CloseFrame {
            code: StreamCloseCode::for_category(category),
            reason: category.to_string().into(),
        })))
        .await;
}

/// How long a failed write waits for the read half to confirm the client
/// is gone.
const PEER_CLOSE_WINDOW: Duration = Duration::from_secs(1);

/// Outbound side of a call, backed by the WebSocket halves.
struct WsSink {
    tx: SplitSink<WebSocket, Message>,
    rx: SplitStream<WebSocket>,
}

#[async_trait]
impl EventSink for WsSink {
    /// A failed write is attributed to the client leaving when the read
    /// half reports a close or EOF within [`PEER_CLOSE_WINDOW`].
    async fn send(&mut self, unit: Bytes) -> Result<(), SinkError> {
        let Err(e) = self.tx.send(Message::Binary(unit)).await else {
            return Ok(());
        };
        match tokio::time::timeout(PEER_CLOSE_WINDOW, self.closed()).await {
            Ok(()) => {
                tracing::debug!(error = %e, "Client went away during send");
                Err(SinkError::Closed)
            }
            Err(_) => Err(SinkError::Transport(e.to_string())),
        }
    }

    async fn closed(&mut self) {
        // Frames from the client after the event source carry no meaning.
        while let Some(msg) = self.rx.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                return;
            }
        }
    }
}
