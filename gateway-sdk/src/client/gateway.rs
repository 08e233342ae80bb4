//! Typed client for the gateway endpoints.

use futures_util::SinkExt;
use reqwest::{Client, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{ClientError, EventStream};
use crate::objects::{EventSource, SourceKinds, ValidationResult};

/// Typed client for the gateway **Eventing API**.
///
/// One client can talk to every source type registered on the server;
/// the type is chosen per call.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a new `GatewayClient`.
    ///
    /// * `base_url` – root URL of the gateway (e.g. `http://gateway:9300`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/sources` – list the source types the server can run.
    pub async fn list_sources(&self) -> Result<Vec<String>, ClientError> {
        let url = self.base_url.join("/api/v1/sources")?;
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        let kinds: SourceKinds = serde_json::from_slice(&resp.bytes().await?)?;
        Ok(kinds.kinds)
    }

    /// `POST /api/v1/sources/{kind}/validate` – validate an event source.
    ///
    /// A malformed payload comes back as `Ok` with `is_valid == false`.
    /// A well-formed payload that breaks the source type's rules comes
    /// back as [`ClientError::InvalidEventSource`].
    pub async fn validate(
        &self,
        kind: &str,
        source: &EventSource,
    ) -> Result<ValidationResult, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/sources/{kind}/validate"))?;

        let resp = self.http.post(url).json(source).send().await?;

        let status = resp.status();
        match status {
            StatusCode::OK => Ok(serde_json::from_slice(&resp.bytes().await?)?),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let result = serde_json::from_slice(&resp.bytes().await?)?;
                Err(ClientError::InvalidEventSource(result))
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ClientError::Api { status, body })
            }
        }
    }

    /// `GET /api/v1/sources/{kind}/stream` – start an event source and
    /// stream its data units.
    ///
    /// Dropping or closing the returned [`EventStream`] stops the listener
    /// on the server.
    pub async fn start(
        &self,
        kind: &str,
        source: &EventSource,
    ) -> Result<EventStream, ClientError> {
        let mut url = self
            .base_url
            .join(&format!("/api/v1/sources/{kind}/stream"))?;
        let ws_scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(ws_scheme)
            .map_err(|_| ClientError::UnsupportedScheme(ws_scheme.to_string()))?;

        let (mut socket, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        socket
            .send(Message::Text(serde_json::to_string(source)?))
            .await?;

        Ok(EventStream::new(socket))
    }
}
