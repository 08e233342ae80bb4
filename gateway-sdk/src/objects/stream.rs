//! WebSocket message types for the event stream.
//!
//! The `GET /api/v1/sources/{kind}/stream` endpoint upgrades to a
//! WebSocket connection and runs one event source for the lifetime of
//! the connection.
//!
//! # Protocol
//!
//! 1. The client sends one text frame holding the
//!    [`EventSource`](super::EventSource) as JSON.
//! 2. The server sends one binary frame per data unit, verbatim and in
//!    the order the listener produced them.
//! 3. If the call fails, the server sends a single
//!    [`StreamServerMessage::Error`] text frame and then a close frame
//!    carrying one of the [`StreamCloseCode`] values.
//! 4. Closing the connection from the client side stops the listener.

use serde::{Deserialize, Serialize};

use super::ErrorCategory;

/// Server-to-client control message.
///
/// ```json
/// {"type":"error","category":"connection","reason":"connection refused"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamServerMessage {
    /// Terminal failure of the call. No data frame follows it.
    Error {
        category: ErrorCategory,
        reason: String,
    },
}

/// Close codes used by the event stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct StreamCloseCode;

impl StreamCloseCode {
    pub const NORMAL: u16 = 1000;

    pub const INTERNAL_ERROR: u16 = 1011;

    /// The event source payload was malformed, empty or rule-violating.
    pub const INVALID_SOURCE: u16 = 4000;

    /// No executor is registered for the requested source type.
    pub const UNKNOWN_SOURCE_TYPE: u16 = 4004;

    /// The listener lost (or never established) its external connection.
    pub const CONNECTION_FAILED: u16 = 4010;

    /// The listener faulted and was stopped.
    pub const LISTENER_FAULT: u16 = 4011;

    pub fn for_category(category: ErrorCategory) -> u16 {
        match category {
            ErrorCategory::EmptySource
            | ErrorCategory::ParseFailure
            | ErrorCategory::InvalidSource => Self::INVALID_SOURCE,
            ErrorCategory::UnknownSourceType => Self::UNKNOWN_SOURCE_TYPE,
            ErrorCategory::Connection => Self::CONNECTION_FAILED,
            ErrorCategory::ListenerFault => Self::LISTENER_FAULT,
            ErrorCategory::Stream => Self::INTERNAL_ERROR,
        }
    }
}
