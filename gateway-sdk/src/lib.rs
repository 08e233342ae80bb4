//! Shared wire types for the event source gateway.
//!
//! The server and every downstream consumer speak in terms of the objects
//! defined here. Enable the `client` feature for a typed HTTP/WebSocket
//! client.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
