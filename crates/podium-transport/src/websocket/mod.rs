//! WebSocket bridge client.

mod client;

pub use client::{WsClientConfig, WsTransport};
