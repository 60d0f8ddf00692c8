//! # Podium Transport
//!
//! Network transports for the Podium controller.
//!
//! The dedicated server speaks GBXRemote XML-RPC; Podium reaches it through a
//! bridge that relays that interface as JSON over a WebSocket (see
//! [`codec`] for the frame shapes). [`WsTransport`] implements
//! [`podium_core::Transport`] on top of it.
//!
//! ## Features
//!
//! - `ws-client` (default): the WebSocket bridge client
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use podium_transport::{WsClientConfig, WsTransport};
//!
//! let (transport, notifications) =
//!     WsTransport::connect(WsClientConfig::new("ws://127.0.0.1:5001")).await?;
//! let version = transport.call("GetVersion", vec![]).await?;
//! ```

pub mod codec;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "ws-client")]
pub use websocket::{WsClientConfig, WsTransport};
