//! Transport boundary.
//!
//! The controller talks to the game server through two channels:
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | controller → server | [`Transport::call`]: method name plus positional arguments, answered by a single value or an [`RpcError`](crate::RpcError) |
//! | server → controller | a [`NotificationStream`] of `(name, args)` pairs in server-emission order |
//!
//! Implementations live in `podium-transport` (WebSocket bridge) and in
//! [`loopback`] (an in-process transport used by tests and dry runs).

pub mod loopback;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::RpcResult;

pub use loopback::{LoopbackTransport, RecordedCall};

/// A server-pushed notification before translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification name, e.g. `ManiaPlanet.PlayerConnect`.
    pub name: String,
    /// Positional payload.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Notification {
    /// Creates a notification.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Request/response channel to the game server.
///
/// Notifications are not part of this trait: a transport hands out its
/// [`NotificationStream`] once, when it is created.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a remote procedure call and waits for its result.
    async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value>;

    /// Closes the underlying connection.
    ///
    /// The default implementation is a no-op.
    async fn close(&self) {}
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

/// Receiving half of the notification subscription.
pub type NotificationStream = mpsc::Receiver<Notification>;
