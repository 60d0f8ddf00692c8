//! In-process transport.
//!
//! [`LoopbackTransport`] answers calls from a table of scripted responses,
//! records every call it receives, and lets the owner inject notifications.
//! The demo binary uses it for `--dry-run`; the framework tests drive the
//! dispatcher with it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use super::{Notification, NotificationStream, Transport};
use crate::error::{RpcError, RpcResult};

const CHANNEL_CAPACITY: usize = 256;

type Responder = Arc<dyn Fn(&[Value]) -> RpcResult<Value> + Send + Sync>;

/// A call observed by the loopback transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Scripted, recording transport.
///
/// Methods without a scripted response answer `true`, which is what the
/// server returns for most setters.
pub struct LoopbackTransport {
    responders: Mutex<HashMap<String, Responder>>,
    calls: Mutex<Vec<RecordedCall>>,
    notification_tx: mpsc::Sender<Notification>,
}

impl LoopbackTransport {
    /// Creates a transport and the notification stream it feeds.
    pub fn new() -> (Arc<Self>, NotificationStream) {
        let (notification_tx, notification_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let transport = Arc::new(Self {
            responders: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            notification_tx,
        });
        (transport, notification_rx)
    }

    /// Answers every call to `method` with `value`.
    pub fn respond(&self, method: impl Into<String>, value: Value) -> &Self {
        self.respond_with(method, move |_| Ok(value.clone()))
    }

    /// Answers calls to `method` by running `f` over the call arguments.
    pub fn respond_with<F>(&self, method: impl Into<String>, f: F) -> &Self
    where
        F: Fn(&[Value]) -> RpcResult<Value> + Send + Sync + 'static,
    {
        self.responders.lock().insert(method.into(), Arc::new(f));
        self
    }

    /// Makes every call to `method` fail with a server fault.
    pub fn fail(&self, method: impl Into<String>, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.respond_with(method, move |_| {
            Err(RpcError::Fault {
                code: -1000,
                message: message.clone(),
            })
        })
    }

    /// Returns every call received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the argument lists of every call to `method`.
    pub fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .map(|c| c.params.clone())
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Pushes a notification onto the stream.
    ///
    /// Returns `false` when the stream has been dropped.
    pub async fn notify(&self, name: impl Into<String>, args: Vec<Value>) -> bool {
        self.notification_tx
            .send(Notification::new(name, args))
            .await
            .is_ok()
    }

    /// Returns a sender for injecting notifications from elsewhere.
    pub fn sender(&self) -> mpsc::Sender<Notification> {
        self.notification_tx.clone()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        trace!(method, "loopback call");
        let responder = self.responders.lock().get(method).cloned();
        let result = match &responder {
            Some(f) => f(&params),
            None => Ok(Value::Bool(true)),
        };
        self.calls.lock().push(RecordedCall {
            method: method.to_string(),
            params,
        });
        result
    }
}
