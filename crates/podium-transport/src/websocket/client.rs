//! WebSocket client for the XML-RPC bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use podium_core::{
    Notification, NotificationStream, RpcError, RpcResult, Transport, TransportError,
    TransportResult,
};

use crate::codec::{self, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResult<Value>>>>>;

/// Connection settings for [`WsTransport`].
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Bridge URL, e.g. `ws://127.0.0.1:5001`.
    pub url: String,
    /// How long a call waits for its response.
    pub request_timeout: Duration,
    /// Capacity of the notification stream handed to the dispatcher.
    /// Callbacks beyond it wait in the forwarding queue; they never hold up
    /// responses.
    pub notification_capacity: usize,
}

impl WsClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout (builder pattern).
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5001".to_string(),
            request_timeout: Duration::from_secs(30),
            notification_capacity: 1024,
        }
    }
}

/// [`Transport`] over the bridge's WebSocket.
///
/// Each call:
/// 1. takes the next numeric request id;
/// 2. registers a one-shot channel for that id in the pending map;
/// 3. hands the encoded request to the connection task;
/// 4. awaits the one-shot, resolved when the response with the same id
///    arrives, or gives up after the request timeout.
///
/// Callbacks are forwarded, in arrival order, to the [`NotificationStream`]
/// returned by [`WsTransport::connect`]. The connection task hands them to a
/// forwarding task over an unbounded queue, so a slow subscriber cannot stop
/// responses from being read. When the connection drops, pending calls fail
/// with [`RpcError::NotConnected`] and the stream ends.
pub struct WsTransport {
    message_tx: mpsc::Sender<String>,
    pending: PendingCalls,
    next_id: AtomicU64,
    request_timeout: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl WsTransport {
    /// Connects to the bridge and spawns the connection task.
    pub async fn connect(
        config: WsClientConfig,
    ) -> TransportResult<(Arc<Self>, NotificationStream)> {
        info!(url = %config.url, "Connecting to the server bridge");

        let (ws_stream, _response) =
            connect_async(&config.url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: config.url.clone(),
                    reason: format!("WebSocket connection failed: {e}"),
                })?;

        info!(url = %config.url, "Connected to the server bridge");

        let (message_tx, message_rx) = mpsc::channel::<String>(256);
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::channel(config.notification_capacity);
        tokio::spawn(forward_callbacks(callback_rx, notification_tx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pending = PendingCalls::default();

        let (ws_tx, ws_rx) = ws_stream.split();
        let state = ConnectionLoop {
            ws_tx,
            ws_rx,
            pending: pending.clone(),
            callback_tx,
        };
        tokio::spawn(state.run(message_rx, shutdown_rx));

        let transport = Arc::new(Self {
            message_tx,
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
            shutdown_tx,
        });
        Ok((transport, notification_rx))
    }

    /// Number of calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        // Register before sending so a fast response is never missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let frame = match codec::encode_request(id, method, &params) {
            Ok(frame) => frame,
            Err(e) => {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        };

        debug!(method = %method, id, "Calling remote method");

        if self.message_tx.send(frame).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(RpcError::NotConnected);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(RpcError::NotConnected),
            Err(_) => {
                self.pending.lock().remove(&id);
                warn!(method = %method, id, "Remote call timed out");
                Err(RpcError::Timeout)
            }
        }
    }

    async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// State owned by the connection task.
struct ConnectionLoop {
    ws_tx: WsSink,
    ws_rx: WsSource,
    pending: PendingCalls,
    callback_tx: mpsc::UnboundedSender<Notification>,
}

impl ConnectionLoop {
    async fn run(
        mut self,
        mut message_rx: mpsc::Receiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Closing the bridge connection");
                        let _ = self.ws_tx.close().await;
                        break;
                    }
                }

                Some(frame) = message_rx.recv() => {
                    if let Err(e) = self.ws_tx.send(Message::Text(frame.into())).await {
                        warn!(error = %e, "Failed to send request");
                    }
                }

                msg = self.ws_rx.next() => {
                    if !self.handle_message(msg).await {
                        break;
                    }
                }
            }
        }
        self.fail_pending();
    }

    /// Returns `false` once the connection is gone.
    async fn handle_message(&mut self, msg: Option<Result<Message, Error>>) -> bool {
        match msg {
            Some(Ok(Message::Text(text))) => {
                trace!(len = text.len(), "Received text");
                self.route(text.as_str())
            }
            Some(Ok(Message::Binary(data))) => {
                trace!(len = data.len(), "Received binary");
                match std::str::from_utf8(&data) {
                    Ok(text) => self.route(text),
                    Err(_) => {
                        warn!("Dropping non UTF-8 binary frame");
                        true
                    }
                }
            }
            Some(Ok(Message::Ping(data))) => {
                trace!("Received ping, sending pong");
                let _ = self.ws_tx.send(Message::Pong(data)).await;
                true
            }
            Some(Ok(Message::Pong(_))) => true,
            Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) => {
                info!("Bridge closed the connection");
                false
            }
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                false
            }
            None => {
                info!("WebSocket stream ended");
                false
            }
        }
    }

    /// Routes a decoded frame without waiting. Returns `false` if the
    /// notification subscriber is gone.
    fn route(&mut self, text: &str) -> bool {
        match codec::decode(text) {
            Ok(Frame::Response { id, reply }) => {
                match self.pending.lock().remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(reply.into_result());
                    }
                    None => warn!(id, "Response for unknown request id (timed out?)"),
                }
                true
            }
            Ok(Frame::Callback(notification)) => {
                trace!(name = %notification.name, "Callback received");
                if self.callback_tx.send(notification).is_err() {
                    info!("Notification subscriber dropped; closing connection");
                    return false;
                }
                true
            }
            Err(reason) => {
                warn!(reason = %reason, "Dropping malformed bridge frame");
                true
            }
        }
    }

    /// Unblocks every pending call with [`RpcError::NotConnected`].
    fn fail_pending(&self) {
        let mut pending = self.pending.lock();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Clearing pending calls due to disconnect");
            pending.clear();
        }
    }
}

/// Moves callbacks from the connection task's queue into the bounded
/// notification stream, preserving order. Ends when either side closes.
async fn forward_callbacks(
    mut callback_rx: mpsc::UnboundedReceiver<Notification>,
    notification_tx: mpsc::Sender<Notification>,
) {
    while let Some(notification) = callback_rx.recv().await {
        if notification_tx.send(notification).await.is_err() {
            debug!("Notification stream closed; dropping further callbacks");
            break;
        }
    }
}
