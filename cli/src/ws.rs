//! # WebSocket Connection
//!
//! A [`LedgerConnection`] over a rippled WebSocket endpoint.
//!
//! One task writes outgoing frames, another reads incoming ones. Responses
//! are matched to requests by the `id` field; everything else is parsed as
//! a stream event and broadcast. `ledgerClosed` events advance the ledger
//! index of the snapshot used to fill in omitted fields, and a third task
//! answers each of them by asking the server for the current open-ledger
//! fee.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use rippled_sign::network::LedgerClosed;
use rippled_sign::{ConnectionError, LedgerConnection, NetworkState, StreamEvent};

/// Broadcast capacity for stream events. Large enough to absorb a burst of
/// account activity between two polls of a slow listener.
const EVENT_CHANNEL_CAPACITY: usize = 256;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// State shared between the connection handle and its I/O tasks.
struct Shared {
    pending: Pending,
    events: Mutex<Option<broadcast::Sender<StreamEvent>>>,
    network: Mutex<NetworkState>,
    ready: AtomicBool,
    outgoing: mpsc::UnboundedSender<Message>,
    next_id: AtomicU64,
}

pub struct WsConnection {
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    fee_poller: JoinHandle<()>,
}

impl WsConnection {
    /// Connect, start the I/O tasks and subscribe to the ledger stream so
    /// the network snapshot is populated before the first use.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            bail!("unsupported scheme {:?}, expected ws or wss", url.scheme());
        }

        let (stream, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .with_context(|| format!("timed out connecting to {}", url))?
            .with_context(|| format!("failed to connect to {}", url))?;
        tracing::info!(%url, "connected");

        let (mut sink, mut source) = stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events, mut ledger_events) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            pending: Arc::new(Mutex::new(HashMap::new())),
            events: Mutex::new(Some(events)),
            network: Mutex::new(NetworkState::default()),
            ready: AtomicBool::new(true),
            outgoing,
            next_id: AtomicU64::new(1),
        });

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "websocket send failed");
                    break;
                }
            }
        });

        let reader_shared = Arc::clone(&shared);
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => reader_shared.dispatch(&text),
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "server closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            reader_shared.shut_down();
        });

        let poller_shared = Arc::clone(&shared);
        let fee_poller = tokio::spawn(async move {
            loop {
                match ledger_events.recv().await {
                    Ok(StreamEvent::LedgerClosed(_)) => {
                        poller_shared.refresh_fee().await;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let connection = Self {
            shared,
            reader,
            writer,
            fee_poller,
        };

        let subscribed = tokio::time::timeout(
            timeout,
            connection.request(json!({"command": "subscribe", "streams": ["ledger"]})),
        )
        .await
        .context("timed out subscribing to the ledger stream")?
        .context("ledger stream subscription failed")?;
        if let Some(error) = subscribed.get("error").and_then(Value::as_str) {
            bail!("ledger stream subscription rejected: {}", error);
        }
        connection.shared.absorb_ledger(&subscribed);

        tokio::time::timeout(timeout, connection.shared.refresh_fee())
            .await
            .ok()
            .flatten()
            .context("could not read the open-ledger fee")?;

        Ok(connection)
    }

    /// Send a close frame. The reader task finishes once the server
    /// acknowledges.
    pub fn close(&self) {
        let _ = self.shared.outgoing.send(Message::Close(None));
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.fee_poller.abort();
    }
}

impl Shared {
    fn dispatch(&self, text: &str) {
        let message: Value = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable frame");
                return;
            }
        };

        if let Some(id) = message.get("id").and_then(Value::as_u64) {
            let Some(reply) = self.pending.lock().remove(&id) else {
                tracing::debug!(id, "response for an unknown request");
                return;
            };
            let is_error = message.get("status").and_then(Value::as_str) == Some("error")
                || message.get("error").is_some();
            let payload = if is_error {
                message
            } else {
                message.get("result").cloned().unwrap_or(message)
            };
            let _ = reply.send(payload);
            return;
        }

        let Some(event) = StreamEvent::from_message(&message) else {
            return;
        };
        if let StreamEvent::LedgerClosed(closed) = &event {
            self.absorb_closed(closed);
        }
        if let Some(events) = self.events.lock().as_ref() {
            let _ = events.send(event);
        }
    }

    /// Seed the snapshot from a `subscribe` response.
    fn absorb_ledger(&self, result: &Value) {
        if let Ok(closed) = serde_json::from_value::<LedgerClosed>(result.clone()) {
            self.absorb_closed(&closed);
        }
    }

    fn absorb_closed(&self, closed: &LedgerClosed) {
        let mut network = self.network.lock();
        network.ledger_last = network.ledger_last.max(closed.ledger_index);
        tracing::trace!(ledger_index = closed.ledger_index, "ledger closed");
    }

    /// Ask for the open-ledger fee and store it. Returns the new fee, or
    /// `None` when the server did not report one.
    async fn refresh_fee(&self) -> Option<u64> {
        let result = match self.request(json!({"command": "fee"})).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "fee request failed");
                return None;
            }
        };
        let Some(fee) = open_ledger_fee(&result) else {
            tracing::debug!(%result, "fee response without drops.open_ledger_fee");
            return None;
        };
        self.network.lock().fee_avg = fee;
        tracing::trace!(fee, "open-ledger fee");
        Some(fee)
    }

    async fn request(&self, request: Value) -> Result<Value, ConnectionError> {
        let Value::Object(mut request) = request else {
            return Err(ConnectionError::InvalidResponse(
                "request must be a JSON object".into(),
            ));
        };
        if !self.is_ready() {
            return Err(ConnectionError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        request.insert("id".into(), Value::from(id));

        let (reply, response) = oneshot::channel();
        self.pending.lock().insert(id, reply);
        // shut_down may have cleared the table between the check and the insert.
        if !self.is_ready() {
            self.pending.lock().remove(&id);
            return Err(ConnectionError::Closed);
        }

        let text = Value::Object(request).to_string();
        if self.outgoing.send(Message::Text(text)).is_err() {
            self.pending.lock().remove(&id);
            return Err(ConnectionError::Closed);
        }
        response.await.map_err(|_| ConnectionError::Closed)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Fail outstanding requests and close the event stream.
    fn shut_down(&self) {
        self.ready.store(false, Ordering::Release);
        self.pending.lock().clear();
        self.events.lock().take();
    }
}

#[async_trait]
impl LedgerConnection for WsConnection {
    async fn request(&self, request: Value) -> Result<Value, ConnectionError> {
        self.shared.request(request).await
    }

    fn events(&self) -> broadcast::Receiver<StreamEvent> {
        match self.shared.events.lock().as_ref() {
            Some(events) => events.subscribe(),
            // Already closed: hand out a receiver that reports it at once.
            None => broadcast::channel(1).1,
        }
    }

    fn state(&self) -> NetworkState {
        *self.shared.network.lock()
    }

    fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }
}

/// `drops.open_ledger_fee` from a `fee` response. rippled reports drops as
/// decimal strings.
fn open_ledger_fee(result: &Value) -> Option<u64> {
    match result.get("drops")?.get("open_ledger_fee")? {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> (Shared, mpsc::UnboundedReceiver<Message>) {
        let (events, _) = broadcast::channel(8);
        let (outgoing, sent) = mpsc::unbounded_channel();
        let shared = Shared {
            pending: Arc::new(Mutex::new(HashMap::new())),
            events: Mutex::new(Some(events)),
            network: Mutex::new(NetworkState::default()),
            ready: AtomicBool::new(true),
            outgoing,
            next_id: AtomicU64::new(1),
        };
        (shared, sent)
    }

    #[tokio::test]
    async fn responses_route_to_their_request() {
        let (shared, _sent) = shared();
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().insert(7, tx);

        shared.dispatch(r#"{"id":7,"status":"success","type":"response","result":{"ledger_index":5}}"#);
        assert_eq!(rx.await.unwrap(), json!({"ledger_index": 5}));
    }

    #[tokio::test]
    async fn error_responses_carry_the_payload() {
        let (shared, _sent) = shared();
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().insert(1, tx);

        shared.dispatch(r#"{"id":1,"status":"error","error":"actNotFound","error_message":"Account not found."}"#);
        let payload = rx.await.unwrap();
        assert_eq!(payload["error"], "actNotFound");
    }

    #[test]
    fn ledger_closed_updates_snapshot_and_broadcasts() {
        let (shared, _sent) = shared();
        let mut rx = shared.events.lock().as_ref().unwrap().subscribe();

        shared.dispatch(r#"{"type":"ledgerClosed","ledger_index":1001,"fee_base":10,"ledger_hash":"AB"}"#);
        // The reference fee is not the open-ledger fee.
        assert_eq!(
            *shared.network.lock(),
            NetworkState {
                fee_avg: 0,
                ledger_last: 1001
            }
        );
        assert!(matches!(rx.try_recv(), Ok(StreamEvent::LedgerClosed(_))));
    }

    #[tokio::test]
    async fn fee_comes_from_the_fee_command() {
        let (shared, mut sent) = shared();
        let shared = Arc::new(shared);

        let refresher = Arc::clone(&shared);
        let refresh = tokio::spawn(async move { refresher.refresh_fee().await });

        let Some(Message::Text(text)) = sent.recv().await else {
            panic!("no fee request was sent");
        };
        let request: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(request["command"], "fee");
        let id = request["id"].as_u64().unwrap();

        shared.dispatch(
            &json!({
                "id": id,
                "status": "success",
                "type": "response",
                "result": {"drops": {"base_fee": "10", "open_ledger_fee": "15"}},
            })
            .to_string(),
        );
        assert_eq!(refresh.await.unwrap(), Some(15));
        assert_eq!(shared.network.lock().fee_avg, 15);
    }

    #[test]
    fn open_ledger_fee_parsing() {
        assert_eq!(open_ledger_fee(&json!({"drops": {"open_ledger_fee": "12"}})), Some(12));
        assert_eq!(open_ledger_fee(&json!({"drops": {"open_ledger_fee": 20}})), Some(20));
        assert_eq!(open_ledger_fee(&json!({"drops": {}})), None);
        assert_eq!(open_ledger_fee(&json!({"error": "noNetwork"})), None);
    }

    #[test]
    fn shut_down_closes_everything() {
        let (shared, _sent) = shared();
        let mut rx = shared.events.lock().as_ref().unwrap().subscribe();
        let (tx, mut reply) = oneshot::channel();
        shared.pending.lock().insert(3, tx);

        shared.shut_down();
        assert!(!shared.is_ready());
        assert!(reply.try_recv().is_err());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn requests_after_shut_down_fail_at_once() {
        let (shared, mut sent) = shared();
        shared.shut_down();

        let result = shared.request(json!({"command": "account_info"})).await;
        assert!(matches!(result, Err(ConnectionError::Closed)));
        assert!(shared.pending.lock().is_empty());
        assert!(sent.try_recv().is_err());
    }

    #[test]
    fn garbage_frames_are_ignored() {
        let (shared, _sent) = shared();
        shared.dispatch("not json");
        shared.dispatch(r#"{"type":"serverStatus"}"#);
        assert_eq!(*shared.network.lock(), NetworkState::default());
    }
}
