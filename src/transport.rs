use anyhow::{Result, anyhow};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = oneshot::Sender<Result<TransportResponse>>;

/// Global atomic ID counter for generating unique message IDs.
static GLOBAL_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a unique incremental ID for request messages.
pub(crate) fn next_id() -> usize {
    GLOBAL_ID_COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

/// Messages sent to the transport actor.
#[derive(Debug)]
pub(crate) enum TransportMessage {
    /// A browser-level command with a response sender.
    Request(Value, Pending),
    /// Listener for the target message carrying the given inner ID.
    ListenTargetMessage(u64, Pending),
    /// Listener for the next event `method` emitted by the target attached as `session_id`.
    ListenEvent {
        session_id: String,
        method: String,
        tx: oneshot::Sender<Value>,
    },
    /// Command to shut down the transport.
    Shutdown,
}

/// Responses produced by the transport actor.
#[derive(Debug)]
pub(crate) enum TransportResponse {
    Response(Response),
    Target(TargetMessage),
}

/// Represents a generic CDP response.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Response {
    pub(crate) id: u64,
    pub(crate) result: Value,
}

/// Represents messages sent from targets (`Target.receivedMessageFromTarget`).
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TargetMessage {
    pub(crate) params: Value,
}

struct EventListener {
    session_id: String,
    method: String,
    tx: oneshot::Sender<Value>,
}

/// Reply and event routing, kept apart from the socket.
#[derive(Default)]
struct Router {
    pending_requests: HashMap<u64, Pending>,
    event_listeners: Vec<EventListener>,
}

impl Router {
    fn expect_reply(&mut self, id: u64, tx: Pending) {
        // Waiters that timed out have dropped their receivers.
        self.pending_requests.retain(|_, tx| !tx.is_closed());
        self.pending_requests.insert(id, tx);
    }

    fn listen(&mut self, listener: EventListener) {
        self.event_listeners.retain(|l| !l.tx.is_closed());
        self.event_listeners.push(listener);
    }

    fn dispatch(&mut self, text: &str) {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            debug!("Ignoring non-JSON frame from browser");
            return;
        };

        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            let Some(sender) = self.pending_requests.remove(&id) else {
                return;
            };
            let outcome = match value.get("error") {
                Some(err) => Err(anyhow!("CDP error: {}", err)),
                None => serde_json::from_value::<Response>(value)
                    .map(TransportResponse::Response)
                    .map_err(Into::into),
            };
            let _ = sender.send(outcome);
            return;
        }

        if value.get("method").and_then(Value::as_str) != Some("Target.receivedMessageFromTarget") {
            return;
        }

        let Ok(target_msg) = serde_json::from_value::<TargetMessage>(value) else {
            return;
        };
        let Some(inner) = target_msg
            .params
            .get("message")
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
        else {
            return;
        };

        if let Some(id) = inner.get("id").and_then(Value::as_u64) {
            if let Some(sender) = self.pending_requests.remove(&id) {
                let outcome = match inner.get("error") {
                    Some(err) => Err(anyhow!("CDP error: {}", err)),
                    None => Ok(TransportResponse::Target(target_msg)),
                };
                let _ = sender.send(outcome);
            }
        } else if let Some(method) = inner.get("method").and_then(Value::as_str) {
            let session_id = target_msg.params["sessionId"].as_str().unwrap_or_default();
            let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.event_listeners)
                .into_iter()
                .partition(|l| l.method == method && l.session_id == session_id);
            self.event_listeners = rest;
            for listener in matched {
                let _ = listener.tx.send(inner["params"].clone());
            }
        }
    }
}

/// Internal transport actor managing WebSocket communication and request-response handling.
struct TransportActor {
    router: Router,
    ws_sink: SplitSink<WsStream, Message>,
    command_rx: mpsc::Receiver<TransportMessage>,
}

impl TransportActor {
    async fn run(mut self, mut ws_stream: SplitStream<WsStream>) {
        loop {
            // Commands first: a listener queued next to its request must be
            // installed before the reply frame is read.
            tokio::select! {
                biased;
                Some(msg) = self.command_rx.recv() => {
                    match msg {
                        TransportMessage::Request(cmd, tx) => {
                            let Some(id) = cmd["id"].as_u64() else {
                                let _ = tx.send(Err(anyhow!("Command without id")));
                                continue;
                            };
                            if self.ws_sink.send(Message::Text(cmd.to_string())).await.is_ok() {
                                self.router.expect_reply(id, tx);
                            } else {
                                let _ = tx.send(Err(anyhow!("WebSocket send failed")));
                            }
                        },
                        TransportMessage::ListenTargetMessage(id, tx) => {
                            self.router.expect_reply(id, tx);
                        },
                        TransportMessage::ListenEvent { session_id, method, tx } => {
                            self.router.listen(EventListener { session_id, method, tx });
                        },
                        TransportMessage::Shutdown => {
                            let _ = self.ws_sink.send(Message::Text(json!({
                                "id": next_id(),
                                "method": "Browser.close",
                                "params": {}
                            }).to_string())).await;
                            let _ = self.ws_sink.close().await;
                            break;
                        }
                    }
                }
                Some(msg) = ws_stream.next() => {
                    match msg {
                        Ok(Message::Text(text)) => self.router.dispatch(&text),
                        Ok(Message::Close(_)) | Err(_) => break,
                        _ => {}
                    }
                }
                else => break,
            }
        }

        // Dropping the senders wakes every waiter with a closed-channel error.
        self.router = Router::default();
    }
}

/// Asynchronous transport interface to the Chrome DevTools Protocol over WebSocket.
#[derive(Debug)]
pub(crate) struct Transport {
    tx: mpsc::Sender<TransportMessage>,
    command_timeout: Duration,
}

impl Transport {
    /// Creates a new transport connected to the specified WebSocket URL.
    pub(crate) async fn new(ws_url: &str, command_timeout: Duration) -> Result<Self> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (ws_sink, ws_stream) = ws_stream.split();
        let (tx, rx) = mpsc::channel(100);

        let actor = TransportActor {
            router: Router::default(),
            ws_sink,
            command_rx: rx,
        };
        tokio::spawn(actor.run(ws_stream));

        Ok(Self {
            tx,
            command_timeout,
        })
    }

    /// Sends a command and awaits its response.
    pub(crate) async fn send(&self, command: Value) -> Result<TransportResponse> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(TransportMessage::Request(command, tx))
            .await
            .map_err(|_| anyhow!("Transport actor dropped"))?;
        time::timeout(self.command_timeout, rx)
            .await
            .map_err(|_| anyhow!("Timeout waiting for response"))?
            .map_err(|_| anyhow!("Response channel closed"))?
    }

    /// Waits for a specific target message by ID.
    pub(crate) async fn get_target_msg(&self, msg_id: usize) -> Result<TransportResponse> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(TransportMessage::ListenTargetMessage(msg_id as u64, tx))
            .await
            .map_err(|_| anyhow!("Transport actor dropped"))?;
        time::timeout(self.command_timeout, rx)
            .await
            .map_err(|_| anyhow!("Timeout waiting for target message"))?
            .map_err(|_| anyhow!("Response channel closed"))?
    }

    /// Registers interest in the next `method` event of a target session.
    ///
    /// Register before triggering the action that emits the event, the actor only
    /// delivers events that arrive after the listener is installed.
    pub(crate) async fn listen_for_event(
        &self,
        session_id: &str,
        method: &str,
    ) -> Result<oneshot::Receiver<Value>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(TransportMessage::ListenEvent {
                session_id: session_id.to_string(),
                method: method.to_string(),
                tx,
            })
            .await
            .map_err(|_| anyhow!("Transport actor dropped"))?;
        Ok(rx)
    }

    /// Initiates a graceful shutdown of the transport.
    pub(crate) async fn shutdown(&self) {
        let _ = self.tx.send(TransportMessage::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(router: &mut Router, id: u64) -> oneshot::Receiver<Result<TransportResponse>> {
        let (tx, rx) = oneshot::channel();
        router.expect_reply(id, tx);
        rx
    }

    fn listener(router: &mut Router, session_id: &str, method: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        router.listen(EventListener {
            session_id: session_id.to_string(),
            method: method.to_string(),
            tx,
        });
        rx
    }

    fn from_target(session_id: &str, inner: Value) -> String {
        json!({
            "method": "Target.receivedMessageFromTarget",
            "params": { "sessionId": session_id, "message": inner.to_string() }
        })
        .to_string()
    }

    #[test]
    fn browser_reply_resolves_its_request() {
        let mut router = Router::default();
        let mut rx = pending(&mut router, 7);
        router.dispatch(r#"{"id":7,"result":{"targetId":"T1"}}"#);

        let Ok(Ok(TransportResponse::Response(res))) = rx.try_recv() else {
            panic!("expected a browser response");
        };
        assert_eq!(res.result["targetId"], "T1");
        assert!(router.pending_requests.is_empty());
    }

    #[test]
    fn browser_error_reply_is_an_error() {
        let mut router = Router::default();
        let mut rx = pending(&mut router, 3);
        router.dispatch(r#"{"id":3,"error":{"code":-32000,"message":"No target with given id"}}"#);

        let err = rx.try_recv().unwrap().unwrap_err();
        assert!(err.to_string().contains("No target with given id"));
    }

    #[test]
    fn target_reply_resolves_by_inner_id() {
        let mut router = Router::default();
        let mut outer = pending(&mut router, 10);
        let mut inner = pending(&mut router, 11);
        router.dispatch(&from_target("S1", json!({ "id": 11, "result": { "ok": true } })));

        assert!(outer.try_recv().is_err());
        let Ok(Ok(TransportResponse::Target(msg))) = inner.try_recv() else {
            panic!("expected a target message");
        };
        assert_eq!(msg.params["sessionId"], "S1");
        assert!(router.pending_requests.contains_key(&10));
    }

    #[test]
    fn target_error_reply_is_an_error() {
        let mut router = Router::default();
        let mut rx = pending(&mut router, 21);
        router.dispatch(&from_target(
            "S1",
            json!({ "id": 21, "error": { "code": -32000, "message": "Cannot find context" } }),
        ));

        let err = rx.try_recv().unwrap().unwrap_err();
        assert!(err.to_string().contains("Cannot find context"));
    }

    #[test]
    fn events_reach_only_their_session() {
        let mut router = Router::default();
        let mut other = listener(&mut router, "S2", "Page.loadEventFired");
        let mut mine = listener(&mut router, "S1", "Page.loadEventFired");
        router.dispatch(&from_target(
            "S1",
            json!({ "method": "Page.loadEventFired", "params": { "timestamp": 1.5 } }),
        ));

        assert_eq!(mine.try_recv().unwrap()["timestamp"], 1.5);
        assert!(other.try_recv().is_err());
        assert_eq!(router.event_listeners.len(), 1);
        assert_eq!(router.event_listeners[0].session_id, "S2");
    }

    #[test]
    fn abandoned_waiters_are_swept() {
        let mut router = Router::default();
        drop(pending(&mut router, 1));
        drop(listener(&mut router, "S1", "Page.loadEventFired"));
        let _live = pending(&mut router, 2);
        let _event = listener(&mut router, "S1", "Page.frameNavigated");

        assert_eq!(router.pending_requests.keys().copied().collect::<Vec<_>>(), [2]);
        assert_eq!(router.event_listeners.len(), 1);
    }

    #[test]
    fn garbage_frames_are_ignored() {
        let mut router = Router::default();
        let mut rx = pending(&mut router, 5);
        router.dispatch("not json");
        router.dispatch(r#"{"method":"Target.targetCreated","params":{}}"#);
        assert!(rx.try_recv().is_err());
        assert!(router.pending_requests.contains_key(&5));
    }
}
