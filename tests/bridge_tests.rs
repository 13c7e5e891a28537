use rt_tool_bridge::bridge::BoxFuture;
use rt_tool_bridge::builtin::CalculatorTool;
use rt_tool_bridge::{
    Bridge, Connector, Error, Result, RetryPolicy, ToolBridge, ToolRegistry, Transport,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

struct ScriptedTransport {
    incoming: mpsc::Receiver<Result<String>>,
    outgoing: mpsc::Sender<String>,
    closed: Arc<AtomicUsize>,
}

impl Transport for ScriptedTransport {
    fn send_text(&mut self, frame: String) -> BoxFuture<'_, Result<()>> {
        let outgoing = self.outgoing.clone();
        Box::pin(async move { outgoing.send(frame).await.map_err(|_| Error::ConnectionClosed) })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move { self.incoming.recv().await.transpose() })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Test side of one scripted connection.
struct Remote {
    to_bridge: mpsc::Sender<Result<String>>,
    from_bridge: mpsc::Receiver<String>,
}

impl Remote {
    async fn send(&self, frame: Value) {
        self.to_bridge.send(Ok(frame.to_string())).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.from_bridge.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("bridge dropped the connection");
        serde_json::from_str(&frame).unwrap()
    }
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    transports: Arc<Mutex<VecDeque<Box<dyn Transport>>>>,
    attempts: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    dialed_at: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedConnector {
    fn accept(&self) -> Remote {
        let (to_bridge, incoming) = mpsc::channel(16);
        let (outgoing, from_bridge) = mpsc::channel(16);
        self.transports.lock().unwrap().push_back(Box::new(ScriptedTransport {
            incoming,
            outgoing,
            closed: Arc::clone(&self.closed),
        }));
        Remote { to_bridge, from_bridge }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Time between consecutive connection attempts.
    fn gaps(&self) -> Vec<Duration> {
        let dialed_at = self.dialed_at.lock().unwrap();
        dialed_at.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.dialed_at.lock().unwrap().push(Instant::now());
        let next = self.transports.lock().unwrap().pop_front();
        Box::pin(async move { next.ok_or_else(|| Error::Handshake("connection refused".to_string())) })
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        request_timeout: Duration::from_secs(1),
        backoff: Duration::ZERO,
    }
}

fn bridge(connector: &ScriptedConnector, reconnect: bool) -> ToolBridge {
    bridge_with(connector, reconnect, fast_policy())
}

fn bridge_with(connector: &ScriptedConnector, reconnect: bool, policy: RetryPolicy) -> ToolBridge {
    let registry = Arc::new(ToolRegistry::new());
    registry.register_tool(CalculatorTool);
    Bridge::builder()
        .registry(registry)
        .connector(connector.clone())
        .retry_policy(policy)
        .reconnect(reconnect)
        .build()
        .unwrap()
}

#[tokio::test]
async fn exhausted_retries_surface_as_handshake_error() {
    let connector = ScriptedConnector::default();
    let err = bridge(&connector, true)
        .run(std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Handshake(_)));
    assert_eq!(connector.attempts(), 3);
    assert_eq!(connector.closed(), 0);
}

#[tokio::test]
async fn serves_calls_until_shutdown() {
    let connector = ScriptedConnector::default();
    let mut remote = connector.accept();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(bridge(&connector, true).run(async move {
        let _ = stopped.await;
    }));

    let announcement = remote.recv().await;
    assert_eq!(announcement["type"], "tools_announcement");
    assert_eq!(announcement["tools"][0]["name"], "calculate");
    assert_eq!(announcement["tools"][0]["parameters"]["required"], json!(["expression"]));

    remote
        .send(json!({ "type": "call_tool", "tool_name": "calculate", "parameters": { "expression": "6 * 7" } }))
        .await;
    remote.send(json!({ "type": "list_tools" })).await;
    remote.send(json!({ "type": "ping" })).await;

    let result = remote.recv().await;
    assert_eq!(result["type"], "tool_result");
    assert_eq!(result["result"], json!({ "success": true, "result": 42, "message": "6 * 7 = 42" }));
    assert_eq!(remote.recv().await["type"], "tools_list");
    assert_eq!(remote.recv().await["error"], "unknown message type: ping");

    stop.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(connector.attempts(), 1);
    assert_eq!(connector.closed(), 1);
}

#[tokio::test]
async fn reconnects_and_reannounces_after_remote_close() {
    let connector = ScriptedConnector::default();
    let mut first = connector.accept();
    let mut second = connector.accept();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(bridge(&connector, true).run(async move {
        let _ = stopped.await;
    }));

    assert_eq!(first.recv().await["type"], "tools_announcement");
    drop(first.to_bridge);

    assert_eq!(second.recv().await["type"], "tools_announcement");
    second.send(json!({ "type": "list_tools" })).await;
    assert_eq!(second.recv().await["type"], "tools_list");

    stop.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn remote_close_without_reconnect_ends_cleanly() {
    let connector = ScriptedConnector::default();
    let mut remote = connector.accept();
    let task = tokio::spawn(bridge(&connector, false).run(std::future::pending()));

    assert_eq!(remote.recv().await["type"], "tools_announcement");
    drop(remote.to_bridge);

    task.await.unwrap().unwrap();
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn transport_error_without_reconnect_is_returned() {
    let connector = ScriptedConnector::default();
    let mut remote = connector.accept();
    let task = tokio::spawn(bridge(&connector, false).run(std::future::pending()));

    assert_eq!(remote.recv().await["type"], "tools_announcement");
    remote.to_bridge.send(Err(Error::ConnectionClosed)).await.unwrap();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
}

#[tokio::test]
async fn malformed_frames_do_not_end_the_session() {
    let connector = ScriptedConnector::default();
    let mut remote = connector.accept();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(bridge(&connector, false).run(async move {
        let _ = stopped.await;
    }));

    assert_eq!(remote.recv().await["type"], "tools_announcement");
    remote.to_bridge.send(Ok("{not json".to_string())).await.unwrap();
    remote.to_bridge.send(Ok("[1, 2, 3]".to_string())).await.unwrap();
    remote.send(json!({ "type": "list_tools" })).await;
    assert_eq!(remote.recv().await["type"], "tools_list");

    stop.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn reconnects_back_off_until_traffic_is_served() {
    let connector = ScriptedConnector::default();
    let mut first = connector.accept();
    let mut second = connector.accept();
    let mut third = connector.accept();
    let policy = RetryPolicy {
        max_retries: 1,
        request_timeout: Duration::from_secs(1),
        backoff: Duration::from_secs(1),
    };
    let task = tokio::spawn(bridge_with(&connector, true, policy).run(std::future::pending()));

    // Hangs up straight after the announcement.
    assert_eq!(first.recv().await["type"], "tools_announcement");
    drop(first.to_bridge);

    // Answers one request before hanging up.
    assert_eq!(second.recv().await["type"], "tools_announcement");
    second.send(json!({ "type": "list_tools" })).await;
    assert_eq!(second.recv().await["type"], "tools_list");
    drop(second.to_bridge);

    assert_eq!(third.recv().await["type"], "tools_announcement");
    drop(third.to_bridge);

    // The fourth dial finds nothing to connect to.
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Handshake(_)));
    assert_eq!(connector.attempts(), 4);
    assert_eq!(
        connector.gaps(),
        vec![Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_reconnect_delay() {
    let connector = ScriptedConnector::default();
    let mut remote = connector.accept();
    let policy = RetryPolicy {
        max_retries: 1,
        request_timeout: Duration::from_secs(1),
        backoff: Duration::from_secs(30),
    };
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(bridge_with(&connector, true, policy).run(async move {
        let _ = stopped.await;
    }));

    assert_eq!(remote.recv().await["type"], "tools_announcement");
    drop(remote.to_bridge);
    tokio::time::sleep(Duration::from_secs(5)).await;
    stop.send(()).unwrap();

    task.await.unwrap().unwrap();
    assert_eq!(connector.attempts(), 1);
}
