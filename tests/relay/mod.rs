//! Relay tests over real WebSocket connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use eridanus_webui::relay::{serve, EnvelopeTranslator, RelayHub};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> (SocketAddr, Arc<RelayHub>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hub = Arc::new(RelayHub::new(
        EnvelopeTranslator::default(),
        Duration::from_millis(500),
        64,
    ));
    tokio::spawn(serve(listener, Arc::clone(&hub)));
    (addr, hub)
}

async fn wait_for_peers(hub: &RelayHub, count: usize) {
    tokio::time::timeout(WAIT, async {
        while hub.registry().len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {} peers, have {}", count, hub.registry().len()));
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    client
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn recv_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

#[tokio::test]
async fn test_echo_is_acknowledged_to_every_peer() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    send(&mut a, json!({"echo": "abc"})).await;

    let expected = json!({
        "status": "ok",
        "retcode": 0,
        "data": {"message_id": 1253451396},
        "message": "",
        "wording": "",
        "echo": "abc"
    });
    assert_eq!(recv_json(&mut a).await, expected);
    assert_eq!(recv_json(&mut b).await, expected);
}

#[tokio::test]
async fn test_event_goes_to_others_only() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    send(&mut a, json!({"text": "hi"})).await;

    let event = recv_json(&mut b).await;
    assert_eq!(event["message"], json!({"text": "hi"}));
    assert_eq!(event["self_id"], json!(1000000));
    assert_eq!(event["group_id"], json!(879886836));
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_array_payload_gets_mention() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    send(&mut a, json!([{"type": "text", "data": {"text": "/help"}}])).await;

    let event = recv_json(&mut b).await;
    assert_eq!(
        event["message"],
        json!([
            {"type": "at", "data": {"qq": "1000000", "name": "Eridanus"}},
            {"type": "text", "data": {"text": "/help"}}
        ])
    );
}

#[tokio::test]
async fn test_messages_from_one_peer_arrive_in_order() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    for i in 0..20 {
        send(&mut a, json!({"n": i})).await;
    }
    for i in 0..20 {
        assert_eq!(recv_json(&mut b).await["message"]["n"], json!(i));
    }
}

#[tokio::test]
async fn test_invalid_json_closes_only_that_connection() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    a.send(Message::Text("not json".to_string())).await.unwrap();
    wait_for_peers(&hub, 1).await;

    send(&mut b, json!({"echo": 7})).await;
    assert_eq!(recv_json(&mut b).await["echo"], json!(7));
}

#[tokio::test]
async fn test_queued_frames_are_flushed_before_close() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    wait_for_peers(&hub, 1).await;

    send(&mut a, json!({"echo": "last"})).await;
    a.send(Message::Text("not json".to_string())).await.unwrap();

    assert_eq!(recv_json(&mut a).await["echo"], json!("last"));
    let next = tokio::time::timeout(WAIT, a.next())
        .await
        .expect("timed out waiting for close");
    assert!(
        matches!(next, Some(Ok(Message::Close(_))) | None),
        "expected close frame, got {:?}",
        next
    );
    wait_for_peers(&hub, 0).await;
}

#[tokio::test]
async fn test_disconnect_unregisters_peer() {
    let (addr, hub) = start_relay().await;
    let a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_peers(&hub, 2).await;

    drop(a);
    wait_for_peers(&hub, 1).await;

    let mut c = connect(addr).await;
    wait_for_peers(&hub, 2).await;
    send(&mut c, json!({"text": "after"})).await;
    assert_eq!(recv_json(&mut b).await["message"], json!({"text": "after"}));
}

#[tokio::test]
async fn test_large_frames_are_accepted() {
    let (addr, hub) = start_relay().await;
    let mut a = connect(addr).await;
    wait_for_peers(&hub, 1).await;

    let padding = "x".repeat(20 * 1024 * 1024);
    send(&mut a, json!({"echo": "big", "padding": padding})).await;
    assert_eq!(recv_json(&mut a).await["echo"], json!("big"));
}
