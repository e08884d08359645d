//! Driver-leg behavior against a real local WebSocket peer: connection
//! announcement, recovery after the peer drops us, and the best-effort
//! send policy across the gap.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

use tabwire_transport::{ChannelState, DriverChannel};

async fn recv_text(
    ws: &mut tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
) -> Option<String> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

#[tokio::test]
async fn test_connect_announce_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("ws://{}", addr);

    let channel = Arc::new(DriverChannel::new(&url, Duration::from_millis(100)));
    let sender = channel.sender();
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(16);
    let (shutdown_tx, _) = broadcast::channel(1);

    {
        let channel = channel.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            channel.run(inbound_tx, shutdown_rx).await;
        });
    }

    // First connection: the channel announces itself.
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("first connection")
        .unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let hello: Value = serde_json::from_str(&recv_text(&mut ws).await.unwrap()).unwrap();
    assert_eq!(hello["type"], "connected");
    assert_eq!(hello["version"], "1.0.0");

    // Inbound frames reach the consumer.
    ws.send(Message::Text(r#"{"id":"x","command":"tabs.list"}"#.into()))
        .await
        .unwrap();
    let inbound = tokio::time::timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("inbound frame")
        .unwrap();
    assert!(inbound.contains("tabs.list"));

    // Peer drops the connection; the channel must retry on its own.
    drop(ws);
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A frame sent while the channel is down is dropped, not queued.
    sender.send(r#"{"type":"response","id":"stale","result":null}"#.into()).await;

    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("reconnect within the delay window")
        .unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    // Fresh connection re-announces.
    let hello: Value = serde_json::from_str(&recv_text(&mut ws).await.unwrap()).unwrap();
    assert_eq!(hello["type"], "connected");
    assert_eq!(channel.state().await, ChannelState::Open);

    // The channel is usable again; the stale frame never arrives.
    sender.send(r#"{"type":"response","id":"y","result":{"ok":true}}"#.into()).await;
    let next: Value = serde_json::from_str(&recv_text(&mut ws).await.unwrap()).unwrap();
    assert_eq!(next["id"], "y");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_send_before_any_connection_is_noop() {
    // Nothing is listening; the channel stays Closed/Connecting and sends
    // are silently dropped rather than erroring or queueing.
    let channel = DriverChannel::new("ws://127.0.0.1:1", Duration::from_millis(50));
    let sender = channel.sender();
    sender.send("{\"type\":\"response\"}".into()).await;
    assert_ne!(channel.state().await, ChannelState::Open);
}
