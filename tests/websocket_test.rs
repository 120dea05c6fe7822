//! End-to-end tests over real WebSocket connections.

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tictactoe_server::{ServerConfig, ServerHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> ServerHandle {
    let config = ServerConfig::default().with_host("127.0.0.1").with_port(0);
    tictactoe_server::start(&config).await.unwrap()
}

async fn connect(server: &ServerHandle, path: &str) -> Client {
    let url = format!("ws://{}{}", server.local_addr, path);
    let (ws, _) = tokio::time::timeout(WAIT, connect_async(url))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    ws
}

/// Next text frame, skipping control frames.
async fn recv_text(ws: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn recv_json(ws: &mut Client) -> Value {
    serde_json::from_str(&recv_text(ws).await).unwrap()
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

fn move_json(row: i64, col: i64, player: &str) -> Value {
    json!({"move": {"_0": {"row": row, "col": col, "player": player}}})
}

/// Plain HTTP/1.1 GET, returning the whole response.
async fn http_get(server: &ServerHandle, path: &str) -> String {
    let mut stream = TcpStream::connect(server.local_addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

#[tokio::test]
async fn test_root_responds() {
    let server = start_server().await;
    let response = http_get(&server, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("It works!"));
    server.shutdown();
}

#[tokio::test]
async fn test_hello_greets_by_name() {
    let server = start_server().await;
    assert!(http_get(&server, "/hello").await.ends_with("Hello, world!"));
    assert!(http_get(&server, "/hello/ada").await.ends_with("Hello, ada!"));
    server.shutdown();
}

#[tokio::test]
async fn test_start_fails_on_taken_port() {
    let server = start_server().await;
    let config = ServerConfig::default()
        .with_host("127.0.0.1")
        .with_port(server.local_addr.port());

    let err = tictactoe_server::start(&config).await.unwrap_err();
    assert!(err.message.contains("I/O error"), "{err}");
    server.shutdown();
}

#[tokio::test]
async fn test_two_players_play_and_one_disconnects() {
    let server = start_server().await;

    let mut alice = connect(&server, "/game/alice").await;
    assert_eq!(recv_json(&mut alice).await, json!({"waitingForPlayer": {}}));
    assert_eq!(server.state.connections().count(), 1);

    let mut bob = connect(&server, "/game/bob").await;
    assert_eq!(recv_json(&mut bob).await, json!({"opponentsTurn": {}}));
    assert_eq!(recv_json(&mut alice).await, json!({"yourTurn": {}}));

    send_json(&mut alice, move_json(0, 0, "x")).await;
    let board = json!([["x", "none", "none"], ["none", "none", "none"], ["none", "none", "none"]]);
    assert_eq!(
        recv_json(&mut alice).await,
        json!({"moveAccepted": {"_0": board, "_1": {"ongoing": {}}}})
    );
    assert_eq!(recv_json(&mut alice).await, json!({"opponentsTurn": {}}));
    assert_eq!(
        recv_json(&mut bob).await,
        json!({"opponentMoved": {"_0": board, "_1": {"ongoing": {}}}})
    );
    assert_eq!(recv_json(&mut bob).await, json!({"yourTurn": {}}));

    // Occupied cell, sent as a binary frame.
    bob.send(Message::binary(move_json(0, 0, "o").to_string().into_bytes()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut bob).await, json!({"moveRejected": {}}));

    bob.close(None).await.unwrap();
    assert_eq!(
        recv_json(&mut alice).await,
        json!({"opponentLeft": {"_0": {"win": {"_0": "x"}}}})
    );

    assert!(server.state.router().sessions().sessions().is_empty());
    server.shutdown();
}

#[tokio::test]
async fn test_garbage_keeps_connection_open() {
    let server = start_server().await;
    let mut alice = connect(&server, "/game/alice").await;
    recv_json(&mut alice).await;

    alice.send(Message::text("certainly not json")).await.unwrap();
    send_json(&mut alice, json!({"leaveGame": {}})).await;
    assert_eq!(
        recv_json(&mut alice).await,
        json!({"youLeft": {"_0": {"win": {"_0": "o"}}}})
    );

    send_json(&mut alice, json!({"joinGame": {}})).await;
    assert_eq!(recv_json(&mut alice).await, json!({"waitingForPlayer": {}}));
    server.shutdown();
}

#[tokio::test]
async fn test_chat_relays_lines_to_everyone() {
    let server = start_server().await;

    let mut ann = connect(&server, "/chat/ann").await;
    assert_eq!(recv_text(&mut ann).await, "**ann** has joined the chat");

    let mut ben = connect(&server, "/chat/ben").await;
    assert_eq!(recv_text(&mut ben).await, "**ben** has joined the chat");
    assert_eq!(recv_text(&mut ann).await, "**ben** has joined the chat");

    ann.send(Message::text("hello")).await.unwrap();
    assert_eq!(recv_text(&mut ann).await, "**ann** hello");
    assert_eq!(recv_text(&mut ben).await, "**ann** hello");

    ann.close(None).await.unwrap();
    assert_eq!(recv_text(&mut ben).await, "**ann** has left the chat");
    server.shutdown();
}

#[tokio::test]
async fn test_status_feed_reports_anonymous_join() {
    let server = start_server().await;
    let mut status = connect(&server, "/status").await;
    // The subscription is made after the upgrade completes.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut guest = connect(&server, "/game").await;
    assert_eq!(recv_json(&mut guest).await, json!({"waitingForPlayer": {}}));
    assert_eq!(recv_text(&mut status).await, "**Anonymous** has joined a game");
    server.shutdown();
}
