#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use relay_client::stomp::{Command, Frame};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use warp::Filter;
use warp::ws::{Message, WebSocket};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal STOMP broker over a warp WebSocket. Every frame it receives is
/// forwarded to the test; submitted words are echoed back as broadcasts.
pub async fn spawn_stomp_server() -> (SocketAddr, mpsc::UnboundedReceiver<Frame>) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let frames_tx = Arc::new(frames_tx);

    let route = warp::path!("ws" / "game" / "websocket")
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let frames = frames_tx.clone();
            ws.on_upgrade(move |socket| serve_stomp(socket, frames))
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, frames_rx)
}

async fn serve_stomp(socket: WebSocket, frames: Arc<mpsc::UnboundedSender<Frame>>) {
    let (mut tx, mut rx) = socket.split();
    let mut words = vec!["시작".to_string()];

    while let Some(Ok(message)) = rx.next().await {
        let Ok(text) = message.to_str() else {
            continue;
        };
        let Ok(Some(frame)) = Frame::decode(text) else {
            continue;
        };
        let _ = frames.send(frame.clone());

        let replies = match frame.command {
            Command::Connect => vec![
                Frame::new(Command::Connected)
                    .with_header("version", "1.2")
                    .with_header("session", "srv-session")
                    .with_header("heart-beat", "0,0"),
            ],
            Command::Send if frame.header("destination") == Some("/app/game.connect") => vec![
                Frame::new(Command::Message)
                    .with_header("subscription", "sub-0")
                    .with_header("destination", "/user/queue/welcome")
                    .with_body(r#"{"nickname":"즐거운 호랑이","score":0}"#),
            ],
            Command::Send if frame.header("destination") == Some("/app/game.word") => {
                let body: serde_json::Value = serde_json::from_str(&frame.body).unwrap();
                let word = body["word"].as_str().unwrap_or_default().to_string();
                if word.starts_with('작') {
                    words.push(word.clone());
                    vec![
                        Frame::new(Command::Message)
                            .with_header("subscription", "sub-1")
                            .with_header("destination", "/topic/messages")
                            .with_body(
                                serde_json::json!({
                                    "message": format!("{} accepted", word),
                                    "words": words,
                                })
                                .to_string(),
                            ),
                    ]
                } else {
                    vec![
                        Frame::new(Command::Message)
                            .with_header("subscription", "sub-2")
                            .with_header("destination", "/user/queue/errors")
                            .with_body("Invalid word"),
                    ]
                }
            }
            Command::Disconnect => break,
            _ => Vec::new(),
        };

        for reply in replies {
            if tx.send(Message::text(reply.encode())).await.is_err() {
                return;
            }
        }
    }
}

/// Accepts any number of connections on a raw TCP socket and answers each
/// with `body` as an SSE response, then closes it. Request lines are sent
/// to the test.
pub async fn spawn_sse_server(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let requests = requests_tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let request_line = request.lines().next().unwrap_or_default().to_string();
                let _ = requests.send(request_line);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n{}",
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(100)).await;
            });
        }
    });

    (addr, requests_rx)
}

/// Bind the presence service on an ephemeral port.
pub fn spawn_presence_server(ttl: Duration) -> (SocketAddr, Arc<relay_server::presence::PresenceRegistry>) {
    let registry = Arc::new(relay_server::presence::PresenceRegistry::new(ttl));
    let routes = relay_server::create_routes(registry.clone());
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, registry)
}

/// Wait for the next frame with the given command, skipping others.
pub async fn next_frame(frames: &mut mpsc::UnboundedReceiver<Frame>, command: Command) -> Frame {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let frame = frames.recv().await.expect("server stopped");
            if frame.command == command {
                return frame;
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}
