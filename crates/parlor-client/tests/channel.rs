use std::time::Duration;

use axum::{
    Router,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use url::Url;
use uuid::Uuid;

use parlor_client::channel;
use parlor_types::events::{ChannelEvent, Envelope, PeerName, PeerRef};

/// Echoes every text frame, preceded by one frame that is not an envelope.
async fn noisy_echo(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        while let Some(Ok(msg)) = socket.recv().await {
            if let Message::Text(_) = msg {
                if socket.send(Message::Text("garbage".to_string().into())).await.is_err() {
                    break;
                }
                if socket.send(msg).await.is_err() {
                    break;
                }
            }
        }
    })
}

/// Echoes one frame and hangs up.
async fn echo_once(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        if let Some(Ok(msg)) = socket.recv().await {
            let _ = socket.send(msg).await;
        }
        let _ = socket.send(Message::Close(None)).await;
    })
}

async fn serve() -> String {
    let app = Router::new()
        .route("/channel", get(noisy_echo))
        .route("/once", get(echo_once));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("ws://{}", addr)
}

fn whisper() -> Envelope {
    Envelope::new(
        Uuid::from_u128(9),
        Uuid::from_u128(1),
        ChannelEvent::Whisper {
            to: PeerRef { id: 2, sid: None },
            from: PeerName {
                username: "ana".into(),
            },
            whisper: "psst".into(),
        },
    )
}

#[tokio::test]
async fn envelopes_cross_the_socket_and_noise_is_skipped() {
    let base = serve().await;
    let mut ch = channel::connect(&Url::parse(&format!("{}/channel", base)).unwrap())
        .await
        .unwrap();

    ch.outbound.send(whisper()).unwrap();
    let echoed = tokio::time::timeout(Duration::from_secs(5), ch.inbound.recv())
        .await
        .unwrap();

    assert_eq!(echoed, Some(whisper()));
}

#[tokio::test]
async fn inbound_ends_when_server_hangs_up() {
    let base = serve().await;
    let mut ch = channel::connect(&Url::parse(&format!("{}/once", base)).unwrap())
        .await
        .unwrap();

    ch.outbound.send(whisper()).unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), ch.inbound.recv())
        .await
        .unwrap();
    assert_eq!(first, Some(whisper()));

    let next = tokio::time::timeout(Duration::from_secs(5), ch.inbound.recv())
        .await
        .unwrap();
    assert_eq!(next, None);
    tokio::time::timeout(Duration::from_secs(5), ch.task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn connect_to_nothing_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = channel::connect(&Url::parse(&format!("ws://{}/channel", addr)).unwrap()).await;
    assert!(result.is_err());
}
