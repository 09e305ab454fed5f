mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::{
    app_state, config_manager, memory_store, records, spawn_server, wait_for, BrokenRecordStore,
    StubProvider, FAIL_INPUT,
};
use parley_server::ERROR_REPLY;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

/// Next text frame, skipping control frames.
async fn next_text(ws: &mut Client) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    })
    .await
    .expect("no frame within 5s")
}

#[tokio::test]
async fn test_session_registered_while_connected() {
    let state = app_state(Arc::new(StubProvider::new()), memory_store(), config_manager(&[], false));
    let addr = spawn_server(state.clone()).await;

    let mut ws = connect(addr).await;
    wait_for(|| state.registry.len() == 1).await;
    assert_eq!(state.registry.list().len(), 1);

    ws.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: hello");

    ws.close(None).await.unwrap();
    wait_for(|| state.registry.is_empty()).await;
}

#[tokio::test]
async fn test_session_released_on_abrupt_disconnect() {
    let state = app_state(Arc::new(StubProvider::new()), memory_store(), config_manager(&[], false));
    let addr = spawn_server(state.clone()).await;

    let ws = connect(addr).await;
    wait_for(|| state.registry.len() == 1).await;

    drop(ws);
    wait_for(|| state.registry.is_empty()).await;
}

#[tokio::test]
async fn test_reply_is_persisted_anonymously() {
    let store = memory_store();
    let state = app_state(Arc::new(StubProvider::new()), store.clone(), config_manager(&[], false));
    let addr = spawn_server(state).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: hello");

    wait_for(|| store.record_count() == 1).await;
    let saved = records(&store).await;
    assert!(saved[0].is_anonymous());
    assert_eq!(saved[0].user_input, "hello");
    assert_eq!(saved[0].ai_response, "echo: hello");
}

#[tokio::test]
async fn test_upstream_failure_keeps_connection_open() {
    let provider = Arc::new(StubProvider::new());
    let store = memory_store();
    let state = app_state(provider.clone(), store.clone(), config_manager(&[], false));
    let addr = spawn_server(state.clone()).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Text(FAIL_INPUT.into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, ERROR_REPLY);

    // the next frame is the reply to the next input, so only one error frame was sent
    ws.send(Message::Text("again".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: again");

    assert_eq!(provider.calls(), 2);
    assert_eq!(state.registry.len(), 1);
    wait_for(|| store.record_count() == 1).await;
}

#[tokio::test]
async fn test_one_upstream_call_in_flight_per_connection() {
    let provider = Arc::new(StubProvider::with_delay(Duration::from_millis(50)));
    let state = app_state(provider.clone(), memory_store(), config_manager(&[], false));
    let addr = spawn_server(state).await;

    let mut ws = connect(addr).await;
    for i in 0..3 {
        ws.send(Message::Text(format!("m{}", i))).await.unwrap();
    }
    for i in 0..3 {
        assert_eq!(next_text(&mut ws).await, format!("echo: m{}", i));
    }

    assert_eq!(provider.calls(), 3);
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_binary_frames_are_text_input() {
    let provider = Arc::new(StubProvider::new());
    let state = app_state(provider.clone(), memory_store(), config_manager(&[], false));
    let addr = spawn_server(state).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Ping(vec![1, 2])).await.unwrap();
    ws.send(Message::Binary(b"bytes".to_vec())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: bytes");
    assert_eq!(provider.inputs(), vec!["bytes".to_string()]);
}

#[tokio::test]
async fn test_persistence_failure_is_invisible_to_client() {
    let state = app_state(
        Arc::new(StubProvider::new()),
        Arc::new(BrokenRecordStore),
        config_manager(&[], false),
    );
    let addr = spawn_server(state.clone()).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Text("one".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: one");
    ws.send(Message::Text("two".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: two");
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_required_auth_rejects_anonymous_upgrade() {
    let store = memory_store();
    let state = app_state(
        Arc::new(StubProvider::new()),
        store.clone(),
        config_manager(&[("tok-1", "u1")], true),
    );
    let addr = spawn_server(state.clone()).await;

    match connect_async(format!("ws://{}/ws", addr)).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected 401, got {:?}", other.map(|(_, r)| r.status())),
    }
    assert!(state.registry.is_empty());

    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("authorization", "Bearer tok-1".parse().unwrap());
    let (mut ws, _) = connect_async(request).await.unwrap();

    ws.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "echo: hello");
    wait_for(|| store.record_count() == 1).await;
    assert_eq!(records(&store).await[0].user.as_ref().map(|u| u.as_str()), Some("u1"));
}
