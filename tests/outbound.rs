//! Outbound path: request composition on the wire, status classification,
//! and the finish guarantee on the input message.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::http::HeaderMap;
use event_http_protocol::{Context, HttpMessage, Message, Protocol, ProtocolError};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio_util::sync::CancellationToken;

mod common;

use common::{event, Reply, Tracked};

#[tokio::test]
async fn test_request_returns_reply_message() {
    let (addr, mut seen) = common::start_mock_backend(Reply {
        status: 200,
        headers: vec![("x-reply", "yes")],
        body: "pong".into(),
    })
    .await;

    let protocol = Protocol::builder()
        .target(&format!("http://{}/events", addr))
        .header("x-tenant", "blue")
        .build()
        .unwrap();

    let (message, finishes) = Tracked::new(event("1", "ping"));
    let mut reply = protocol.request(&Context::new(), message).await.unwrap();

    assert_eq!(reply.headers().get("x-reply").unwrap(), "yes");
    assert_eq!(&reply.read_body().await.unwrap()[..], b"pong");
    Box::new(reply).finish(None).unwrap();

    let captured = seen.recv().await.unwrap();
    assert_eq!(captured.request_line(), "POST /events HTTP/1.1");
    assert_eq!(captured.header("ce-id").as_deref(), Some("1"));
    assert_eq!(captured.header("ce-specversion").as_deref(), Some("1.0"));
    assert_eq!(captured.header("x-tenant").as_deref(), Some("blue"));
    assert_eq!(captured.body, b"ping");

    assert_eq!(*finishes.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_non_2xx_is_an_error() {
    let (addr, _seen) = common::start_mock_backend(Reply::status(404, "missing")).await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let (message, finishes) = Tracked::new(event("2", "x"));
    let err = protocol.request(&Context::new(), message).await.unwrap_err();

    assert!(matches!(err, ProtocolError::UpstreamStatus { code: 404, .. }));
    let text = err.to_string();
    assert!(text.contains("404"), "{}", text);
    assert!(text.contains("Not Found"), "{}", text);

    // The input message saw the same failure, exactly once
    assert_eq!(*finishes.lock().unwrap(), vec![Some(text)]);
}

#[tokio::test]
async fn test_server_error_through_send() {
    let (addr, _seen) = common::start_mock_backend(Reply::status(503, "busy")).await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let err = protocol
        .send(&Context::new(), Box::new(event("3", "x")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "503 Service Unavailable");
}

#[tokio::test]
async fn test_send_drains_reply_so_connection_is_reused() {
    let (addr, connections) = common::start_keep_alive_backend("a reply nobody reads").await;
    let client = Client::builder(TokioExecutor::new()).build_http();
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .client(client)
        .build()
        .unwrap();

    let (first, first_finishes) = Tracked::new(event("10", "x"));
    protocol.send(&Context::new(), first).await.unwrap();
    // Let the client park the connection in its pool
    tokio::time::sleep(Duration::from_millis(50)).await;
    protocol.send(&Context::new(), Box::new(event("11", "y"))).await.unwrap();

    assert_eq!(*first_finishes.lock().unwrap(), vec![None]);
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_url_is_uninitialized() {
    let protocol = Protocol::builder().build().unwrap();

    let (message, finishes) = Tracked::new(event("4", "x"));
    let err = protocol.request(&Context::new(), message).await.unwrap_err();

    assert!(matches!(err, ProtocolError::Uninitialized(_)));
    assert_eq!(finishes.lock().unwrap().len(), 1);
    assert!(finishes.lock().unwrap()[0].is_some());
}

#[tokio::test]
async fn test_context_target_wins() {
    let (configured, mut configured_seen) = common::start_mock_backend(Reply::status(200, "")).await;
    let (override_addr, mut override_seen) = common::start_mock_backend(Reply::status(200, "")).await;

    let protocol = Protocol::builder()
        .target(&format!("http://{}/configured", configured))
        .build()
        .unwrap();

    let ctx = Context::new().with_target(format!("http://{}/override", override_addr).parse().unwrap());
    protocol.send(&ctx, Box::new(event("5", "x"))).await.unwrap();

    let captured = override_seen.recv().await.unwrap();
    assert_eq!(captured.request_line(), "POST /override HTTP/1.1");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(configured_seen.try_recv().is_err());
}

#[tokio::test]
async fn test_serialization_failure_skips_network() {
    let (addr, mut seen) = common::start_mock_backend(Reply::status(200, "")).await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    // No ce-specversion and no structured content type
    let (message, finishes) = Tracked::new(HttpMessage::new(HeaderMap::new(), Body::from("raw")));
    let err = protocol.request(&Context::new(), message).await.unwrap_err();

    assert!(matches!(err, ProtocolError::UnknownEncoding));
    assert_eq!(
        *finishes.lock().unwrap(),
        vec![Some(ProtocolError::UnknownEncoding.to_string())]
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(seen.try_recv().is_err());
}

#[tokio::test]
async fn test_transport_failure() {
    let addr = common::closed_port().await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let (message, finishes) = Tracked::new(event("6", "x"));
    let err = protocol.request(&Context::new(), message).await.unwrap_err();

    assert!(matches!(err, ProtocolError::Transport(_)), "{:?}", err);
    assert_eq!(finishes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancellation_finishes_message() {
    let (addr, _seen) = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Reply::status(200, "late")
    })
    .await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let ctx = Context::new().with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let (message, finishes) = Tracked::new(event("7", "x"));
    let err = protocol.request(&ctx, message).await.unwrap_err();

    assert!(matches!(err, ProtocolError::Cancelled));
    assert_eq!(*finishes.lock().unwrap(), vec![Some("request cancelled".to_string())]);
}

#[tokio::test]
async fn test_timeout() {
    let (addr, _seen) = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Reply::status(200, "late")
    })
    .await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let ctx = Context::new().with_timeout(Duration::from_millis(50));
    let err = protocol.send(&ctx, Box::new(event("8", "x"))).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout(_)));
}

#[tokio::test]
async fn test_abandoned_request_still_finishes() {
    let (addr, _seen) = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Reply::status(200, "late")
    })
    .await;
    let protocol = Protocol::builder()
        .target(&format!("http://{}/", addr))
        .build()
        .unwrap();

    let (message, finishes) = Tracked::new(event("9", "x"));
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        protocol.request(&Context::new(), message),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(*finishes.lock().unwrap(), vec![Some("request cancelled".to_string())]);
}
