//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::HeaderMap;
use event_http_protocol::{Encoding, HttpMessage, Message, ProtocolError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim().to_string())
        })
    }

    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or("")
    }
}

/// What the mock backend answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every received request is forwarded on the returned channel.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>)
where
    F: Fn(Captured) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = Arc::clone(&f);
            let tx = tx.clone();
            tokio::spawn(async move {
                handle(socket, f, tx).await;
            });
        }
    });

    (addr, rx)
}

/// Start a mock backend that always gives the same answer.
pub async fn start_mock_backend(reply: Reply) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    start_programmable_backend(move |_| {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Keep-alive backend answering every request with `200` and `body`.
///
/// Returns the number of accepted connections.
pub async fn start_keep_alive_backend(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let accepted = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                while read_request(&mut socket, &mut buf).await.is_some() {
                    if write_reply(&mut socket, &Reply::status(200, body), true).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (addr, connections)
}

async fn handle<F, Fut>(mut socket: TcpStream, f: Arc<F>, tx: mpsc::UnboundedSender<Captured>)
where
    F: Fn(Captured) -> Fut,
    Fut: Future<Output = Reply>,
{
    let mut buf = Vec::new();
    let Some(captured) = read_request(&mut socket, &mut buf).await else {
        return;
    };

    let _ = tx.send(captured.clone());
    let reply = f(captured).await;
    let _ = write_reply(&mut socket, &reply, false).await;
    let _ = socket.shutdown().await;
}

/// Read one request; bytes past it stay in `buf`.
async fn read_request(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<Captured> {
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf[..], b"\r\n\r\n") {
            break pos;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    buf.drain(..head_end + 4);
    let mut captured = Captured { head, body: Vec::new() };

    let length: usize = captured
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let available = length.min(buf.len());
    captured.body = buf.drain(..available).collect();
    Some(captured)
}

async fn write_reply(socket: &mut TcpStream, reply: &Reply, keep_alive: bool) -> std::io::Result<()> {
    let reason = axum::http::StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut response = format!("HTTP/1.1 {} {}\r\n", reply.status, reason);
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !keep_alive {
        response.push_str("Connection: close\r\n");
    }
    response.push_str(&format!(
        "Content-Length: {}\r\n\r\n{}",
        reply.body.len(),
        reply.body
    ));
    socket.write_all(response.as_bytes()).await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Message wrapper recording every `finish` call.
#[derive(Debug)]
pub struct Tracked {
    inner: HttpMessage,
    finishes: Arc<Mutex<Vec<Option<String>>>>,
}

impl Tracked {
    pub fn new(inner: HttpMessage) -> (Box<Self>, Arc<Mutex<Vec<Option<String>>>>) {
        let finishes = Arc::new(Mutex::new(Vec::new()));
        let tracked = Box::new(Self {
            inner,
            finishes: Arc::clone(&finishes),
        });
        (tracked, finishes)
    }
}

impl Message for Tracked {
    fn read_encoding(&self) -> Encoding {
        self.inner.read_encoding()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn take_body(&mut self) -> Option<Body> {
        self.inner.take_body()
    }

    fn finish(self: Box<Self>, err: Option<&ProtocolError>) -> Result<(), ProtocolError> {
        self.finishes.lock().unwrap().push(err.map(ToString::to_string));
        Box::new(self.inner).finish(err)
    }
}

/// A binary-mode test event.
pub fn event(id: &str, data: &str) -> HttpMessage {
    HttpMessage::binary(
        [("id", id), ("type", "com.example.test"), ("source", "/tests")],
        Some("text/plain"),
        data.to_string(),
    )
    .unwrap()
}
