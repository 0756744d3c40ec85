//! Shared fakes and mock backends for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fetch_dispatch::http::{Headers, Request, Response, ResponseKind};
use fetch_dispatch::transport::{
    ClientSession, DefaultTransport, RawResponse, SessionFactory, TransportError,
};

/// Default transport that records every request it sees and answers 200
/// with a fixed body.
#[derive(Default)]
pub struct RecordingDefault {
    pub seen: Mutex<Vec<Arc<Request>>>,
    pub fail: AtomicBool,
}

impl RecordingDefault {
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl DefaultTransport for RecordingDefault {
    fn dispatch(&self, request: Arc<Request>) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(Arc::clone(&request));
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Connect("default backend down".into()));
            }
            let mut headers = Headers::new();
            headers.insert("X-Backend", "default");
            Ok(Response::new(
                request.url().clone(),
                StatusCode::OK,
                headers,
                Bytes::from_static(b"from default"),
                ResponseKind::Text,
                request,
            ))
        })
    }
}

/// Counters shared between a [`ScriptedFactory`] and the sessions it opens.
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub opens: AtomicUsize,
    pub executes: AtomicUsize,
    pub completions: AtomicUsize,
    pub closes: AtomicUsize,
}

impl SessionCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Session behavior for one test.
#[derive(Debug, Clone)]
pub struct Script {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: &'static [u8],
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), b"text/plain".to_vec())],
            body: b"ok",
            delay: None,
            fail: false,
        }
    }
}

pub struct ScriptedSession {
    script: Script,
    counters: Arc<SessionCounters>,
}

impl ClientSession for ScriptedSession {
    fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.counters.executes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.script.delay {
            std::thread::sleep(delay);
        }
        self.counters.completions.fetch_add(1, Ordering::SeqCst);
        if self.script.fail {
            return Err(TransportError::Timeout);
        }
        Ok(RawResponse {
            status: self.script.status,
            headers: self.script.headers.clone(),
            body: Bytes::from_static(self.script.body),
            url: request.url().to_string(),
        })
    }

    fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out [`ScriptedSession`]s.
pub struct ScriptedFactory {
    pub script: Script,
    pub counters: Arc<SessionCounters>,
    pub open_fails: bool,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            counters: Arc::new(SessionCounters::default()),
            open_fails: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: Script::default(),
            counters: Arc::new(SessionCounters::default()),
            open_fails: true,
        })
    }
}

impl SessionFactory for ScriptedFactory {
    fn open(&self) -> Result<Arc<dyn ClientSession>, TransportError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_fails {
            return Err(TransportError::Connect("session backend unreachable".into()));
        }
        Ok(Arc::new(ScriptedSession {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Poll `cond` until it holds or `deadline` passes.
pub async fn eventually(deadline: Duration, cond: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Request heads received by a mock backend, in arrival order.
pub type Captured = Arc<Mutex<Vec<String>>>;

/// Start a mock HTTP backend on an ephemeral port.
///
/// Every connection gets `status` with the given extra header lines and
/// body; the raw request head is recorded.
pub async fn start_mock_backend(
    status: &'static str,
    extra_headers: &'static str,
    body: &'static [u8],
) -> (SocketAddr, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        sink.lock().unwrap().push(head);

                        let mut response = format!(
                            "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
                            status,
                            extra_headers,
                            body.len()
                        )
                        .into_bytes();
                        response.extend_from_slice(body);
                        let _ = socket.write_all(&response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
