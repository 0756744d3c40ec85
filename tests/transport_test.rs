//! Real transports against a local mock HTTP backend.

mod common;

use std::sync::Arc;

use common::start_mock_backend;
use fetch_dispatch::normalize::ALT_TRANSPORT_FLAG;
use fetch_dispatch::transport::{BlockingSessionFactory, ReqwestTransport};
use fetch_dispatch::{DispatchConfig, DispatchError, Dispatcher, Request, ResponseKind, Route};

fn dispatcher(config: &DispatchConfig) -> Dispatcher {
    let default = Arc::new(ReqwestTransport::new(&config.default_transport).unwrap());
    let factory = Arc::new(BlockingSessionFactory::new(config.session.clone()));
    Dispatcher::new(default, factory, config)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_default_transport_round_trip() {
    let (addr, captured) = start_mock_backend(
        "200 OK",
        "Content-Type: application/json\r\n",
        br#"{"ok":true}"#,
    )
    .await;
    let dispatcher = dispatcher(&DispatchConfig::default());

    let request = Request::builder("get", format!("http://{}/api", addr))
        .header("X-Probe", "default")
        .build()
        .unwrap();
    let response = dispatcher.dispatch(request).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.kind(), ResponseKind::Json);
    assert_eq!(response.body().as_ref(), br#"{"ok":true}"#);
    assert!(response.flags().is_empty());

    let heads = captured.lock().unwrap();
    assert_eq!(heads.len(), 1);
    assert!(heads[0].starts_with("GET /api HTTP/1.1"));
    assert!(heads[0].to_ascii_lowercase().contains("x-probe: default"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alternate_transport_round_trip() {
    let (addr, captured) = start_mock_backend(
        "200 OK",
        "Content-Type: text/html; charset=utf-8\r\nX-Upstream: mock\r\n",
        b"<html><body>hello</body></html>",
    )
    .await;
    let dispatcher = dispatcher(&DispatchConfig::default());
    dispatcher.start().await.unwrap();

    let request = Request::builder("GET", format!("http://{}/page", addr))
        .meta("tls", true)
        .header("X-Probe", "alternate")
        .cookie("b", "2")
        .cookie("a", "1")
        .build()
        .unwrap();
    let response = dispatcher.dispatch(request).await.unwrap();
    dispatcher.close().await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.kind(), ResponseKind::Html);
    assert_eq!(response.headers().get("x-upstream"), Some("mock"));
    assert_eq!(response.text().as_deref(), Some("<html><body>hello</body></html>"));
    assert!(response.has_flag(ALT_TRANSPORT_FLAG));
    assert_eq!(response.url().path(), "/page");

    let heads = captured.lock().unwrap();
    assert_eq!(heads.len(), 1);
    let head = heads[0].to_ascii_lowercase();
    assert!(head.contains("x-probe: alternate"));
    assert!(head.contains("cookie: a=1; b=2"));
    assert!(!head.contains("user-agent:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alternate_transport_sends_configured_user_agent() {
    let (addr, captured) = start_mock_backend("200 OK", "", b"").await;
    let mut config = DispatchConfig::default();
    config.session.user_agent = Some("fetch-dispatch-test/1.0".into());
    let dispatcher = dispatcher(&config);
    dispatcher.start().await.unwrap();

    let request = Request::builder("GET", format!("http://{}/", addr))
        .alternate_transport(true)
        .build()
        .unwrap();
    let response = dispatcher.dispatch(request).await.unwrap();
    dispatcher.close().await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.body().is_empty());
    let heads = captured.lock().unwrap();
    assert!(heads[0]
        .to_ascii_lowercase()
        .contains("user-agent: fetch-dispatch-test/1.0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_backend_reports_route() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = DispatchConfig::default();
    config.session.timeout_secs = 2;
    config.session.connect_timeout_secs = 1;
    config.default_transport.timeout_secs = 2;
    config.default_transport.connect_timeout_secs = 1;
    let dispatcher = dispatcher(&config);
    dispatcher.start().await.unwrap();

    let url = format!("http://{}/", addr);
    let err = dispatcher
        .dispatch(Request::builder("GET", &url).meta("tls", 1).build().unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.route(), Some(Route::Alternate));
    assert!(matches!(err, DispatchError::Transport { .. }));

    let err = dispatcher
        .dispatch(Request::get(&url).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.route(), Some(Route::Default));

    dispatcher.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alternate_transport_merges_jar_and_request_cookies() {
    let (addr, captured) =
        start_mock_backend("200 OK", "Set-Cookie: jar=1; Path=/\r\n", b"ok").await;
    let dispatcher = dispatcher(&DispatchConfig::default());
    dispatcher.start().await.unwrap();
    let url = format!("http://{}/", addr);

    let plain = Request::builder("GET", &url).meta("tls", true).build().unwrap();
    dispatcher.dispatch(plain).await.unwrap();

    let with_cookie = Request::builder("GET", &url)
        .meta("tls", true)
        .cookie("a", "1")
        .build()
        .unwrap();
    dispatcher.dispatch(with_cookie).await.unwrap();

    let overriding = Request::builder("GET", &url)
        .meta("tls", true)
        .cookie("jar", "2")
        .build()
        .unwrap();
    dispatcher.dispatch(overriding).await.unwrap();
    dispatcher.close().await;

    let heads: Vec<String> = captured
        .lock()
        .unwrap()
        .iter()
        .map(|head| head.to_ascii_lowercase())
        .collect();
    assert_eq!(heads.len(), 3);
    assert!(!heads[0].contains("cookie:"));
    assert!(heads[1].contains("cookie: jar=1; a=1\r\n"));
    assert!(heads[2].contains("cookie: jar=2\r\n"));
    assert!(!heads[2].contains("jar=1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alternate_transport_without_cookie_store() {
    let (addr, captured) =
        start_mock_backend("200 OK", "Set-Cookie: jar=1; Path=/\r\n", b"ok").await;
    let mut config = DispatchConfig::default();
    config.session.cookie_store = false;
    let dispatcher = dispatcher(&config);
    dispatcher.start().await.unwrap();
    let url = format!("http://{}/", addr);

    for _ in 0..2 {
        let request = Request::builder("GET", &url)
            .meta("tls", true)
            .cookie("a", "1")
            .build()
            .unwrap();
        dispatcher.dispatch(request).await.unwrap();
    }
    dispatcher.close().await;

    let heads = captured.lock().unwrap();
    assert_eq!(heads.len(), 2);
    assert!(heads[1].to_ascii_lowercase().contains("cookie: a=1\r\n"));
}
