//! The dispatcher behind a real `may_minihttp` listener.

mod common;

use common::items_api;
use schemagate::config::ServiceConfig;
use schemagate::dispatcher::{Dispatcher, DispatcherConfig};
use schemagate::ledger::{build_api, LedgerStore};
use schemagate::server::{AppService, HttpServer, ServerHandle};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

fn start(dispatcher: Dispatcher) -> ServerHandle {
    may::config().set_stack_size(0x8000);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let handle = HttpServer(AppService::new(dispatcher)).start(addr).unwrap();
    handle.wait_ready().unwrap();
    handle
}

/// Writes `req` and reads one response: headers, then `Content-Length` bytes.
fn send_request(addr: SocketAddr, req: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();

    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        if let Some(end) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = content_length(&head);
            if buf.len() >= end + 4 + length {
                let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).to_string();
                let status = head
                    .lines()
                    .next()
                    .and_then(|l| l.split_whitespace().nth(1))
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                return (status, head, body);
            }
        }
        match stream.read(&mut tmp) {
            Ok(0) => panic!("connection closed early: {}", String::from_utf8_lossy(&buf)),
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(e) => panic!("read error: {e:?}"),
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse().ok())
        .unwrap_or(0)
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap()
}

#[test]
fn test_get_over_the_wire() {
    let server = start(Dispatcher::new(Arc::new(items_api())));
    let (status, head, body) = send_request(
        server.local_addr(),
        "GET /items/7 HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    server.stop();

    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("content-type: application/json"));
    assert_eq!(json(&body), serde_json::json!({ "id": 7, "name": "widget" }));
}

#[test]
fn test_validation_failure_over_the_wire() {
    let server = start(Dispatcher::new(Arc::new(items_api())));
    let payload = r#"{"name": 5}"#;
    let req = format!(
        "POST /items HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    let (status, _head, body) = send_request(server.local_addr(), &req);
    server.stop();

    assert_eq!(status, 422);
    let body = json(&body);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["violations"][0]["field"], "name");
}

#[test]
fn test_unknown_route_over_the_wire() {
    let server = start(Dispatcher::new(Arc::new(items_api())));
    let (status, _head, body) = send_request(
        server.local_addr(),
        "GET /nowhere HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    server.stop();

    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"], "not_found");
}

#[test]
fn test_body_limit_over_the_wire() {
    let config = DispatcherConfig {
        max_body_bytes: 16,
        ..DispatcherConfig::default()
    };
    let server = start(Dispatcher::with_config(Arc::new(items_api()), config));
    let payload = r#"{"name": "a name well past sixteen bytes"}"#;
    let req = format!(
        "POST /items HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    let (status, _head, _body) = send_request(server.local_addr(), &req);
    server.stop();

    assert_eq!(status, 413);
}

#[test]
fn test_docs_page_over_the_wire() {
    let store = Arc::new(LedgerStore::with_demo_accounts());
    let api = build_api(store, &ServiceConfig::default()).unwrap();
    let server = start(Dispatcher::new(Arc::new(api)));
    let (status, head, body) = send_request(
        server.local_addr(),
        "GET /docs HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    let (health, _, _) = send_request(
        server.local_addr(),
        "GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    server.stop();

    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("text/html"));
    assert!(body.contains("id=\"op-process_transaction\""));
    assert_eq!(health, 200);
}
