//! # Test Harness
//!
//! Drives a [`Dispatcher`] in-process, with no listener or socket involved.
//! Requests go through exactly the same matching, validation, handler and
//! serialisation path as production traffic.
//!
//! ```rust
//! use schemagate::api::Api;
//! use schemagate::dispatcher::Dispatcher;
//! use schemagate::router::Route;
//! use schemagate::testing::TestClient;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut builder = Api::builder("Demo", "1.0.0");
//! builder
//!     .route(Route::new(Method::GET, "/", |_req| Ok(json!({ "Hello": "World" }))))
//!     .unwrap();
//! let client = TestClient::new(Dispatcher::new(Arc::new(builder.build())));
//!
//! let resp = client.get("/");
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.json(), json!({ "Hello": "World" }));
//! assert!(resp.has_header("x-request-id"));
//! ```

use crate::dispatcher::{Dispatcher, HeaderVec, RawRequest, RawResponse};
use serde_json::Value;

/// In-process client for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Dispatcher,
    default_headers: Vec<(String, String)>,
}

/// Captured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl From<RawResponse> for TestResponse {
    fn from(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
        }
    }
}

impl TestResponse {
    /// Body parsed as JSON.
    ///
    /// # Panics
    ///
    /// If the body is not valid JSON, with the raw text in the message.
    #[must_use]
    pub fn json(&self) -> Value {
        match serde_json::from_slice(&self.body) {
            Ok(value) => value,
            Err(e) => panic!("response body is not JSON ({e}): {}", self.text()),
        }
    }

    /// Body as UTF-8 text, lossily decoded
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl TestClient {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Header added to every subsequent request
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn request(&self, method: &str, path: &str) -> RawRequest {
        let mut raw = RawRequest::new(method, path);
        raw.headers.extend(self.default_headers.iter().cloned());
        raw
    }

    /// Send a request whose optional body is encoded as JSON.
    #[must_use]
    pub fn simulate(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let raw = self.request(method, path);
        let raw = match body {
            Some(value) => raw.json(&value),
            None => raw,
        };
        self.send(raw)
    }

    /// Send arbitrary bytes with an explicit content type.
    #[must_use]
    pub fn simulate_raw(
        &self,
        method: &str,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> TestResponse {
        let raw = self
            .request(method, path)
            .header("content-type", content_type)
            .body(body);
        self.send(raw)
    }

    /// Send a fully built request.
    #[must_use]
    pub fn send(&self, raw: RawRequest) -> TestResponse {
        self.dispatcher.handle(raw).into()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> TestResponse {
        self.simulate("GET", path, None)
    }

    #[must_use]
    pub fn post(&self, path: &str, body: Value) -> TestResponse {
        self.simulate("POST", path, Some(body))
    }

    #[must_use]
    pub fn put(&self, path: &str, body: Value) -> TestResponse {
        self.simulate("PUT", path, Some(body))
    }

    #[must_use]
    pub fn delete(&self, path: &str) -> TestResponse {
        self.simulate("DELETE", path, None)
    }
}
