use super::request::read_request;
use crate::dispatcher::{Dispatcher, RawResponse};
use http::StatusCode;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use tracing::warn;

/// `may_minihttp` service delegating every request to a [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct AppService {
    dispatcher: Dispatcher,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Static `Content-Type` header line for a response content type.
///
/// `may_minihttp` only accepts `'static` header lines, so content types are
/// mapped onto the fixed set the dispatcher produces.
#[must_use]
pub fn wire_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/json") => "Content-Type: application/json",
        Some("text/html") => "Content-Type: text/html; charset=utf-8",
        Some("text/yaml") => "Content-Type: text/yaml",
        Some("text/plain") => "Content-Type: text/plain; charset=utf-8",
        _ => "Content-Type: application/octet-stream",
    }
}

fn write_response(res: &mut Response, response: RawResponse) {
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    res.status_code(usize::from(response.status), reason);
    res.header(wire_content_type(response.header("content-type")));
    res.body_vec(response.body);
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let raw = match read_request(req, self.dispatcher.config().max_body_bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                write_response(
                    res,
                    RawResponse::json(400, &json!({ "error": "unreadable_body" })),
                );
                return Ok(());
            }
        };
        write_response(res, self.dispatcher.handle(raw));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_content_type() {
        assert_eq!(
            wire_content_type(Some("application/json")),
            "Content-Type: application/json"
        );
        assert_eq!(
            wire_content_type(Some("text/html; charset=utf-8")),
            "Content-Type: text/html; charset=utf-8"
        );
        assert_eq!(
            wire_content_type(None),
            "Content-Type: application/octet-stream"
        );
    }
}
