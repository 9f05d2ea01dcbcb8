//! Dispatcher core module - hot path for request dispatch.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::request::{content_type_of, is_json_content_type, parse_query, split_target};
use crate::api::Api;
use crate::docs::{render_interactive, DocsCache};
use crate::error::ErrorKind;
use crate::ids::RequestId;
use crate::router::RouteMatch;
use crate::schema::{Location, Violation};
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use smallvec::SmallVec;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header carrying the request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What a handler returns: a JSON body for the route's success status, or an error.
pub type HandlerResult = Result<Value, HandlerError>;

/// Shared handler function
pub type Handler = Arc<dyn Fn(&HandlerRequest) -> HandlerResult + Send + Sync>;

/// Failure raised by a handler.
///
/// `Status` is a declared, expected outcome surfaced verbatim to the caller.
/// `Fault` is anything else: it is logged and the caller only sees a generic 500.
#[derive(Debug)]
pub enum HandlerError {
    Status { status: u16, message: String },
    Fault(anyhow::Error),
}

impl HandlerError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        HandlerError::Status {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// Wrap an unexpected failure
    #[must_use]
    pub fn fault(err: impl Into<anyhow::Error>) -> Self {
        HandlerError::Fault(err.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Status { status, message } => write!(f, "{status}: {message}"),
            HandlerError::Fault(e) => write!(f, "handler fault: {e:#}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        HandlerError::Fault(e)
    }
}

/// Validated request data passed to a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without query string
    pub path: String,
    /// Path parameters, typed per the route declaration
    pub path_params: Map<String, Value>,
    /// Query parameters, typed per the route declaration
    pub query_params: Map<String, Value>,
    /// Request headers (lowercase names)
    pub headers: HeaderVec,
    /// Validated body when the route declares an input; otherwise any JSON body sent
    pub body: Option<Value>,
}

impl HandlerRequest {
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&Value> {
        self.path_params.get(name)
    }

    /// Integer path parameter (declared `FieldType::Integer`)
    ///
    /// # Errors
    ///
    /// A fault if the parameter is absent or not an integer, which means the route
    /// declaration and the handler disagree.
    pub fn path_param_i64(&self, name: &str) -> Result<i64, HandlerError> {
        self.path_param(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| HandlerError::fault(anyhow::anyhow!("path parameter '{name}' is not an integer")))
    }

    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query_params.get(name)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the (already validated) body into `T`.
    ///
    /// # Errors
    ///
    /// A declared 422 when there is no body; a fault when the validated body does not
    /// fit `T`, since that means the schema and the type disagree.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| HandlerError::new(422, "request body required"))?;
        serde_json::from_value(body).map_err(HandlerError::fault)
    }
}

/// Transport-neutral inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    pub method: String,
    /// Path plus optional `?query`
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: Vec<u8>) -> Self {
        self.body = bytes;
        self
    }

    /// JSON body with matching content type
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string().into_bytes())
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport-neutral outbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, "application/json", body.to_string().into_bytes())
    }

    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Paths for the endpoints the dispatcher serves itself. `None` disables one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinEndpoints {
    pub health: Option<String>,
    pub openapi_json: Option<String>,
    pub openapi_yaml: Option<String>,
    pub docs: Option<String>,
}

impl Default for BuiltinEndpoints {
    fn default() -> Self {
        Self {
            health: Some("/health".to_string()),
            openapi_json: Some("/openapi.json".to_string()),
            openapi_yaml: Some("/openapi.yaml".to_string()),
            docs: Some("/docs".to_string()),
        }
    }
}

impl BuiltinEndpoints {
    /// No built-in endpoints
    #[must_use]
    pub fn none() -> Self {
        Self {
            health: None,
            openapi_json: None,
            openapi_yaml: None,
            docs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Larger bodies are rejected with 413 before routing
    pub max_body_bytes: usize,
    pub builtins: BuiltinEndpoints,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            builtins: BuiltinEndpoints::default(),
        }
    }
}

/// Matches, validates, invokes and serialises a single request.
///
/// Cloning is cheap; the route table and schema registry are shared read-only.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<Api>,
    config: Arc<DispatcherConfig>,
    docs: Arc<DocsCache>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.api.routes().len())
            .field("schemas", &self.api.schemas().len())
            .field("config", &self.config)
            .finish()
    }
}

/// Outcome of running the pipeline for one matched request
enum Outcome {
    Success(u16, Value),
    Failure(ErrorKind, u16, Value),
}

impl Dispatcher {
    #[must_use]
    pub fn new(api: Arc<Api>) -> Self {
        Self::with_config(api, DispatcherConfig::default())
    }

    #[must_use]
    pub fn with_config(api: Arc<Api>, config: DispatcherConfig) -> Self {
        info!(
            routes = api.routes().len(),
            schemas = api.schemas().len(),
            max_body_bytes = config.max_body_bytes,
            "Dispatcher ready"
        );
        Self {
            api,
            config: Arc::new(config),
            docs: Arc::new(DocsCache::new()),
        }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn docs(&self) -> &DocsCache {
        &self.docs
    }

    /// Handle one request end to end. Every branch produces an explicit response.
    #[must_use]
    pub fn handle(&self, raw: RawRequest) -> RawResponse {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(raw.get_header(REQUEST_ID_HEADER));
        let (path, query) = split_target(&raw.target);
        let path = path.to_string();

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %raw.method,
            path = %path
        );
        let _enter = span.enter();

        let (kind, mut response) = self.dispatch(&raw, &path, query, request_id);
        response.set_header(REQUEST_ID_HEADER, request_id.to_string());

        let duration_us = start.elapsed().as_micros();
        match kind {
            Some(k) if k.is_defect() => error!(
                status = response.status,
                error_kind = %k,
                duration_us,
                "Request failed with server defect"
            ),
            Some(k) => debug!(
                status = response.status,
                error_kind = %k,
                duration_us,
                "Request rejected"
            ),
            None => info!(status = response.status, duration_us, "Request completed"),
        }
        response
    }

    fn dispatch(
        &self,
        raw: &RawRequest,
        path: &str,
        query: Option<&str>,
        request_id: RequestId,
    ) -> (Option<ErrorKind>, RawResponse) {
        if raw.body.len() > self.config.max_body_bytes {
            warn!(
                body_size = raw.body.len(),
                max_body_bytes = self.config.max_body_bytes,
                "Request body too large"
            );
            return (
                Some(ErrorKind::PayloadTooLarge),
                RawResponse::json(
                    413,
                    &json!({
                        "error": ErrorKind::PayloadTooLarge.as_str(),
                        "max_body_bytes": self.config.max_body_bytes,
                    }),
                ),
            );
        }

        let method = Method::from_bytes(raw.method.as_bytes()).ok();
        let matched = method
            .as_ref()
            .and_then(|m| self.api.routes().match_route(m, path));

        let Some(matched) = matched else {
            if let Some(resp) = method
                .filter(|m| *m == Method::GET)
                .and_then(|_| self.builtin(path))
            {
                return (None, resp);
            }
            return (
                Some(ErrorKind::RouteNotFound),
                RawResponse::json(
                    404,
                    &json!({
                        "error": ErrorKind::RouteNotFound.as_str(),
                        "path": path,
                        "method": raw.method,
                    }),
                ),
            );
        };

        match self.run(raw, path, query, request_id, &matched) {
            Outcome::Success(status, body) => (None, RawResponse::json(status, &body)),
            Outcome::Failure(kind, status, body) => (Some(kind), RawResponse::json(status, &body)),
        }
    }

    fn run(
        &self,
        raw: &RawRequest,
        path: &str,
        query: Option<&str>,
        request_id: RequestId,
        matched: &RouteMatch,
    ) -> Outcome {
        let route = matched.route();
        let schemas = self.api.schemas();
        let mut violations: Vec<Violation> = Vec::new();

        let path_params = schemas.validate_params(
            &route.path_params,
            matched.path_params.iter().map(|(k, v)| (&**k, v.as_str())),
            Location::Path,
            &mut violations,
        );
        let query_params = schemas.validate_params(
            &route.query_params,
            query.map(parse_query).unwrap_or_default(),
            Location::Query,
            &mut violations,
        );

        let content_type = content_type_of(raw);
        let body = match &route.input {
            Some(input) => {
                if raw.body.is_empty() {
                    violations.push(Violation::new(Location::Body, "$", "request body required"));
                    None
                } else if content_type.is_some_and(|ct| !is_json_content_type(ct)) {
                    violations.push(Violation::new(
                        Location::Body,
                        "$",
                        format!(
                            "unsupported content type '{}', expected application/json",
                            content_type.unwrap_or_default()
                        ),
                    ));
                    None
                } else {
                    match serde_json::from_slice::<Value>(&raw.body) {
                        Ok(value) => match schemas.validate_at(input, value, Location::Body) {
                            Ok(valid) => Some(valid),
                            Err(e) => {
                                violations.extend(e.violations);
                                None
                            }
                        },
                        Err(e) => {
                            violations.push(Violation::new(
                                Location::Body,
                                "$",
                                format!("invalid JSON: {e}"),
                            ));
                            None
                        }
                    }
                }
            }
            None => serde_json::from_slice::<Value>(&raw.body).ok(),
        };

        if !violations.is_empty() {
            debug!(
                violation_count = violations.len(),
                violations = ?violations,
                "Request validation failed"
            );
            return Outcome::Failure(
                ErrorKind::ValidationError,
                422,
                json!({
                    "error": ErrorKind::ValidationError.as_str(),
                    "violations": violations,
                }),
            );
        }

        let request = HandlerRequest {
            request_id,
            method: route.method.clone(),
            path: path.to_string(),
            path_params,
            query_params,
            headers: raw
                .headers
                .iter()
                .map(|(k, v)| (Arc::from(k.to_ascii_lowercase().as_str()), v.clone()))
                .collect(),
            body,
        };

        let handler = Arc::clone(route.handler());
        let result = match catch_unwind(AssertUnwindSafe(|| handler(&request))) {
            Ok(result) => result,
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    operation_id = %route.operation_id,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                return internal_error(ErrorKind::UnhandledFault, request_id);
            }
        };

        let value = match result {
            Ok(value) => value,
            Err(HandlerError::Status { status, message }) => {
                if !(400..600).contains(&status) {
                    error!(
                        operation_id = %route.operation_id,
                        status,
                        "Handler declared a non-error status code"
                    );
                    return internal_error(ErrorKind::UnhandledFault, request_id);
                }
                debug!(status, message = %message, "Handler returned declared error");
                return Outcome::Failure(
                    ErrorKind::HandlerError,
                    status,
                    json!({ "detail": message }),
                );
            }
            Err(HandlerError::Fault(err)) => {
                error!(
                    operation_id = %route.operation_id,
                    error = %format!("{err:#}"),
                    "Handler fault"
                );
                return internal_error(ErrorKind::UnhandledFault, request_id);
            }
        };

        let value = match &route.output {
            Some(output) => match schemas.validate_type(output, value) {
                Ok(valid) => valid,
                Err(e) => {
                    error!(
                        operation_id = %route.operation_id,
                        violations = ?e.violations,
                        "Handler response violates declared output schema"
                    );
                    return internal_error(ErrorKind::ContractViolation, request_id);
                }
            },
            None => value,
        };

        Outcome::Success(route.status, value)
    }

    fn builtin(&self, path: &str) -> Option<RawResponse> {
        let builtins = &self.config.builtins;
        let is = |p: &Option<String>| p.as_deref() == Some(path);

        if is(&builtins.health) {
            return Some(RawResponse::json(200, &json!({ "status": "ok" })));
        }
        if is(&builtins.openapi_json) {
            let description = self.docs.get(&self.api);
            return Some(match description.to_json() {
                Ok(body) => RawResponse::new(200, "application/json", body.into_bytes()),
                Err(e) => docs_failure(&e),
            });
        }
        if is(&builtins.openapi_yaml) {
            let description = self.docs.get(&self.api);
            return Some(match description.to_yaml() {
                Ok(body) => RawResponse::new(200, "text/yaml", body.into_bytes()),
                Err(e) => docs_failure(&e),
            });
        }
        if is(&builtins.docs) {
            let description = self.docs.get(&self.api);
            return Some(match render_interactive(&description, builtins.openapi_json.as_deref()) {
                Ok(html) => RawResponse::new(200, "text/html; charset=utf-8", html.into_bytes()),
                Err(e) => docs_failure(&e),
            });
        }
        None
    }
}

fn internal_error(kind: ErrorKind, request_id: RequestId) -> Outcome {
    Outcome::Failure(
        kind,
        500,
        json!({
            "error": kind.as_str(),
            "request_id": request_id.to_string(),
        }),
    )
}

fn docs_failure(err: &anyhow::Error) -> RawResponse {
    error!(error = %format!("{err:#}"), "Failed to render API documentation");
    RawResponse::json(500, &json!({ "error": ErrorKind::UnhandledFault.as_str() }))
}
