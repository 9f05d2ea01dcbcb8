//! # Dispatcher Module
//!
//! The dispatcher turns one transport-neutral [`RawRequest`] into one [`RawResponse`].
//!
//! ## Request Flow
//!
//! 1. The route table is consulted; no match yields `404 {error: "not_found", path, method}`
//!    (after checking the built-in health and documentation endpoints).
//! 2. Path and query parameters are coerced to their declared types and validated; the
//!    body, when the route declares an input type, is parsed as JSON and validated.
//!    All violations across path, query and body are returned together as a `422`.
//! 3. The handler runs with the validated [`HandlerRequest`]. A declared
//!    [`HandlerError::Status`] in the 4xx/5xx range is returned verbatim as `{detail}`
//!    with its status; any other declared status, a [`HandlerError::Fault`] or a panic
//!    becomes a generic `500`.
//! 4. When the route declares an output type the handler's value is validated against
//!    it; a mismatch is a server defect and also becomes a generic `500`.
//! 5. The value is serialised with the route's success status.
//!
//! Every response carries an `x-request-id` header. Server defects are logged at
//! `error` with that id; client errors are logged at `debug` only.
//!
//! ## Concurrency
//!
//! [`Dispatcher`] is `Clone + Send + Sync`. The route table and schema registry are
//! immutable after construction and shared behind `Arc`, so any number of workers can
//! call [`Dispatcher::handle`] concurrently without locking.

mod core;
mod request;

pub use self::core::{
    BuiltinEndpoints, Dispatcher, DispatcherConfig, Handler, HandlerError, HandlerRequest,
    HandlerResult, HeaderVec, RawRequest, RawResponse, MAX_INLINE_HEADERS, REQUEST_ID_HEADER,
};
pub use self::request::{is_json_content_type, parse_query, split_target};
