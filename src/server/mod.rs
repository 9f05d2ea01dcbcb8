//! # Server Module
//!
//! Thin `may_minihttp` transport in front of [`Dispatcher`](crate::dispatcher::Dispatcher).
//! Each connection runs in a `may` coroutine; the service converts the wire request
//! into a [`RawRequest`](crate::dispatcher::RawRequest), hands it to the dispatcher
//! and writes the resulting status, content type and body back.

mod http_server;
mod request;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::read_request;
pub use service::{wire_content_type, AppService};
