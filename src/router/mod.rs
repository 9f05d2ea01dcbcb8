//! # Router Module
//!
//! The router module holds the route table: the ordered set of
//! `(method, path pattern)` bindings to handlers and their declared schemas.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing path patterns such as `/users/{id}/posts` into literal and parameter segments
//! - Rejecting duplicate `(method, pattern)` registrations
//! - Matching incoming requests to routes and extracting path parameters
//!
//! ## Matching
//!
//! Patterns are split on `/`. A literal segment must match exactly; a `{name}` segment
//! matches any non-empty segment and captures its percent-decoded value. Routes are
//! tried in registration order and the first match wins. Trailing slashes are ignored
//! on both patterns and request paths.
//!
//! ## Example
//!
//! ```rust
//! use schemagate::router::{Route, RouteTable};
//! use http::Method;
//! use serde_json::json;
//!
//! let mut table = RouteTable::new();
//! table
//!     .add(Route::new(Method::GET, "/pets/{id}", |_req| Ok(json!({}))))
//!     .unwrap();
//!
//! let matched = table.match_route(&Method::GET, "/pets/123").unwrap();
//! assert_eq!(matched.get_path_param("id"), Some("123"));
//! assert!(table.match_route(&Method::POST, "/pets/123").is_none());
//! ```

mod core;

pub use self::core::{
    normalize_path, ParamVec, PathPattern, Route, RouteEntry, RouteMatch, RouteTable,
    MAX_INLINE_PARAMS,
};
