//! # schemagate
//!
//! **schemagate** is a schema-first HTTP request core for Rust. Every route declares
//! the shape of what it accepts and returns; the dispatcher enforces those
//! declarations at the boundary and the same declarations drive the generated
//! [OpenAPI 3.1](https://spec.openapis.org/oas/v3.1.0) description.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Named schema registry and structural validation
//! - **[`router`]** - Path patterns and the route table
//! - **[`dispatcher`]** - Match, validate, invoke, serialise for one request
//! - **[`docs`]** - API description and browsable HTML page
//! - **[`testing`]** - In-process client for automated tests
//! - **[`api`]** - Immutable bundle of schemas and routes
//! - **[`server`]** - `may_minihttp` transport
//! - **[`config`]**, **[`runtime_config`]**, **[`logging`]** - Service plumbing
//! - **[`ledger`]** - Reference bank ledger service
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Routes as RouteTable
//!     participant Schemas as SchemaRegistry
//!     participant Handler
//!
//!     Client->>Server: POST /transactions
//!     Server->>Dispatcher: handle(RawRequest)
//!     alt body larger than max_body_bytes
//!         Dispatcher-->>Client: 413 payload_too_large
//!     end
//!     Dispatcher->>Routes: match_route(POST, "/transactions")
//!     alt no route, not a built-in endpoint
//!         Dispatcher-->>Client: 404 not_found
//!     end
//!     Dispatcher->>Schemas: validate path, query, body
//!     alt any violation
//!         Dispatcher-->>Client: 422 validation_error (all violations)
//!     end
//!     Dispatcher->>Handler: handler(&HandlerRequest)
//!     alt HandlerError::Status
//!         Dispatcher-->>Client: declared status + {detail}
//!     else fault or panic
//!         Dispatcher-->>Client: 500 internal_error
//!     end
//!     Dispatcher->>Schemas: validate output
//!     alt output violates schema
//!         Dispatcher-->>Client: 500 internal_error
//!     end
//!     Dispatcher-->>Client: success status + JSON body
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use schemagate::api::Api;
//! use schemagate::dispatcher::Dispatcher;
//! use schemagate::router::Route;
//! use schemagate::schema::{Field, FieldType, Schema};
//! use schemagate::testing::TestClient;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut builder = Api::builder("Items", "1.0.0");
//! let item = builder
//!     .schema(
//!         "Item",
//!         Schema::new()
//!             .field(Field::required("id", FieldType::Integer))
//!             .field(Field::required("name", FieldType::String)),
//!     )
//!     .unwrap();
//! builder
//!     .route(
//!         Route::new(Method::GET, "/items/{id}", |req| {
//!             Ok(json!({ "id": req.path_param_i64("id")?, "name": "widget" }))
//!         })
//!         .path_param("id", FieldType::Integer)
//!         .output(FieldType::of(&item)),
//!     )
//!     .unwrap();
//!
//! let client = TestClient::new(Dispatcher::new(Arc::new(builder.build())));
//! assert_eq!(client.get("/items/42").json(), json!({ "id": 42, "name": "widget" }));
//! assert_eq!(client.get("/items/abc").status, 422);
//! ```
//!
//! ## Runtime Considerations
//!
//! The HTTP transport uses the `may` coroutine runtime, not tokio:
//!
//! - Each connection runs in a coroutine; handlers run to completion on it
//! - Stack size is configurable via the `SCHEMAGATE_STACK_SIZE` environment variable
//! - Blocking inside a handler blocks only that coroutine's worker
//!
//! The dispatcher itself is transport-neutral: [`dispatcher::Dispatcher::handle`]
//! takes a [`dispatcher::RawRequest`] and can be driven from any server.

pub mod api;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod docs;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod schema;
pub mod server;
pub mod testing;

pub use api::{Api, ApiBuilder};
pub use dispatcher::{Dispatcher, HandlerError, HandlerRequest, RawRequest, RawResponse};
pub use error::{BuildError, ErrorKind};
pub use router::Route;
pub use schema::{Field, FieldType, Schema, SchemaRegistry};
