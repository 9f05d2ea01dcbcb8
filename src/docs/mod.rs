//! # Documentation Module
//!
//! Derives a machine-readable API description (OpenAPI 3.1 shaped JSON/YAML) and a
//! browsable HTML page from the registered routes and schemas. Generation never
//! invokes a handler.
//!
//! The dispatcher serves the description through [`DocsCache`], which regenerates
//! only when the route table revision changes.

mod generate;
mod render;

pub use generate::{
    generate, object_schema, type_schema, ApiDescription, Components, DocsCache, InfoObject,
    MediaType, Operation, Parameter, RequestBody, ResponseObject, OPENAPI_VERSION,
};
pub use render::render_interactive;
