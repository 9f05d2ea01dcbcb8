//! # Schema Module
//!
//! Declared data shapes used to validate request/response payloads and to document
//! the API.
//!
//! ## Overview
//!
//! A [`Schema`] is an ordered list of [`Field`] descriptors. Each field carries a
//! [`FieldType`] tag (`string`, `integer`, `number`, `boolean`, `any`, arrays, or a
//! reference to another registered schema), a required/optional marker, an optional
//! default, and a nullability flag.
//!
//! Schemas are registered by name in a [`SchemaRegistry`] at startup. After
//! registration a schema is immutable; the registry hands out [`SchemaRef`] handles
//! whose identity is stable for the lifetime of the process.
//!
//! ## Validation
//!
//! [`SchemaRegistry::validate`] walks a JSON value against a schema and collects
//! **every** violation rather than stopping at the first one. Absent optional fields
//! with a default are filled in, so validating the output a second time yields the
//! same value.
//!
//! ```rust
//! use schemagate::schema::{Field, FieldType, Schema, SchemaRegistry};
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! let item = registry
//!     .register(
//!         "Item",
//!         Schema::new()
//!             .field(Field::required("id", FieldType::Integer))
//!             .field(Field::required("name", FieldType::String)),
//!     )
//!     .unwrap();
//!
//! let err = registry.validate(&item, json!({})).unwrap_err();
//! assert_eq!(err.violations.len(), 2);
//! ```

mod registry;
mod validate;

pub use registry::{Field, FieldType, Schema, SchemaRef, SchemaRegistry};
pub use validate::{coerce_param, json_type_name, Location, ValidationError, Violation};
