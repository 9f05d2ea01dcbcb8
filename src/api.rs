//! # API Module
//!
//! [`Api`] bundles the schema registry and route table that together describe a
//! service. It is assembled once through [`ApiBuilder`] and then frozen: the
//! dispatcher and documentation generator only ever see it through `&Api` /
//! `Arc<Api>`, so nothing can be registered after startup.
//!
//! ```rust
//! use schemagate::api::Api;
//! use schemagate::router::Route;
//! use schemagate::schema::{Field, FieldType, Schema};
//! use http::Method;
//! use serde_json::json;
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
//! let api = builder.build();
//! assert_eq!(api.routes().len(), 1);
//! ```

use crate::error::BuildError;
use crate::router::{Route, RouteTable};
use crate::schema::{FieldType, Schema, SchemaRef, SchemaRegistry};

/// Descriptive metadata published in the generated documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// Frozen schema registry + route table.
#[derive(Debug, Clone)]
pub struct Api {
    info: ApiInfo,
    schemas: SchemaRegistry,
    routes: RouteTable,
}

impl Api {
    #[must_use]
    pub fn builder(title: &str, version: &str) -> ApiBuilder {
        ApiBuilder {
            info: ApiInfo {
                title: title.to_string(),
                version: version.to_string(),
                description: None,
            },
            schemas: SchemaRegistry::new(),
            routes: RouteTable::new(),
        }
    }

    #[must_use]
    pub fn info(&self) -> &ApiInfo {
        &self.info
    }

    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Mutable assembly stage of an [`Api`].
#[derive(Debug)]
pub struct ApiBuilder {
    info: ApiInfo,
    schemas: SchemaRegistry,
    routes: RouteTable,
}

impl ApiBuilder {
    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.info.description = Some(text.to_string());
        self
    }

    /// Whether unknown object members are dropped (`true`) or rejected (`false`, default)
    #[must_use]
    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.schemas.set_allow_extra_fields(allow);
        self
    }

    /// Register a named schema.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::register`].
    pub fn schema(&mut self, name: &str, schema: Schema) -> Result<SchemaRef, BuildError> {
        self.schemas.register(name, schema)
    }

    /// Register a route after checking that every schema it binds is registered.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnknownSchema`] for an unresolved binding, otherwise see
    /// [`RouteTable::add`].
    pub fn route(&mut self, route: Route) -> Result<(), BuildError> {
        let bound = route
            .input
            .iter()
            .chain(route.output.iter())
            .chain(route.path_params.fields().iter().map(|f| &f.ty))
            .chain(route.query_params.fields().iter().map(|f| &f.ty));
        for ty in bound {
            self.check(ty)?;
        }
        self.routes.add(route)
    }

    fn check(&self, ty: &FieldType) -> Result<(), BuildError> {
        self.schemas.check_type(ty).map_err(BuildError::from)
    }

    /// Freeze the registry and route table.
    #[must_use]
    pub fn build(self) -> Api {
        Api {
            info: self.info,
            schemas: self.schemas,
            routes: self.routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_route_with_unregistered_schema_rejected() {
        let mut other = Api::builder("other", "0");
        let ghost = other.schema("Ghost", Schema::new()).unwrap();

        let mut builder = Api::builder("t", "1");
        let err = builder
            .route(
                Route::new(Method::POST, "/g", |_req| Ok(json!({}))).input(FieldType::of(&ghost)),
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownSchema(_)));
        assert!(builder.build().routes().is_empty());
    }

    #[test]
    fn test_builder_metadata() {
        let api = Api::builder("Ledger", "2.0")
            .description("Accounts")
            .allow_extra_fields(true)
            .build();
        assert_eq!(api.info().title, "Ledger");
        assert_eq!(api.info().description.as_deref(), Some("Accounts"));
        assert!(api.schemas().allow_extra_fields());
    }
}
