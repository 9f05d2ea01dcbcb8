use crate::api::Api;
use crate::router::RouteEntry;
use crate::schema::{Field, FieldType, Schema, SchemaRegistry};
use anyhow::Context;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// OpenAPI version advertised by the generated description
pub const OPENAPI_VERSION: &str = "3.1.0";

const JSON: &str = "application/json";

/// Machine-readable description of every route and schema, shaped like OpenAPI 3.1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDescription {
    pub openapi: String,
    pub info: InfoObject,
    /// path -> lowercase method -> operation
    pub paths: BTreeMap<String, BTreeMap<String, Operation>>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoObject {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseObject {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

impl ApiDescription {
    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Serialisation failure.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialise API description as JSON")
    }

    /// YAML
    ///
    /// # Errors
    ///
    /// Serialisation failure.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialise API description as YAML")
    }

    /// Number of (path, method) operations
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(BTreeMap::len).sum()
    }
}

/// JSON Schema fragment for a type descriptor
#[must_use]
pub fn type_schema(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({ "type": "string" }),
        FieldType::Integer => json!({ "type": "integer" }),
        FieldType::Number => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Any => json!({}),
        FieldType::Array(item) => json!({ "type": "array", "items": type_schema(item) }),
        FieldType::Ref(r) => json!({ "$ref": format!("#/components/schemas/{}", r.name()) }),
    }
}

fn field_schema(field: &Field) -> Value {
    let mut schema = type_schema(&field.ty);
    if field.nullable {
        schema = match (&field.ty, schema) {
            (FieldType::Ref(_) | FieldType::Any, s) => json!({ "anyOf": [s, { "type": "null" }] }),
            (_, Value::Object(mut m)) => {
                if let Some(t) = m.remove("type") {
                    m.insert("type".to_string(), json!([t, "null"]));
                }
                Value::Object(m)
            }
            (_, s) => s,
        };
    }
    if let Value::Object(m) = &mut schema {
        if let Some(default) = &field.default {
            m.insert("default".to_string(), default.clone());
        }
        if let Some(text) = &field.description {
            m.insert("description".to_string(), Value::String(text.clone()));
        }
    }
    schema
}

/// JSON Schema object for a registered schema
#[must_use]
pub fn object_schema(schema: &Schema, allow_extra_fields: bool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in schema.fields() {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }

    let mut out = Map::new();
    out.insert("type".to_string(), json!("object"));
    out.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".to_string(), Value::Array(required));
    }
    if !allow_extra_fields {
        out.insert("additionalProperties".to_string(), json!(false));
    }
    if let Some(text) = schema.description() {
        out.insert("description".to_string(), json!(text));
    }
    Value::Object(out)
}

fn json_content(schema: Value) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(JSON.to_string(), MediaType { schema })])
}

fn validation_error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "error": { "type": "string" },
            "violations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "location": { "type": "string", "enum": ["path", "query", "body"] },
                        "field": { "type": "string" },
                        "reason": { "type": "string" }
                    },
                    "required": ["location", "field", "reason"]
                }
            }
        },
        "required": ["error", "violations"]
    })
}

fn status_description(status: u16) -> String {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Success")
        .to_string()
}

fn operation(entry: &RouteEntry) -> Operation {
    let route = &entry.route;

    let mut parameters: Vec<Parameter> = entry
        .pattern
        .param_names()
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: route
                .path_params
                .get(name)
                .map(field_schema)
                .unwrap_or_else(|| type_schema(&FieldType::String)),
        })
        .collect();
    parameters.extend(route.query_params.fields().iter().map(|field| Parameter {
        name: field.name.clone(),
        location: "query".to_string(),
        required: field.required,
        schema: field_schema(field),
    }));

    let mut responses = BTreeMap::new();
    responses.insert(
        route.status.to_string(),
        ResponseObject {
            description: status_description(route.status),
            content: route.output.as_ref().map(|ty| json_content(type_schema(ty))),
        },
    );
    if route.validates_request() {
        responses.insert(
            "422".to_string(),
            ResponseObject {
                description: "Validation Error".to_string(),
                content: Some(json_content(validation_error_schema())),
            },
        );
    }

    if entry.pattern.param_names().next().is_some() {
        responses
            .entry("404".to_string())
            .or_insert_with(|| ResponseObject {
                description: "Not Found".to_string(),
                content: None,
            });
    }

    Operation {
        operation_id: route.operation_id.clone(),
        summary: route.summary.clone(),
        description: route.description.clone(),
        parameters,
        request_body: route.input.as_ref().map(|ty| RequestBody {
            required: true,
            content: json_content(type_schema(ty)),
        }),
        responses,
    }
}

fn component_schemas(schemas: &SchemaRegistry) -> BTreeMap<String, Value> {
    schemas
        .iter()
        .map(|(r, schema)| {
            (
                r.name().to_string(),
                object_schema(schema, schemas.allow_extra_fields()),
            )
        })
        .collect()
}

/// Derive the API description from the route table and schema registry.
///
/// Pure and deterministic: no handler is invoked and equal inputs always produce
/// equal output.
#[must_use]
pub fn generate(api: &Api) -> ApiDescription {
    let mut paths: BTreeMap<String, BTreeMap<String, Operation>> = BTreeMap::new();
    for entry in api.routes().iter() {
        paths
            .entry(entry.pattern.as_str().to_string())
            .or_default()
            .insert(entry.route.method.as_str().to_ascii_lowercase(), operation(entry));
    }

    let info = api.info();
    ApiDescription {
        openapi: OPENAPI_VERSION.to_string(),
        info: InfoObject {
            title: info.title.clone(),
            version: info.version.clone(),
            description: info.description.clone(),
        },
        paths,
        components: Components {
            schemas: component_schemas(api.schemas()),
        },
    }
}

struct CachedDescription {
    key: (u64, usize),
    description: Arc<ApiDescription>,
}

/// Lazily generated description, reused until the route table changes.
#[derive(Default)]
pub struct DocsCache {
    cached: ArcSwapOption<CachedDescription>,
}

impl DocsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(api: &Api) -> (u64, usize) {
        (api.routes().revision(), api.schemas().len())
    }

    /// Cached description for `api`, regenerating if the route table changed.
    #[must_use]
    pub fn get(&self, api: &Api) -> Arc<ApiDescription> {
        let key = Self::key(api);
        if let Some(cached) = self.cached.load_full() {
            if cached.key == key {
                return Arc::clone(&cached.description);
            }
        }

        debug!(
            route_revision = key.0,
            schema_count = key.1,
            "Generating API description"
        );
        let description = Arc::new(generate(api));
        self.cached.store(Some(Arc::new(CachedDescription {
            key,
            description: Arc::clone(&description),
        })));
        description
    }

    /// Whether a description for the current state of `api` is cached
    #[must_use]
    pub fn is_fresh(&self, api: &Api) -> bool {
        self.cached
            .load()
            .as_ref()
            .is_some_and(|c| c.key == Self::key(api))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn test_nullable_field_schema() {
        let f = Field::optional("t", FieldType::Integer).nullable();
        assert_eq!(field_schema(&f), json!({ "type": ["integer", "null"] }));
    }

    #[test]
    fn test_object_schema_required_and_defaults() {
        let schema = Schema::new()
            .field(Field::required("name", FieldType::String))
            .field(Field::optional("limit", FieldType::Integer).with_default(json!(10)));
        let out = object_schema(&schema, false);
        assert_eq!(out["required"], json!(["name"]));
        assert_eq!(out["properties"]["limit"]["default"], json!(10));
        assert_eq!(out["additionalProperties"], json!(false));
    }

    #[test]
    fn test_status_description() {
        assert_eq!(status_description(201), "Created");
        assert_eq!(status_description(299), "Success");
    }
}
