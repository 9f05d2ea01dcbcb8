use crate::error::{BuildError, DuplicateSchemaError, UnknownSchemaError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Stable handle to a registered schema.
///
/// Cloning is an atomic increment; the name is shared with the registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef(Arc<str>);

impl SchemaRef {
    /// Handle by name, for self-referential schemas that must mention themselves
    /// before registration. Resolution still goes through the registry.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Registered name of the schema
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tagged type descriptor for a field or a whole payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, unchecked
    Any,
    /// Homogeneous array of the inner type
    Array(Box<FieldType>),
    /// Object conforming to a registered schema
    Ref(SchemaRef),
}

impl FieldType {
    /// Array of `item`
    #[must_use]
    pub fn array_of(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    /// Object conforming to `schema`
    #[must_use]
    pub fn of(schema: &SchemaRef) -> Self {
        FieldType::Ref(schema.clone())
    }

    /// Human-readable type name used in violation messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Any => "any",
            FieldType::Array(_) => "array",
            FieldType::Ref(_) => "object",
        }
    }

    fn refs<'a>(&'a self, out: &mut Vec<&'a SchemaRef>) {
        match self {
            FieldType::Array(inner) => inner.refs(out),
            FieldType::Ref(r) => out.push(r),
            _ => {}
        }
    }
}

/// One named member of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    /// Value substituted when the field is absent. Implies the field is optional.
    pub default: Option<Value>,
    /// Whether an explicit `null` is accepted
    pub nullable: bool,
    pub description: Option<String>,
}

impl Field {
    /// A field that must be present
    #[must_use]
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            nullable: false,
            description: None,
        }
    }

    /// A field that may be omitted
    #[must_use]
    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Fill `value` when the field is absent
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// Accept an explicit `null`
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Structural description of an object shape: an ordered list of fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    description: Option<String>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. A field with the same name replaces the earlier declaration.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Name-indexed store of immutable schemas.
///
/// Populated once at startup and then shared read-only (behind `Arc`) with the
/// dispatcher and the documentation generator.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: Vec<(SchemaRef, Arc<Schema>)>,
    index: HashMap<Arc<str>, usize>,
    allow_extra_fields: bool,
}

impl SchemaRegistry {
    /// Empty registry that rejects unknown fields
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how unknown object members are treated: `false` (default) reports them as
    /// violations, `true` drops them from the validated output.
    #[must_use]
    pub fn with_allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = allow;
        self
    }

    pub fn set_allow_extra_fields(&mut self, allow: bool) {
        self.allow_extra_fields = allow;
    }

    #[must_use]
    pub fn allow_extra_fields(&self) -> bool {
        self.allow_extra_fields
    }

    /// Register `schema` under `name`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::DuplicateSchema`] if `name` is taken
    /// - [`BuildError::UnknownSchema`] if a field references a schema that is neither
    ///   registered nor `name` itself
    pub fn register(&mut self, name: &str, schema: Schema) -> Result<SchemaRef, BuildError> {
        if self.index.contains_key(name) {
            return Err(DuplicateSchemaError {
                name: name.to_string(),
            }
            .into());
        }

        let mut refs = Vec::new();
        for field in schema.fields() {
            field.ty.refs(&mut refs);
        }
        if let Some(missing) = refs
            .into_iter()
            .find(|r| r.name() != name && !self.index.contains_key(r.name()))
        {
            return Err(UnknownSchemaError {
                name: missing.name().to_string(),
            }
            .into());
        }

        let key: Arc<str> = Arc::from(name);
        let schema_ref = SchemaRef(Arc::clone(&key));
        self.index.insert(key, self.entries.len());
        self.entries.push((schema_ref.clone(), Arc::new(schema)));

        info!(
            schema = %name,
            total_schemas = self.entries.len(),
            "Schema registered"
        );
        Ok(schema_ref)
    }

    /// Look up the shape behind `schema_ref`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSchemaError`] if the reference was not issued by this registry.
    pub fn resolve(&self, schema_ref: &SchemaRef) -> Result<Arc<Schema>, UnknownSchemaError> {
        self.index
            .get(schema_ref.name())
            .and_then(|&i| self.entries.get(i))
            .map(|(_, schema)| Arc::clone(schema))
            .ok_or_else(|| {
                debug!(schema = %schema_ref, "Schema lookup failed");
                UnknownSchemaError {
                    name: schema_ref.name().to_string(),
                }
            })
    }

    /// Handle for a registered name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SchemaRef> {
        self.index
            .get(name)
            .and_then(|&i| self.entries.get(i))
            .map(|(r, _)| r.clone())
    }

    /// Check that every schema referenced by `ty` is registered.
    ///
    /// # Errors
    ///
    /// Returns the first unresolved reference.
    pub fn check_type(&self, ty: &FieldType) -> Result<(), UnknownSchemaError> {
        let mut refs = Vec::new();
        ty.refs(&mut refs);
        for r in refs {
            self.resolve(r)?;
        }
        Ok(())
    }

    /// Registered schemas in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&SchemaRef, &Arc<Schema>)> {
        self.entries.iter().map(|(r, s)| (r, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_schema() -> Schema {
        Schema::new()
            .field(Field::required("id", FieldType::Integer))
            .field(Field::required("name", FieldType::String))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = SchemaRegistry::new();
        let item = registry.register("Item", item_schema()).unwrap();
        assert_eq!(item.name(), "Item");
        let shape = registry.resolve(&item).unwrap();
        assert_eq!(shape.fields().len(), 2);
        assert_eq!(registry.get("Item"), Some(item));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register("Item", item_schema()).unwrap();
        let err = registry.register("Item", Schema::new()).unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateSchema(DuplicateSchemaError {
                name: "Item".to_string()
            })
        );
        // Original registration is untouched
        let item = registry.get("Item").unwrap();
        assert_eq!(registry.resolve(&item).unwrap().fields().len(), 2);
    }

    #[test]
    fn test_resolve_foreign_ref_fails() {
        let mut other = SchemaRegistry::new();
        let foreign = other.register("Ghost", Schema::new()).unwrap();
        let registry = SchemaRegistry::new();
        let err = registry.resolve(&foreign).unwrap_err();
        assert_eq!(err.name, "Ghost");
    }

    #[test]
    fn test_forward_reference_rejected_self_reference_allowed() {
        let mut other = SchemaRegistry::new();
        let later = other.register("Later", Schema::new()).unwrap();

        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(
                "Holder",
                Schema::new().field(Field::required("x", FieldType::of(&later))),
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownSchema(_)));

        let node = SchemaRef::named("Node");
        registry
            .register(
                "Node",
                Schema::new()
                    .field(Field::required("value", FieldType::Integer))
                    .field(Field::optional(
                        "children",
                        FieldType::array_of(FieldType::of(&node)),
                    )),
            )
            .unwrap();
    }

    #[test]
    fn test_default_implies_optional() {
        let f = Field::required("limit", FieldType::Integer).with_default(serde_json::json!(10));
        assert!(!f.required);
        assert_eq!(f.default, Some(serde_json::json!(10)));
    }

    #[test]
    fn test_field_redeclaration_replaces() {
        let schema = Schema::new()
            .field(Field::required("a", FieldType::String))
            .field(Field::optional("a", FieldType::Integer));
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.get("a").unwrap().ty, FieldType::Integer);
    }
}
