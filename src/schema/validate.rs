use super::registry::{FieldType, Schema, SchemaRegistry};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Path of the validated value itself
const ROOT: &str = "$";

/// Where in the request a violation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Body => "body",
        })
    }
}

/// A single field-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub location: Location,
    /// Dotted field path (`address.lines[1]`), `$` for the value itself
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(location: Location, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Every violation found while checking a value; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "; {} {}: {}", v.location, v.field, v.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// JSON type name of `value` as reported in violations.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a raw path/query string into the JSON value `ty` expects.
///
/// Strings that do not parse are returned unchanged so that validation reports a
/// type violation for them.
#[must_use]
pub fn coerce_param(ty: &FieldType, raw: &str) -> Value {
    match ty {
        FieldType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        FieldType::Boolean => raw
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldType::Array(item) => Value::Array(
            raw.split(',')
                .filter(|s| !s.is_empty())
                .map(|p| coerce_param(item, p.trim()))
                .collect(),
        ),
        FieldType::Ref(_) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        FieldType::String | FieldType::Any => Value::String(raw.to_string()),
    }
}

fn child(path: &str, name: &str) -> String {
    if path == ROOT {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

impl SchemaRegistry {
    /// Validate `value` as an object conforming to `schema_ref`.
    ///
    /// Returns the value with defaults filled in (and, when extra fields are allowed,
    /// with unknown members dropped).
    ///
    /// # Errors
    ///
    /// [`ValidationError`] listing every violated field.
    pub fn validate(
        &self,
        schema_ref: &super::SchemaRef,
        value: Value,
    ) -> Result<Value, ValidationError> {
        self.validate_type(&FieldType::Ref(schema_ref.clone()), value)
    }

    /// Validate `value` against an arbitrary type descriptor.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] listing every violated field.
    pub fn validate_type(&self, ty: &FieldType, value: Value) -> Result<Value, ValidationError> {
        self.validate_at(ty, value, Location::Body)
    }

    /// Validate `value`, tagging violations with `location`.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] listing every violated field.
    pub fn validate_at(
        &self,
        ty: &FieldType,
        value: Value,
        location: Location,
    ) -> Result<Value, ValidationError> {
        let mut violations = Vec::new();
        let out = self.check_value(ty, value, ROOT, location, &mut violations);
        if violations.is_empty() {
            Ok(out)
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Coerce and validate raw string parameters against `schema`.
    ///
    /// Declared parameters are typed and checked; undeclared ones pass through as
    /// strings. With duplicate names the last value wins.
    pub fn validate_params<I, K, V>(
        &self,
        schema: &Schema,
        raw: I,
        location: Location,
        violations: &mut Vec<Violation>,
    ) -> Map<String, Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pending: HashMap<String, String> = raw
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut out = Map::new();
        for field in schema.fields() {
            match pending.remove(&field.name) {
                Some(raw_value) => {
                    let coerced = coerce_param(&field.ty, &raw_value);
                    let checked =
                        self.check_value(&field.ty, coerced, &field.name, location, violations);
                    out.insert(field.name.clone(), checked);
                }
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        violations.push(Violation::new(
                            location,
                            field.name.as_str(),
                            "required field missing",
                        ));
                    }
                }
            }
        }
        for (name, raw_value) in pending {
            out.insert(name, Value::String(raw_value));
        }
        out
    }

    fn check_value(
        &self,
        ty: &FieldType,
        value: Value,
        path: &str,
        location: Location,
        violations: &mut Vec<Violation>,
    ) -> Value {
        let matches = match (ty, &value) {
            (FieldType::Any, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64(),
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array(_), Value::Array(_)) => true,
            (FieldType::Ref(_), Value::Object(_)) => true,
            _ => false,
        };
        if !matches {
            let reason = match (ty, &value) {
                (FieldType::Integer, Value::Number(n)) if n.is_u64() => {
                    "integer out of range".to_string()
                }
                _ => format!(
                    "expected {}, found {}",
                    ty.type_name(),
                    json_type_name(&value)
                ),
            };
            violations.push(Violation::new(location, path, reason));
            return value;
        }

        match (ty, value) {
            (FieldType::Array(item), Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| self.check_value(item, v, &index(path, i), location, violations))
                    .collect(),
            ),
            (FieldType::Ref(schema_ref), Value::Object(members)) => {
                match self.resolve(schema_ref) {
                    Ok(schema) => {
                        Value::Object(self.check_object(&schema, members, path, location, violations))
                    }
                    Err(e) => {
                        violations.push(Violation::new(location, path, e.to_string()));
                        Value::Object(members)
                    }
                }
            }
            (_, other) => other,
        }
    }

    fn check_object(
        &self,
        schema: &Schema,
        mut members: Map<String, Value>,
        path: &str,
        location: Location,
        violations: &mut Vec<Violation>,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for field in schema.fields() {
            let field_path = child(path, &field.name);
            match members.remove(&field.name) {
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        violations.push(Violation::new(
                            location,
                            field_path,
                            "required field missing",
                        ));
                    }
                }
                Some(Value::Null) if field.nullable => {
                    out.insert(field.name.clone(), Value::Null);
                }
                Some(Value::Null) => {
                    violations.push(Violation::new(location, field_path, "must not be null"));
                }
                Some(v) => {
                    let checked = self.check_value(&field.ty, v, &field_path, location, violations);
                    out.insert(field.name.clone(), checked);
                }
            }
        }

        if !self.allow_extra_fields() {
            for name in members.keys() {
                violations.push(Violation::new(location, child(path, name), "unknown field"));
            }
        }
        out
    }
}
