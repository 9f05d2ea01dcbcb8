//! Router core module - route table and path matching.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::dispatcher::{Handler, HandlerRequest, HandlerResult};
use crate::error::{BuildError, InvalidPatternError, InvalidStatusError, RouteConflictError};
use crate::schema::{Field, FieldType, Schema};
use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated path captures for the hot path.
///
/// Param names use `Arc<str>` because they come from the route table (known at
/// startup); values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

type SegmentVec<'a> = SmallVec<[&'a str; MAX_INLINE_PARAMS]>;

/// Strip a trailing slash, keeping `/` for the root.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn split_segments(path: &str) -> SegmentVec<'_> {
    let path = normalize_path(path);
    if path == "/" {
        return SegmentVec::new();
    }
    path.trim_start_matches('/').split('/').collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(Arc<str>),
}

/// Parsed path pattern such as `/users/{id}/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern. Literal segments match exactly; `{name}` segments match any
    /// non-empty segment and capture it.
    ///
    /// # Errors
    ///
    /// [`InvalidPatternError`] for a missing leading `/`, empty segments, unbalanced
    /// braces, empty or non-identifier parameter names, or a repeated parameter name.
    pub fn parse(pattern: &str) -> Result<Self, InvalidPatternError> {
        let invalid = |reason: &str| InvalidPatternError {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }
        let raw = normalize_path(pattern).to_string();

        let mut segments = Vec::new();
        for segment in split_segments(&raw) {
            if segment.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if let Some(name) = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                if name.is_empty() {
                    return Err(invalid("empty parameter name"));
                }
                if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid("parameter names may only contain [A-Za-z0-9_]"));
                }
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(p) if p.as_ref() == name))
                {
                    return Err(invalid("duplicate parameter name"));
                }
                segments.push(Segment::Param(Arc::from(name)));
            } else if segment.contains('{') || segment.contains('}') {
                return Err(invalid("unbalanced braces"));
            } else {
                segments.push(Segment::Literal(segment.to_string()));
            }
        }

        Ok(Self { raw, segments })
    }

    /// Normalised pattern text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parameter names in path order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Same literals in the same places with parameters in the same places,
    /// regardless of parameter names.
    fn same_shape(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| match (a, b) {
                    (Segment::Literal(x), Segment::Literal(y)) => x == y,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    fn captures(&self, path_segments: &[&str]) -> Option<ParamVec> {
        if path_segments.len() != self.segments.len() {
            return None;
        }
        let mut params = ParamVec::new();
        for (segment, actual) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != actual {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if actual.is_empty() {
                        return None;
                    }
                    let value = urlencoding::decode(actual).unwrap_or(Cow::Borrowed(*actual));
                    params.push((Arc::clone(name), value.into_owned()));
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A (method, pattern) binding to a handler plus its declared schemas.
///
/// Built with a fluent API and handed to [`RouteTable::add`]:
///
/// ```rust
/// use schemagate::router::Route;
/// use schemagate::schema::FieldType;
/// use http::Method;
/// use serde_json::json;
///
/// let route = Route::new(Method::GET, "/items/{id}", |req| {
///     Ok(json!({ "id": req.path_param("id").cloned() }))
/// })
/// .path_param("id", FieldType::Integer)
/// .summary("Fetch one item");
/// ```
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: String,
    /// Declared request body type
    pub input: Option<FieldType>,
    /// Declared success body type
    pub output: Option<FieldType>,
    /// Declared path parameter types; undeclared captures are strings
    pub path_params: Schema,
    pub query_params: Schema,
    /// Status returned on success
    pub status: u16,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: String,
    handler: Handler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("status", &self.status)
            .field("operation_id", &self.operation_id)
            .finish_non_exhaustive()
    }
}

fn default_operation_id(method: &Method, pattern: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        id.push('_');
        id.extend(
            segment
                .chars()
                .filter(|c| *c != '{' && *c != '}')
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
        );
    }
    if !id.contains('_') {
        id.push_str("_root");
    }
    id
}

impl Route {
    pub fn new<F>(method: Method, pattern: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            operation_id: default_operation_id(&method, pattern),
            method,
            pattern: pattern.to_string(),
            input: None,
            output: None,
            path_params: Schema::new(),
            query_params: Schema::new(),
            status: 200,
            summary: None,
            description: None,
            handler: Arc::new(handler),
        }
    }

    /// Validate the request body against `ty` before the handler runs
    #[must_use]
    pub fn input(mut self, ty: FieldType) -> Self {
        self.input = Some(ty);
        self
    }

    /// Validate the handler's return value against `ty` before serialisation
    #[must_use]
    pub fn output(mut self, ty: FieldType) -> Self {
        self.output = Some(ty);
        self
    }

    /// Declare the type of a `{name}` capture
    #[must_use]
    pub fn path_param(mut self, name: &str, ty: FieldType) -> Self {
        self.path_params = std::mem::take(&mut self.path_params).field(Field::required(name, ty));
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: &str, ty: FieldType, required: bool) -> Self {
        let field = if required {
            Field::required(name, ty)
        } else {
            Field::optional(name, ty)
        };
        self.query_params = std::mem::take(&mut self.query_params).field(field);
        self
    }

    /// Declare a query parameter with a fallback value
    #[must_use]
    pub fn query_param_default(mut self, name: &str, ty: FieldType, default: serde_json::Value) -> Self {
        self.query_params = std::mem::take(&mut self.query_params)
            .field(Field::optional(name, ty).with_default(default));
        self
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn summary(mut self, text: &str) -> Self {
        self.summary = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn operation_id(mut self, id: &str) -> Self {
        self.operation_id = id.to_string();
        self
    }

    /// The bound handler
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Whether anything about this route is validated before the handler runs
    #[must_use]
    pub fn validates_request(&self) -> bool {
        self.input.is_some() || !self.path_params.is_empty() || !self.query_params.is_empty()
    }
}

/// A registered route as stored in the table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: PathPattern,
    pub route: Route,
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `{"id": "123"}`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a raw path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.entry.route
    }
}

/// Ordered table of routes.
///
/// Matching is a linear scan in registration order and the first matching route
/// wins, so overlapping patterns such as `/items/new` and `/items/{id}` resolve by
/// which was added first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
    revision: u64,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::InvalidPattern`] if the pattern does not parse or a declared
    ///   path parameter is missing from it
    /// - [`BuildError::InvalidStatus`] if the success status is not 2xx
    /// - [`BuildError::RouteConflict`] if a route with the same method and pattern
    ///   shape exists; the table is left unchanged
    pub fn add(&mut self, route: Route) -> Result<(), BuildError> {
        let pattern = PathPattern::parse(&route.pattern)?;

        if !(200..300).contains(&route.status) {
            return Err(InvalidStatusError {
                method: route.method.clone(),
                pattern: route.pattern.clone(),
                status: route.status,
            }
            .into());
        }

        for field in route.path_params.fields() {
            if !pattern.param_names().any(|n| n == field.name) {
                return Err(InvalidPatternError {
                    pattern: route.pattern.clone(),
                    reason: format!(
                        "declared path parameter '{}' does not appear in the pattern",
                        field.name
                    ),
                }
                .into());
            }
        }

        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.route.method == route.method && e.pattern.same_shape(&pattern))
        {
            return Err(RouteConflictError {
                method: route.method.clone(),
                pattern: pattern.as_str().to_string(),
                existing: existing.pattern.as_str().to_string(),
            }
            .into());
        }

        info!(
            method = %route.method,
            pattern = %pattern,
            operation_id = %route.operation_id,
            total_routes = self.entries.len() + 1,
            "Route registered"
        );

        self.entries.push(Arc::new(RouteEntry { pattern, route }));
        self.revision += 1;
        Ok(())
    }

    /// Find the first route matching `method` and `path` (no query string).
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let segments = split_segments(path);
        for entry in &self.entries {
            if entry.route.method != *method {
                continue;
            }
            if let Some(path_params) = entry.pattern.captures(&segments) {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %entry.pattern,
                    path_params = ?path_params,
                    "Route matched"
                );
                return Some(RouteMatch {
                    entry: Arc::clone(entry),
                    path_params,
                });
            }
        }

        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Registered routes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().map(|e| &**e)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incremented on every successful `add`
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// One `METHOD /pattern -> operation_id` line per route
    #[must_use]
    pub fn dump_routes(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{} {} -> {}", e.route.method, e.pattern, e.route.operation_id))
            .collect()
    }
}
