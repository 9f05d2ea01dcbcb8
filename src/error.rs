//! # Error Types
//!
//! Build-time errors raised while assembling the schema registry and route table,
//! plus the client-facing error taxonomy the dispatcher maps every failure into.
//!
//! Build-time errors are plain enums/structs with hand-written `Display` impls so that
//! callers can match on them; application plumbing (CLI, config, handler faults) uses
//! `anyhow`.

use http::Method;
use std::fmt;

/// A schema with this name is already registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSchemaError {
    /// The conflicting schema name
    pub name: String,
}

impl fmt::Display for DuplicateSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema '{}' is already registered", self.name)
    }
}

impl std::error::Error for DuplicateSchemaError {}

/// A schema reference does not resolve in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSchemaError {
    /// The unresolved schema name
    pub name: String,
}

impl fmt::Display for UnknownSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema '{}' is not registered", self.name)
    }
}

impl std::error::Error for UnknownSchemaError {}

/// Another route already owns this (method, pattern) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConflictError {
    /// HTTP method of the rejected route
    pub method: Method,
    /// Pattern of the rejected route
    pub pattern: String,
    /// Pattern of the route that already owns the slot
    pub existing: String,
}

impl fmt::Display for RouteConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pattern == self.existing {
            write!(f, "route {} {} is already registered", self.method, self.pattern)
        } else {
            write!(
                f,
                "route {} {} conflicts with registered route {} {}",
                self.method, self.pattern, self.method, self.existing
            )
        }
    }
}

impl std::error::Error for RouteConflictError {}

/// A path pattern could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPatternError {
    /// The offending pattern
    pub pattern: String,
    /// What is wrong with it
    pub reason: String,
}

impl fmt::Display for InvalidPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path pattern '{}': {}", self.pattern, self.reason)
    }
}

impl std::error::Error for InvalidPatternError {}

/// A route's success status is not a 2xx code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatusError {
    pub method: Method,
    pub pattern: String,
    pub status: u16,
}

impl fmt::Display for InvalidStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route {} {} declares success status {}, expected 200-299",
            self.method, self.pattern, self.status
        )
    }
}

impl std::error::Error for InvalidStatusError {}

/// Any failure raised while assembling an [`Api`](crate::api::Api).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// See [`DuplicateSchemaError`]
    DuplicateSchema(DuplicateSchemaError),
    /// See [`UnknownSchemaError`]
    UnknownSchema(UnknownSchemaError),
    /// See [`RouteConflictError`]
    RouteConflict(RouteConflictError),
    /// See [`InvalidPatternError`]
    InvalidPattern(InvalidPatternError),
    /// See [`InvalidStatusError`]
    InvalidStatus(InvalidStatusError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateSchema(e) => e.fmt(f),
            BuildError::UnknownSchema(e) => e.fmt(f),
            BuildError::RouteConflict(e) => e.fmt(f),
            BuildError::InvalidPattern(e) => e.fmt(f),
            BuildError::InvalidStatus(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::DuplicateSchema(e) => Some(e),
            BuildError::UnknownSchema(e) => Some(e),
            BuildError::RouteConflict(e) => Some(e),
            BuildError::InvalidPattern(e) => Some(e),
            BuildError::InvalidStatus(e) => Some(e),
        }
    }
}

impl From<DuplicateSchemaError> for BuildError {
    fn from(e: DuplicateSchemaError) -> Self {
        BuildError::DuplicateSchema(e)
    }
}

impl From<UnknownSchemaError> for BuildError {
    fn from(e: UnknownSchemaError) -> Self {
        BuildError::UnknownSchema(e)
    }
}

impl From<RouteConflictError> for BuildError {
    fn from(e: RouteConflictError) -> Self {
        BuildError::RouteConflict(e)
    }
}

impl From<InvalidPatternError> for BuildError {
    fn from(e: InvalidPatternError) -> Self {
        BuildError::InvalidPattern(e)
    }
}

impl From<InvalidStatusError> for BuildError {
    fn from(e: InvalidStatusError) -> Self {
        BuildError::InvalidStatus(e)
    }
}

/// Classification of every non-success outcome the dispatcher can produce.
///
/// `RouteNotFound`, `ValidationError`, `PayloadTooLarge` and `HandlerError` are expected
/// client-facing outcomes. `ContractViolation` and `UnhandledFault` are server defects:
/// they are logged for operators and surfaced as a generic 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RouteNotFound,
    ValidationError,
    PayloadTooLarge,
    HandlerError,
    ContractViolation,
    UnhandledFault,
}

impl ErrorKind {
    /// Whether this outcome indicates a server-side defect.
    #[must_use]
    pub fn is_defect(self) -> bool {
        matches!(self, ErrorKind::ContractViolation | ErrorKind::UnhandledFault)
    }

    /// Machine-readable slug used in response bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RouteNotFound => "not_found",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::HandlerError => "handler_error",
            ErrorKind::ContractViolation | ErrorKind::UnhandledFault => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defects_share_internal_slug() {
        assert!(ErrorKind::ContractViolation.is_defect());
        assert!(ErrorKind::UnhandledFault.is_defect());
        assert!(!ErrorKind::HandlerError.is_defect());
        assert_eq!(ErrorKind::ContractViolation.as_str(), "internal_error");
        assert_eq!(ErrorKind::UnhandledFault.as_str(), "internal_error");
    }

    #[test]
    fn test_route_conflict_message() {
        let err = RouteConflictError {
            method: Method::GET,
            pattern: "/a/{y}".to_string(),
            existing: "/a/{x}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "route GET /a/{y} conflicts with registered route GET /a/{x}"
        );
    }
}
