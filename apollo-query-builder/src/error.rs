//! Query builder errors.
use std::fmt;
use std::time::Duration;

use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;

/// Broad classification of a [`QueryBuilderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A session, path, schema element, variable or fragment does not exist.
    NotFound,
    /// An identifier, type reference or literal is malformed.
    InvalidSyntax,
    /// A value or variable does not fit the schema type of its slot.
    TypeMismatch,
    /// The edit clashes with existing state.
    Conflict,
    /// A size, depth or score ceiling was crossed.
    ComplexityExceeded,
    /// The GraphQL endpoint or schema source failed.
    UpstreamFailure,
    /// An external operation did not complete in time.
    Timeout,
    /// The session store failed.
    Storage,
}

/// "Did you mean" hint appended to lookup failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestion(pub Option<String>);

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(candidate) => write!(f, ". Did you mean '{candidate}'?"),
            None => Ok(()),
        }
    }
}

impl From<Option<String>> for Suggestion {
    fn from(candidate: Option<String>) -> Self {
        Self(candidate)
    }
}

/// Errors returned by every query builder operation.
///
/// The message of each variant is part of the public contract: callers surface it verbatim
/// as the `error` field of a tool response.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryBuilderError {
    /// Session '{session_id}' not found or expired
    SessionNotFound { session_id: String },

    /// Path segment '{segment}' not found in query structure (path '{path}')
    PathNotFound { path: String, segment: String },

    /// Field '{field}' not found on type '{type_name}'{suggestion}
    UnknownField {
        field: String,
        type_name: String,
        suggestion: Suggestion,
    },

    /// Type '{type_name}' not found in schema{suggestion}
    UnknownType {
        type_name: String,
        suggestion: Suggestion,
    },

    /// Argument '{argument}' not found on field '{field}'{suggestion}
    UnknownArgument {
        argument: String,
        field: String,
        suggestion: Suggestion,
    },

    /// Directive '@{directive}' not found in schema{suggestion}
    UnknownDirective {
        directive: String,
        suggestion: Suggestion,
    },

    /// Argument '{argument}' not found on directive '@{directive}'{suggestion}
    UnknownDirectiveArgument {
        argument: String,
        directive: String,
        suggestion: Suggestion,
    },

    /// Input field '{field}' not found on input type '{type_name}'{suggestion}
    UnknownInputField {
        field: String,
        type_name: String,
        suggestion: Suggestion,
    },

    /// Value '{value}' is not a member of enum '{type_name}'{suggestion}
    UnknownEnumValue {
        value: String,
        type_name: String,
        suggestion: Suggestion,
    },

    /// Variable '{name}' is not defined
    UndefinedVariable { name: String },

    /// Fragment '{name}' is not defined
    UndefinedFragment { name: String },

    /// Schema does not define a root type for {operation_type} operations
    MissingRootType { operation_type: String },

    /// Invalid {kind} name '{name}': names must match /^[_A-Za-z][_0-9A-Za-z]*$/
    InvalidName { kind: &'static str, name: String },

    /// Invalid variable name '{name}': variable names must start with '$' followed by a valid name
    InvalidVariableName { name: String },

    /// Invalid path '{path}': {reason}
    InvalidPath { path: String, reason: String },

    /// Invalid GraphQL type '{type_ref}': {reason}
    InvalidTypeReference { type_ref: String, reason: String },

    /// Invalid GraphQL value: {0}
    InvalidLiteral(String),

    /// Empty string is not allowed for argument '{argument}'; use null instead
    EmptyString { argument: String },

    /// {label} contains control characters
    ControlCharacters { label: String },

    /// Invalid header '{name}': {reason}
    InvalidHeader { name: String, reason: String },

    /// Invalid value for {target}: {reason}
    InvalidValue { target: String, reason: String },

    /// Variable '{variable}' of type '{variable_type}' cannot be used for {target} of type '{expected_type}'
    VariableTypeMismatch {
        variable: String,
        variable_type: String,
        target: String,
        expected_type: String,
    },

    /// Argument '{argument}' has type '{type_name}', which is not an input object type
    NotInputObject { argument: String, type_name: String },

    /// Type '{type_name}' is not an input type and cannot be used for {usage}
    NotInputType {
        type_name: String,
        usage: &'static str,
    },

    /// Type '{type_name}' is not a composite type and cannot be used as a fragment type condition
    NotCompositeType { type_name: String },

    /// Directive '@{directive}' cannot be used on {location}
    InvalidDirectiveLocation {
        directive: String,
        location: &'static str,
    },

    /// Alias '{key}' at path '{path}' is already used for field '{existing}'; it cannot also select '{requested}'
    AliasConflict {
        key: String,
        path: String,
        existing: String,
        requested: String,
    },

    /// Argument '{argument}' is bound to variable '{variable}'; remove the binding before setting input object fields
    ArgumentBoundToVariable { argument: String, variable: String },

    /// Session '{session_id}' was modified concurrently; reload it and retry
    ConcurrentModification { session_id: String },

    /// {label} length {length} exceeds maximum of {max} characters
    StringTooLong {
        label: String,
        length: usize,
        max: usize,
    },

    /// Value {value} for pagination argument '{argument}' exceeds maximum of {max}
    PaginationLimit {
        argument: String,
        value: String,
        max: u64,
    },

    /// {0}
    InputTooComplex(String),

    /// Query is too complex: {0}
    QueryTooComplex(String),

    /// Query is empty: select at least one field first
    EmptyQuery,

    /// Failed to introspect schema: {0}
    SchemaFetch(String),

    /// Schema is invalid: {0}
    InvalidSchema(String),

    /// Query execution failed: {0}
    Execution(String),

    /// No GraphQL endpoint is configured for {0}
    MissingEndpoint(&'static str),

    /// {operation} timed out after {timeout:?}
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Session storage failure: {0}
    Storage(String),
}

impl QueryBuilderError {
    /// Classify this error into the taxonomy callers reason about.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryBuilderError::SessionNotFound { .. }
            | QueryBuilderError::PathNotFound { .. }
            | QueryBuilderError::UnknownField { .. }
            | QueryBuilderError::UnknownType { .. }
            | QueryBuilderError::UnknownArgument { .. }
            | QueryBuilderError::UnknownDirective { .. }
            | QueryBuilderError::UnknownDirectiveArgument { .. }
            | QueryBuilderError::UnknownInputField { .. }
            | QueryBuilderError::UndefinedVariable { .. }
            | QueryBuilderError::UndefinedFragment { .. }
            | QueryBuilderError::MissingRootType { .. }
            | QueryBuilderError::MissingEndpoint(_) => ErrorKind::NotFound,
            QueryBuilderError::InvalidName { .. }
            | QueryBuilderError::InvalidVariableName { .. }
            | QueryBuilderError::InvalidPath { .. }
            | QueryBuilderError::InvalidTypeReference { .. }
            | QueryBuilderError::InvalidLiteral(_)
            | QueryBuilderError::EmptyString { .. }
            | QueryBuilderError::InvalidHeader { .. }
            | QueryBuilderError::EmptyQuery => ErrorKind::InvalidSyntax,
            QueryBuilderError::UnknownEnumValue { .. }
            | QueryBuilderError::InvalidValue { .. }
            | QueryBuilderError::VariableTypeMismatch { .. }
            | QueryBuilderError::NotInputObject { .. }
            | QueryBuilderError::NotInputType { .. }
            | QueryBuilderError::NotCompositeType { .. }
            | QueryBuilderError::InvalidDirectiveLocation { .. } => ErrorKind::TypeMismatch,
            QueryBuilderError::AliasConflict { .. }
            | QueryBuilderError::ArgumentBoundToVariable { .. }
            | QueryBuilderError::ConcurrentModification { .. } => ErrorKind::Conflict,
            QueryBuilderError::ControlCharacters { .. }
            | QueryBuilderError::StringTooLong { .. }
            | QueryBuilderError::PaginationLimit { .. }
            | QueryBuilderError::InputTooComplex(_)
            | QueryBuilderError::QueryTooComplex(_) => ErrorKind::ComplexityExceeded,
            QueryBuilderError::SchemaFetch(_)
            | QueryBuilderError::InvalidSchema(_)
            | QueryBuilderError::Execution(_) => ErrorKind::UpstreamFailure,
            QueryBuilderError::Timeout { .. } => ErrorKind::Timeout,
            QueryBuilderError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same storage call could succeed.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, QueryBuilderError::Storage(_))
    }
}

/// One message per diagnostic, with its location when known.
pub(crate) fn diagnostic_messages(errors: &DiagnosticList) -> Vec<String> {
    errors
        .iter()
        .map(|diagnostic| match diagnostic.line_column_range() {
            Some(range) => format!(
                "{} (line {}, column {})",
                diagnostic.error, range.start.line, range.start.column
            ),
            None => diagnostic.error.to_string(),
        })
        .collect()
}

/// The first few diagnostics on one line each, for embedding in an error message.
pub(crate) fn format_diagnostics(errors: &DiagnosticList) -> String {
    let messages = diagnostic_messages(errors);
    let mut formatted = messages
        .iter()
        .take(5)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    if messages.len() > 5 {
        formatted.push_str(&format!("\n...and {} other errors", messages.len() - 5));
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_is_appended_only_when_present() {
        let without = QueryBuilderError::UnknownField {
            field: "nmae".to_string(),
            type_name: "User".to_string(),
            suggestion: Suggestion(None),
        };
        assert_eq!(without.to_string(), "Field 'nmae' not found on type 'User'");

        let with = QueryBuilderError::UnknownField {
            field: "nmae".to_string(),
            type_name: "User".to_string(),
            suggestion: Some("name".to_string()).into(),
        };
        assert_eq!(
            with.to_string(),
            "Field 'nmae' not found on type 'User'. Did you mean 'name'?"
        );
    }

    #[test]
    fn timeouts_are_distinct_from_upstream_failures() {
        let timeout = QueryBuilderError::Timeout {
            operation: "Schema introspection",
            timeout: Duration::from_secs(30),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(
            timeout.to_string(),
            "Schema introspection timed out after 30s"
        );
        assert_eq!(
            QueryBuilderError::SchemaFetch("connection refused".to_string()).kind(),
            ErrorKind::UpstreamFailure
        );
    }
}
