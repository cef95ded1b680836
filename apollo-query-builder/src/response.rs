//! Result records returned to callers.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::complexity::ComplexityReport;
use crate::error::QueryBuilderError;
use crate::session::SessionId;
use crate::structure::OperationType;

/// The wire shape of every operation result: `{"success": true, ...}` or `{"error": "..."}`.
///
/// Callers must treat the presence of `error` as the only failure signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResponse<T> {
    Success {
        success: bool,
        #[serde(flatten)]
        payload: T,
    },
    Failure {
        error: String,
    },
}

impl<T> From<Result<T, QueryBuilderError>> for ToolResponse<T> {
    fn from(result: Result<T, QueryBuilderError>) -> Self {
        match result {
            Ok(payload) => ToolResponse::Success {
                success: true,
                payload,
            },
            Err(error) => ToolResponse::Failure {
                error: error.to_string(),
            },
        }
    }
}

/// Outcome of an edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationOutcome {
    /// Names the entity that changed and where.
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Operation-specific fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl MutationOutcome {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub(crate) fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// A newly started session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: SessionId,
    pub operation_type: OperationType,
    pub operation_type_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The materialized document of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentQuery {
    #[serde(rename = "queryString")]
    pub query_string: String,
    pub variables_schema: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Full validation of a session's document.
///
/// `errors` holds the errors of the first failing layer only: structural checks, then
/// GraphQL validation against the schema, then variable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityReport>,
}
