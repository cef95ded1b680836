use indexmap::IndexMap;

use super::QueryBuilder;
use crate::error::QueryBuilderError;
use crate::response::MutationOutcome;
use crate::response::SessionStarted;
use crate::session::SessionId;
use crate::structure::OperationType;
use crate::structure::SessionState;
use crate::transport::header_map;
use crate::transport::merge_headers;
use crate::value::validate_name;

impl QueryBuilder {
    /// Start building a new operation.
    ///
    /// `headers` are layered over the configured default headers and used for every schema
    /// fetch and execution of this session. The operation's root type comes from the schema;
    /// under advisory validation without a schema the conventional name (`Query`, ...) is used.
    pub async fn start_session(
        &self,
        headers: IndexMap<String, String>,
        operation_type: OperationType,
        operation_name: Option<&str>,
    ) -> Result<SessionStarted, QueryBuilderError> {
        let headers = merge_headers(&self.configuration.headers, headers);
        header_map(&headers)?;
        if let Some(name) = operation_name {
            validate_name("operation", name)?;
        }

        let mut warnings = Vec::new();
        let operation_type_name = match self.schema_for(&headers, &mut warnings).await? {
            Some(schema) => schema.root_type_name(operation_type)?.to_string(),
            None => {
                let fallback = operation_type.default_type_name();
                warnings.push(format!(
                    "Root type of {operation_type} operations assumed to be '{fallback}'"
                ));
                fallback.to_string()
            }
        };

        let session_id = SessionId::generate();
        let state = SessionState::new(
            headers,
            operation_type,
            operation_type_name.clone(),
            operation_name.map(str::to_string),
        );
        self.save(&session_id, &state).await?;
        tracing::info!(
            session.id = %session_id,
            operation.kind = %operation_type,
            operation.root = %operation_type_name,
            "session started"
        );
        Ok(SessionStarted {
            message: format!(
                "Session started for {operation_type} operation on root type '{operation_type_name}'"
            ),
            session_id,
            operation_type,
            operation_type_name,
            warnings,
        })
    }

    /// Discard a session. Ending an unknown or expired session is not an error.
    pub async fn end_session(&self, session_id: &str) -> Result<MutationOutcome, QueryBuilderError> {
        let deleted = match SessionId::normalize(session_id) {
            Some(id) => self.sessions.delete(&id).await?,
            None => false,
        };
        tracing::info!(session.id = %session_id, deleted, "session ended");
        let message = if deleted {
            format!("Session '{session_id}' ended")
        } else {
            format!("Session '{session_id}' was not active")
        };
        Ok(MutationOutcome::new(message).with_detail("deleted", deleted))
    }
}
