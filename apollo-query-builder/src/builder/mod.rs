//! Schema-aware editing of sessions.
//!
//! Every edit follows the same sequence: check the syntax of new identifiers and the shape of
//! caller supplied values, load the session, resolve the schema, validate the edit against it,
//! apply it to the loaded copy and save the whole state. Nothing is saved unless every check
//! passed, so a failed edit leaves the session untouched.
use std::num::NonZeroUsize;
use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::Client;

use crate::complexity::analyze;
use crate::configuration::Configuration;
use crate::configuration::SchemaValidation;
use crate::error::QueryBuilderError;
use crate::execution::HttpQueryExecutor;
use crate::execution::QueryExecutor;
use crate::schema::IntrospectionSchemaSource;
use crate::schema::SchemaCache;
use crate::schema::SchemaHandle;
use crate::schema::SchemaSource;
use crate::session::InMemorySessionStore;
use crate::session::SessionId;
use crate::session::SessionStore;
use crate::structure::SessionState;

mod arguments;
mod coerce;
mod cursor;
mod directives;
mod fragments;
mod input_object;
mod query;
mod select;
mod session;
mod variables;

/// Builds GraphQL operations one edit at a time.
///
/// Cloning is cheap and clones share the schema cache, session store and executor.
#[derive(Clone)]
pub struct QueryBuilder {
    configuration: Arc<Configuration>,
    schema_source: Arc<dyn SchemaSource>,
    schema_cache: Arc<SchemaCache>,
    sessions: Arc<dyn SessionStore>,
    executor: Option<Arc<dyn QueryExecutor>>,
}

impl QueryBuilder {
    /// A builder with an in-memory session store sized by `configuration` and its own schema
    /// cache. Operations are not executable until an executor is set.
    pub fn new(configuration: Configuration, schema_source: Arc<dyn SchemaSource>) -> Self {
        let sessions = InMemorySessionStore::new(
            NonZeroUsize::new(configuration.sessions.capacity).unwrap_or(NonZeroUsize::MIN),
            configuration.sessions.ttl,
        );
        Self {
            configuration: Arc::new(configuration),
            schema_source,
            schema_cache: Arc::new(SchemaCache::new()),
            sessions: Arc::new(sessions),
            executor: None,
        }
    }

    /// A builder that introspects and executes against `configuration.endpoint`.
    pub fn from_configuration(configuration: Configuration) -> Result<Self, QueryBuilderError> {
        let endpoint = configuration
            .endpoint
            .clone()
            .ok_or(QueryBuilderError::MissingEndpoint("schema introspection"))?;
        let client = Client::builder().build().map_err(|error| {
            QueryBuilderError::Execution(format!("could not create HTTP client: {error}"))
        })?;
        let schema_source = IntrospectionSchemaSource::new(client.clone(), endpoint.clone());
        Ok(Self::new(configuration, Arc::new(schema_source))
            .with_executor(Arc::new(HttpQueryExecutor::new(client, endpoint))))
    }

    /// Share a schema cache between builders.
    pub fn with_schema_cache(mut self, schema_cache: Arc<SchemaCache>) -> Self {
        self.schema_cache = schema_cache;
        self
    }

    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Load a session and the schema it is validated against.
    async fn edit(&self, session_id: &str) -> Result<Edit, QueryBuilderError> {
        let (session_id, state) = self.load(session_id).await?;
        let mut warnings = Vec::new();
        let schema = self.schema_for(&state.headers, &mut warnings).await?;
        Ok(Edit {
            session_id,
            state,
            schema,
            warnings,
        })
    }

    async fn load(&self, session_id: &str) -> Result<(SessionId, SessionState), QueryBuilderError> {
        let not_found = || QueryBuilderError::SessionNotFound {
            session_id: session_id.to_string(),
        };
        let id = SessionId::normalize(session_id).ok_or_else(not_found)?;
        let state = self.sessions.load(&id).await?.ok_or_else(not_found)?;
        Ok((id, state))
    }

    /// The schema for `headers`. Under advisory validation a fetch failure yields `None` and a
    /// warning instead of an error.
    async fn schema_for(
        &self,
        headers: &IndexMap<String, String>,
        warnings: &mut Vec<String>,
    ) -> Result<Option<SchemaHandle>, QueryBuilderError> {
        let fetched = self
            .schema_cache
            .get_or_fetch(
                self.schema_source.as_ref(),
                headers,
                self.configuration.timeouts.default,
            )
            .await;
        match fetched {
            Ok(schema) => Ok(Some(schema)),
            Err(error) if self.configuration.schema_validation == SchemaValidation::Advisory => {
                tracing::warn!(%error, "proceeding without schema validation");
                warnings.push(format!(
                    "Schema unavailable ({error}); proceeding without schema validation"
                ));
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Reject a grown selection tree that crosses a fatal complexity ceiling.
    fn check_complexity(&self, edit: &mut Edit) -> Result<(), QueryBuilderError> {
        let report = analyze(&edit.state.query_structure, &self.configuration.limits);
        if !report.valid {
            return Err(QueryBuilderError::QueryTooComplex(report.errors.join("; ")));
        }
        if !report.warnings.is_empty() {
            tracing::warn!(
                session.id = %edit.session_id,
                depth = report.depth,
                score = report.complexity_score,
                "operation is approaching complexity limits"
            );
            edit.warnings.extend(report.warnings);
        }
        Ok(())
    }

    /// Save the edited state and hand back the warnings gathered on the way.
    async fn commit(&self, edit: Edit) -> Result<Vec<String>, QueryBuilderError> {
        let Edit {
            session_id,
            state,
            warnings,
            ..
        } = edit;
        self.save(&session_id, &state).await?;
        Ok(warnings)
    }

    async fn save(&self, id: &SessionId, state: &SessionState) -> Result<u64, QueryBuilderError> {
        let settings = &self.configuration.sessions;
        let mut backoff = settings.retry_backoff;
        let mut attempt = 1;
        loop {
            match self.sessions.save(id, state).await {
                Ok(revision) => return Ok(revision),
                Err(error) if error.is_retryable() && attempt < settings.save_attempts => {
                    tracing::warn!(session.id = %id, attempt, %error, "retrying session save");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// A loaded session being edited.
struct Edit {
    session_id: SessionId,
    state: SessionState,
    /// `None` when the schema could not be fetched under advisory validation.
    schema: Option<SchemaHandle>,
    warnings: Vec<String>,
}
