use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use url::Url;

use super::SchemaHandle;
use super::introspection::INTROSPECTION_QUERY;
use super::introspection::IntrospectionResponse;
use crate::error::QueryBuilderError;
use crate::transport::header_map;

/// Where schemas come from.
///
/// Implementations are called at most once per cache key by [`super::SchemaCache`].
#[async_trait]
pub trait SchemaSource: Send + Sync + 'static {
    /// Identity of the schema endpoint, part of the cache key.
    fn endpoint(&self) -> &str;

    /// Fetch the schema as seen with `headers`.
    async fn fetch_schema(
        &self,
        headers: &IndexMap<String, String>,
    ) -> Result<SchemaHandle, QueryBuilderError>;
}

/// A fixed schema given as SDL.
#[derive(Debug, Clone)]
pub struct SdlSchemaSource {
    name: String,
    sdl: String,
}

impl SdlSchemaSource {
    pub fn new(name: impl Into<String>, sdl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sdl: sdl.into(),
        }
    }
}

#[async_trait]
impl SchemaSource for SdlSchemaSource {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn fetch_schema(
        &self,
        _headers: &IndexMap<String, String>,
    ) -> Result<SchemaHandle, QueryBuilderError> {
        SchemaHandle::parse(&self.sdl)
    }
}

/// Fetches the schema of a remote endpoint with the standard introspection query.
#[derive(Debug, Clone)]
pub struct IntrospectionSchemaSource {
    client: Client,
    endpoint: Url,
}

impl IntrospectionSchemaSource {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl SchemaSource for IntrospectionSchemaSource {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn fetch_schema(
        &self,
        headers: &IndexMap<String, String>,
    ) -> Result<SchemaHandle, QueryBuilderError> {
        let fetch_error = |error: reqwest::Error| QueryBuilderError::SchemaFetch(error.to_string());
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(header_map(headers)?)
            .json(&serde_json::json!({
                "query": INTROSPECTION_QUERY,
                "operationName": "IntrospectionQuery",
            }))
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryBuilderError::SchemaFetch(format!(
                "endpoint responded with HTTP {status}"
            )));
        }
        let body: IntrospectionResponse = response.json().await.map_err(fetch_error)?;
        if let Some(error) = body.errors.first() {
            return Err(QueryBuilderError::SchemaFetch(error.message.clone()));
        }
        let data = body.data.ok_or_else(|| {
            QueryBuilderError::SchemaFetch("response contains no data".to_string())
        })?;
        let sdl = data.schema.to_string();
        tracing::debug!(endpoint = %self.endpoint, "introspected schema");
        SchemaHandle::parse(&sdl)
            .map_err(|error| QueryBuilderError::SchemaFetch(error.to_string()))
    }
}
