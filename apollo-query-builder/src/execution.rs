//! Running a materialized operation against its endpoint.
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use url::Url;

use crate::error::QueryBuilderError;
use crate::transport::header_map;

/// A GraphQL request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

/// Sends operations to a GraphQL endpoint and returns the raw JSON response.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    async fn execute(
        &self,
        request: GraphQLRequest,
        headers: &IndexMap<String, String>,
    ) -> Result<Value, QueryBuilderError>;
}

/// [`QueryExecutor`] over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
    client: Client,
    endpoint: Url,
}

impl HttpQueryExecutor {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    async fn execute(
        &self,
        request: GraphQLRequest,
        headers: &IndexMap<String, String>,
    ) -> Result<Value, QueryBuilderError> {
        let execution_error = |error: reqwest::Error| QueryBuilderError::Execution(error.to_string());
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(header_map(headers)?)
            .json(&request)
            .send()
            .await
            .map_err(execution_error)?;
        let status = response.status();
        // GraphQL servers may answer errors with a non-2xx status and a JSON body worth keeping.
        let body = response.bytes().await.map_err(execution_error)?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) if value.is_object() => Ok(value),
            _ if !status.is_success() => Err(QueryBuilderError::Execution(format!(
                "endpoint responded with HTTP {status}"
            ))),
            Ok(_) => Err(QueryBuilderError::Execution(
                "response is not a JSON object".to_string(),
            )),
            Err(error) => Err(QueryBuilderError::Execution(format!(
                "response is not valid JSON: {error}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;

    use super::*;

    fn request() -> GraphQLRequest {
        GraphQLRequest {
            query: "query { hello }".to_string(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    #[tokio::test]
    async fn posts_the_request_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer token"))
            .and(body_json(json!({"query": "query { hello }"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"hello": "world"}})))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpQueryExecutor::new(Client::new(), server.uri().parse().unwrap());
        let headers = IndexMap::from_iter([("Authorization".to_string(), "Bearer token".to_string())]);
        let response = executor.execute(request(), &headers).await.unwrap();
        assert_eq!(response, json!({"data": {"hello": "world"}}));
    }

    #[tokio::test]
    async fn graphql_error_bodies_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"errors": [{"message": "bad"}]})),
            )
            .mount(&server)
            .await;

        let executor = HttpQueryExecutor::new(Client::new(), server.uri().parse().unwrap());
        let response = executor.execute(request(), &IndexMap::new()).await.unwrap();
        assert_eq!(response["errors"][0]["message"], "bad");
    }

    #[tokio::test]
    async fn http_failures_without_a_body_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let executor = HttpQueryExecutor::new(Client::new(), server.uri().parse().unwrap());
        let error = executor
            .execute(request(), &IndexMap::new())
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Query execution failed: endpoint responded with HTTP 502 Bad Gateway"
        );
    }
}
