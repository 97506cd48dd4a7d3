//! GraphQL-over-HTTP wire types and transports.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::GraphError;

/// A single GraphQL operation as POSTed to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl GraphRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Map::new(),
        }
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// Response body of a GraphQL endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphResponse {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub errors: Vec<GraphErrorEntry>,
}

/// One entry of a response's `errors` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphErrorEntry {
    pub message: String,
}

/// Executes GraphQL operations against a backend.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Sends `request` and returns the decoded response body.
    ///
    /// GraphQL-level errors are returned inside `GraphResponse::errors`,
    /// not as `Err`.
    async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, GraphError>;
}

/// JSON-over-HTTP transport bound to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpTransport {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            headers,
        }
    }
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, GraphError> {
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GraphError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<GraphResponse>().await?)
    }
}
