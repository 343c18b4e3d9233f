use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::QueryExecutor;
use crate::error::ExecutionError;
use crate::model::ResultSet;
use crate::query::{ExecutionRequest, Parameter};

/// Client for the query service's REST API.
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    server: String,
    api_key: String,
    user_agent: String,
}

#[derive(Serialize)]
struct QueryRequestBody<'a> {
    sql: SqlBody<'a>,
}

#[derive(Serialize)]
struct SqlBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "no_parameters")]
    parameters: &'a [Parameter],
    #[serde(skip_serializing_if = "Option::is_none")]
    default_row_limit: Option<u32>,
}

fn no_parameters(parameters: &&[Parameter]) -> bool {
    parameters.is_empty()
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_id: Option<String>,
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

impl HttpExecutor {
    pub fn new(server: &str, api_key: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            server: normalize_server(server),
            api_key: api_key.into(),
            user_agent: user_agent.into(),
        }
    }

    fn endpoint(&self, virtual_instance: Option<&str>) -> String {
        match virtual_instance {
            Some(vi) => format!(
                "{}/v1/orgs/self/virtualinstances/{}/queries",
                self.server, vi
            ),
            None => format!("{}/v1/orgs/self/queries", self.server),
        }
    }
}

fn normalize_server(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}

impl QueryExecutor for HttpExecutor {
    async fn query(&self, request: &ExecutionRequest) -> Result<ResultSet, ExecutionError> {
        let url = self.endpoint(request.virtual_instance.as_deref());
        let body = QueryRequestBody {
            sql: SqlBody {
                query: &request.sql,
                parameters: &request.parameters,
                default_row_limit: request.row_limit,
            },
        };
        debug!(url = %url, "sending query");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("ApiKey {}", self.api_key))
            .header(USER_AGENT, &self.user_agent)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
                message: text.clone(),
                ..Default::default()
            });
            info!(status = status.as_u16(), error_id = ?body.error_id, "query rejected");
            return Err(ExecutionError::Api {
                status: status.as_u16(),
                message: body.message,
                error_id: body.error_id,
                query_id: body.query_id,
                line: body.line,
                column: body.column,
            });
        }

        Ok(response.json::<ResultSet>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_gets_a_scheme() {
        assert_eq!(
            normalize_server("api.usw2a1.example.com"),
            "https://api.usw2a1.example.com"
        );
        assert_eq!(
            normalize_server("http://localhost:8080/"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn routing_target_selects_endpoint() {
        let ex = HttpExecutor::new("localhost", "key", "rowframe");
        assert_eq!(ex.endpoint(None), "https://localhost/v1/orgs/self/queries");
        assert_eq!(
            ex.endpoint(Some("vi-1")),
            "https://localhost/v1/orgs/self/virtualinstances/vi-1/queries"
        );
    }

    #[test]
    fn request_body_shape() {
        let params = vec![Parameter {
            name: "startTime".to_string(),
            type_name: "timestamp",
            value: "2024-01-23T19:25:00Z".to_string(),
        }];
        let body = QueryRequestBody {
            sql: SqlBody {
                query: "SELECT 1",
                parameters: &params,
                default_row_limit: Some(10),
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "sql": {
                    "query": "SELECT 1",
                    "parameters": [
                        {"name": "startTime", "type": "timestamp", "value": "2024-01-23T19:25:00Z"}
                    ],
                    "default_row_limit": 10
                }
            })
        );
    }

    #[test]
    fn error_body_tolerates_missing_fields() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "bad", "line": 2, "column": 5}"#).unwrap();
        assert_eq!(body.message, "bad");
        assert_eq!(body.line, Some(2));
        assert_eq!(body.error_id, None);
    }
}
