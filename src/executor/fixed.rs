use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;

use super::QueryExecutor;
use crate::error::ExecutionError;
use crate::model::ResultSet;
use crate::query::ExecutionRequest;

/// Answers every query with the same recorded response and remembers what
/// it was asked.
pub struct FixedExecutor {
    response: Result<ResultSet, FixedFailure>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

#[derive(Clone)]
struct FixedFailure {
    status: u16,
    message: String,
}

impl FixedExecutor {
    pub fn new(response: ResultSet) -> Self {
        Self {
            response: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every query with a service error of the given HTTP status.
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            response: Err(FixedFailure {
                status,
                message: message.into(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Load a response recorded from the query service's JSON API.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let response: ResultSet = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::new(response))
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl QueryExecutor for FixedExecutor {
    async fn query(&self, request: &ExecutionRequest) -> Result<ResultSet, ExecutionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.response {
            Ok(rs) => Ok(rs.clone()),
            Err(failure) => Err(ExecutionError::Api {
                status: failure.status,
                message: failure.message.clone(),
                error_id: None,
                query_id: None,
                line: None,
                column: None,
            }),
        }
    }
}
