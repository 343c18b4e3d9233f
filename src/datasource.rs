//! Batch query handling: one response slot per query, failures isolated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, Instrument};

use crate::config::Settings;
use crate::error::{QueryError, Status};
use crate::executor::QueryExecutor;
use crate::frame::Frame;
use crate::model::ResultSet;
use crate::query::{bind, ExecutionRequest, QueryDescriptor, QueryKind, TimeRange};
use crate::transform::{annotation_frames, metrics_frames, variable_frame};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub ref_id: String,
    pub time_range: TimeRange,
    /// The query model, decoded into a [`QueryDescriptor`] when run.
    #[serde(default)]
    pub json: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: Status,
}

impl DataResponse {
    pub fn ok(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            error: None,
            status: Status::Ok,
        }
    }

    pub fn error(err: &QueryError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(err.to_string()),
            status: err.status(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

pub struct Datasource<E> {
    executor: E,
    settings: Settings,
}

impl<E: QueryExecutor> Datasource<E> {
    pub fn new(executor: E, settings: Settings) -> Self {
        Self { executor, settings }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run the queries one after another, in request order.
    pub async fn query_data(&self, request: &QueryDataRequest) -> QueryDataResponse {
        info!(count = request.queries.len(), "got queries");
        let mut response = QueryDataResponse::default();

        for query in &request.queries {
            let kind = QueryKind::from_ref_id(&query.ref_id);
            let span = info_span!("query", ref_id = %query.ref_id, kind = ?kind);
            let result = self.run(query, kind).instrument(span.clone()).await;

            let slot = match result {
                Ok(frames) => DataResponse::ok(frames),
                Err(err) => {
                    span.in_scope(|| {
                        error!(status = err.status().code(), error = %err, "query failed")
                    });
                    DataResponse::error(&err)
                }
            };
            response.responses.insert(query.ref_id.clone(), slot);
        }

        response
    }

    async fn run(&self, query: &DataQuery, kind: QueryKind) -> Result<Vec<Frame>, QueryError> {
        let descriptor = QueryDescriptor::from_json(&query.json)?;
        let vi = self.settings.virtual_instance.as_deref();

        // Variable queries populate dropdowns and don't depend on the window.
        let request = match kind {
            QueryKind::Variables => ExecutionRequest::new(descriptor.query_text.as_str(), vi),
            _ => bind(&descriptor, &query.time_range, vi),
        };

        info!(sql = %descriptor.query_text, "executing query");
        let rs = self.executor.query(&request).await?;
        log_result_set(&rs);

        match kind {
            QueryKind::Metrics => metrics_frames(&descriptor, &rs, self.settings.unlabeled_rows),
            QueryKind::Annotations => annotation_frames(&descriptor, &rs),
            QueryKind::Variables => variable_frame(&descriptor.query_text, &rs).map(|f| vec![f]),
        }
    }
}

fn log_result_set(rs: &ResultSet) {
    let errors: Vec<&str> = rs.query_errors.iter().map(|e| e.message.as_str()).collect();
    info!(
        elapsed_ms = rs.stats.elapsed_time_ms,
        docs = rs.rows.len(),
        errors = ?errors,
        warnings = %rs.warnings.join(", "),
        query_id = rs.query_id.as_deref().unwrap_or_default(),
        pagination = rs.next_cursor().unwrap_or_default(),
        "query response"
    );
}
