pub mod params;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

pub use params::{bind, ExecutionRequest, Parameter};

pub const DEFAULT_TIME_COLUMN: &str = "_event_time";
pub const DEFAULT_PARAM_START: &str = "startTime";
pub const DEFAULT_PARAM_STOP: &str = "stopTime";

/// Which frame layout a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Metrics,
    Annotations,
    Variables,
}

impl QueryKind {
    /// The host marks annotation and template-variable queries by refId.
    pub fn from_ref_id(ref_id: &str) -> Self {
        match ref_id {
            "Anno" => QueryKind::Annotations,
            "variable-query" => QueryKind::Variables,
            _ => QueryKind::Metrics,
        }
    }

    pub fn frame_name(self) -> &'static str {
        match self {
            QueryKind::Metrics => "metrics",
            QueryKind::Annotations => "annotations",
            QueryKind::Variables => "variables",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

/// The query model as the host sends it. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDescriptor {
    pub query_text: String,
    pub query_time_field: String,
    pub query_label_column: String,
    pub query_param_start: String,
    pub query_param_stop: String,
    pub interval_ms: u64,
    pub max_data_points: i32,
}

impl QueryDescriptor {
    pub fn from_json(json: &serde_json::Value) -> Result<Self, QueryError> {
        Self::deserialize(json).map_err(QueryError::BadRequest)
    }

    pub fn time_column(&self) -> &str {
        non_empty_or(&self.query_time_field, DEFAULT_TIME_COLUMN)
    }

    /// Empty means the result is not grouped.
    pub fn label_column(&self) -> &str {
        &self.query_label_column
    }

    pub fn param_start(&self) -> &str {
        placeholder_name(&self.query_param_start, DEFAULT_PARAM_START)
    }

    pub fn param_stop(&self) -> &str {
        placeholder_name(&self.query_param_stop, DEFAULT_PARAM_STOP)
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

// Placeholders are written `:startTime` in SQL; the service wants the bare name.
fn placeholder_name<'a>(value: &'a str, default: &'a str) -> &'a str {
    non_empty_or(value.strip_prefix(':').unwrap_or(value), default)
}
