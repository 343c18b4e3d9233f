use chrono::SecondsFormat;
use serde::Serialize;
use tracing::info;

use super::{QueryDescriptor, TimeRange};

/// A named SQL parameter as the query service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub value: String,
}

impl Parameter {
    fn int(name: &str, value: u64) -> Self {
        Self {
            name: name.to_string(),
            type_name: "int",
            value: value.to_string(),
        }
    }

    fn timestamp(name: &str, value: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            name: name.to_string(),
            type_name: "timestamp",
            value: value.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Everything needed to run one query against the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub row_limit: Option<u32>,
    /// Routing target; travels outside the SQL parameters.
    pub virtual_instance: Option<String>,
}

impl ExecutionRequest {
    /// A request with no bound parameters.
    pub fn new(sql: impl Into<String>, virtual_instance: Option<&str>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
            row_limit: None,
            virtual_instance: virtual_instance
                .filter(|vi| !vi.is_empty())
                .map(str::to_string),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Bind a descriptor and a time window into an execution request.
pub fn bind(
    descriptor: &QueryDescriptor,
    range: &TimeRange,
    virtual_instance: Option<&str>,
) -> ExecutionRequest {
    let mut request = ExecutionRequest::new(descriptor.query_text.as_str(), virtual_instance);

    if descriptor.interval_ms > 0 {
        request
            .parameters
            .push(Parameter::int("interval", descriptor.interval_ms));
    }
    request
        .parameters
        .push(Parameter::timestamp(descriptor.param_start(), range.from));
    request
        .parameters
        .push(Parameter::timestamp(descriptor.param_stop(), range.to));
    request.row_limit = u32::try_from(descriptor.max_data_points)
        .ok()
        .filter(|n| *n > 0);

    info!(
        interval = descriptor.interval_ms,
        row_limit = ?request.row_limit,
        from = %range.from,
        to = %range.to,
        duration_secs = (range.to - range.from).num_seconds(),
        start_param = descriptor.param_start(),
        stop_param = descriptor.param_stop(),
        virtual_instance = ?request.virtual_instance,
        "bound query parameters"
    );

    request
}
