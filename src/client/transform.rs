use std::path::Path;

use anyhow::Context;

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::datasource::{DataQuery, Datasource, QueryDataRequest, QueryDataResponse};
use crate::executor::FixedExecutor;
use crate::query::TimeRange;
use crate::transform::UnlabeledRows;

use super::{parse_time_range, print_response};

/// Everything needed to replay one recorded response.
pub struct Replay<'a> {
    pub query: &'a Path,
    pub response: &'a Path,
    pub ref_id: &'a str,
    pub range: TimeRange,
    pub unlabeled_rows: UnlabeledRows,
}

/// Run the transformation on a recorded response without a query service.
pub async fn replay(replay: Replay<'_>) -> anyhow::Result<QueryDataResponse> {
    let raw = std::fs::read_to_string(replay.query)
        .with_context(|| format!("failed to read {}", replay.query.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", replay.query.display()))?;

    let executor = FixedExecutor::from_file(replay.response)?;
    let settings = Settings::new("", "").with_unlabeled_rows(replay.unlabeled_rows);
    let datasource = Datasource::new(executor, settings);

    let request = QueryDataRequest {
        queries: vec![DataQuery {
            ref_id: replay.ref_id.to_string(),
            time_range: replay.range,
            json,
        }],
    };
    Ok(datasource.query_data(&request).await)
}

pub async fn run_transform(
    query: &Path,
    response: &Path,
    ref_id: &str,
    from: &str,
    to: &str,
    unlabeled_rows: UnlabeledRows,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let response = replay(Replay {
        query,
        response,
        ref_id,
        range: parse_time_range(from, to)?,
        unlabeled_rows,
    })
    .await?;
    print_response(&response, format)
}
