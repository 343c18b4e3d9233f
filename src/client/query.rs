use anyhow::Context;
use tracing::debug;

use crate::cli::{OutputFormat, QueryArgs};
use crate::config::USER_AGENT;
use crate::datasource::{DataQuery, QueryDataRequest, QueryDataResponse};

use super::{descriptor, parse_time_range, print_response};

/// Send a single query to a running server.
pub async fn run_query(
    server: &str,
    sql: &str,
    args: &QueryArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let request = QueryDataRequest {
        queries: vec![DataQuery {
            ref_id: args.ref_id.clone(),
            time_range: parse_time_range(&args.from, &args.to)?,
            json: serde_json::to_value(descriptor(sql, args))?,
        }],
    };
    let response = post_queries(server, &request).await?;
    print_response(&response, format)
}

pub async fn post_queries(
    server: &str,
    request: &QueryDataRequest,
) -> anyhow::Result<QueryDataResponse> {
    let url = format!("{}/api/ds/query", server.trim_end_matches('/'));
    debug!(url = %url, queries = request.queries.len(), "posting queries");

    let response = reqwest::Client::new()
        .post(&url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .json(request)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", url))?
        .error_for_status()?;

    Ok(response.json::<QueryDataResponse>().await?)
}
