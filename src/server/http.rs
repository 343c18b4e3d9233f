use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::datasource::{Datasource, QueryDataRequest, QueryDataResponse};
use crate::executor::QueryExecutor;

pub fn router<E: QueryExecutor>(datasource: Arc<Datasource<E>>) -> Router {
    Router::new()
        .route("/api/ds/query", post(handle_query::<E>))
        .route("/api/health", get(handle_health))
        .with_state(datasource)
}

/// Per-query failures are reported inside the body; the batch itself
/// always answers 200 once the request decodes.
async fn handle_query<E: QueryExecutor>(
    State(datasource): State<Arc<Datasource<E>>>,
    Json(request): Json<QueryDataRequest>,
) -> Json<QueryDataResponse> {
    Json(datasource.query_data(&request).await)
}

async fn handle_health() -> &'static str {
    "ok"
}
