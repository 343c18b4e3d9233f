pub mod fixed;
pub mod http;

use std::future::Future;

use crate::error::ExecutionError;
use crate::model::ResultSet;
use crate::query::ExecutionRequest;

pub use fixed::FixedExecutor;
pub use http::HttpExecutor;

/// Runs SQL against the query service. Cancellation and timeouts belong to
/// the implementation.
pub trait QueryExecutor: Send + Sync + 'static {
    fn query(
        &self,
        request: &ExecutionRequest,
    ) -> impl Future<Output = Result<ResultSet, ExecutionError>> + Send;
}
