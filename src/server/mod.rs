pub mod http;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::datasource::Datasource;
use crate::executor::QueryExecutor;

pub async fn run_server<E: QueryExecutor>(
    listener: TcpListener,
    datasource: Arc<Datasource<E>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "query endpoint listening");
    let app = http::router(datasource);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
