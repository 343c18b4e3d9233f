use std::sync::Arc;

use clap::Parser;
use rowframe::cli::{Cli, Commands};
use rowframe::config::Settings;
use rowframe::datasource::Datasource;
use rowframe::executor::HttpExecutor;
use rowframe::{client, server, telemetry};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_filter)?;

    match cli.command {
        Commands::Serve {
            addr,
            api_server,
            api_key,
            virtual_instance,
            unlabeled_rows,
        } => {
            let settings = Settings::new(api_server, api_key)
                .with_virtual_instance(virtual_instance)
                .with_unlabeled_rows(unlabeled_rows);
            let executor =
                HttpExecutor::new(&settings.api_server, &settings.api_key, &settings.user_agent);
            let datasource = Arc::new(Datasource::new(executor, settings));

            let addr: std::net::SocketAddr = addr.parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            let shutdown = CancellationToken::new();
            let handle = tokio::spawn(server::run_server(
                listener,
                datasource,
                shutdown.clone(),
            ));

            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
            shutdown.cancel();
            handle.await??;
            Ok(())
        }
        Commands::Query {
            server,
            sql,
            query,
            format,
        } => {
            client::query::run_query(&server, &sql, &query, &format).await?;
            Ok(())
        }
        Commands::Transform {
            query,
            response,
            ref_id,
            from,
            to,
            unlabeled_rows,
            format,
        } => {
            client::transform::run_transform(
                &query,
                &response,
                &ref_id,
                &from,
                &to,
                unlabeled_rows,
                &format,
            )
            .await?;
            Ok(())
        }
    }
}
