use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::transform::UnlabeledRows;

#[derive(Parser, Debug)]
#[command(
    name = "rowframe",
    version,
    about = "Turn SQL result sets into time-series frames"
)]
pub struct Cli {
    /// Log filter directive (e.g. info, rowframe=debug)
    #[arg(long, global = true, env = "ROWFRAME_LOG", default_value = "info")]
    pub log_filter: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the data-source query endpoint
    Serve {
        /// Listen address
        #[arg(long, env = "ROWFRAME_ADDR", default_value = "0.0.0.0:3100")]
        addr: String,
        /// Query service host
        #[arg(long, env = "ROWFRAME_API_SERVER")]
        api_server: String,
        /// Query service API key
        #[arg(long, env = "ROWFRAME_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Virtual instance to route queries to
        #[arg(long, env = "ROWFRAME_VIRTUAL_INSTANCE")]
        virtual_instance: Option<String>,
        /// What to do with rows missing the label column
        #[arg(long, value_enum, default_value = "include")]
        unlabeled_rows: UnlabeledRows,
    },
    /// Send one query to a running server and print the frames
    Query {
        /// Server address
        #[arg(long, default_value = "http://localhost:3100")]
        server: String,
        /// SQL text
        #[arg(long)]
        sql: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Transform a recorded query response offline
    Transform {
        /// Query model as JSON
        #[arg(long)]
        query: PathBuf,
        /// Recorded result set as JSON
        #[arg(long)]
        response: PathBuf,
        /// Query identifier, selects the mode
        #[arg(long, default_value = "A")]
        ref_id: String,
        /// Window start (e.g. 30s, 5m, 1h, 2d, now, or RFC3339)
        #[arg(long, default_value = "1h")]
        from: String,
        /// Window end
        #[arg(long, default_value = "now")]
        to: String,
        /// What to do with rows missing the label column
        #[arg(long, value_enum, default_value = "include")]
        unlabeled_rows: UnlabeledRows,
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Column holding the event time
    #[arg(long)]
    pub time_column: Option<String>,
    /// Column to split series by
    #[arg(long)]
    pub label_column: Option<String>,
    /// Name of the window start parameter
    #[arg(long)]
    pub param_start: Option<String>,
    /// Name of the window end parameter
    #[arg(long)]
    pub param_stop: Option<String>,
    #[arg(long, default_value = "0")]
    pub interval_ms: u64,
    #[arg(long, default_value = "0")]
    pub max_data_points: i32,
    /// Query identifier, selects the mode
    #[arg(long, default_value = "A")]
    pub ref_id: String,
    /// Window start (e.g. 30s, 5m, 1h, 2d, now, or RFC3339)
    #[arg(long, default_value = "1h")]
    pub from: String,
    /// Window end
    #[arg(long, default_value = "now")]
    pub to: String,
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}
