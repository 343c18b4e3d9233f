pub mod cli;
pub mod client;
pub mod config;
pub mod datasource;
pub mod error;
pub mod executor;
pub mod frame;
pub mod model;
pub mod query;
pub mod server;
pub mod telemetry;
pub mod transform;
