use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Events go to stderr so command output on
/// stdout stays machine-readable.
pub fn init(filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}
