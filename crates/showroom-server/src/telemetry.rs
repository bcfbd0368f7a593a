use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global `fmt` subscriber.
///
/// An explicit `--log-level` directive wins over `RUST_LOG`; with neither,
/// the filter is `info`.
pub fn init(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log level {directive:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}
