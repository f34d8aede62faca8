//! Operational helpers: logging setup.

use aegis_types::{config::OpsConfig, AegisError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber from configuration. An invalid
/// filter string is a configuration mistake worth surfacing; double
/// initialization (tests, embedded use) is tolerated.
pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| AegisError::Ops(format!("failed to create log filter: {err}")))?;

    let _ = fmt().with_env_filter(filter).try_init();
    Ok(())
}
