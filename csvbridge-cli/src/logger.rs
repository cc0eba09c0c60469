//! Logging initialisation via tracing-subscriber
//!
//! Diagnostics go to stderr so `--json` output on stdout stays clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "warn";

/// Initialise the global tracing subscriber
///
/// With `prefer_level` the given level wins and `RUST_LOG` is only a
/// fallback for an invalid level. Otherwise `RUST_LOG` wins and `level` is
/// the fallback.
pub fn init(level: &str, prefer_level: bool) -> Result<()> {
    let filter = if prefer_level {
        match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(level_err) => EnvFilter::try_from_default_env().map_err(|env_err| {
                anyhow!(
                    "invalid log level '{}': {}; RUST_LOG parse failed: {}",
                    level,
                    level_err,
                    env_err
                )
            })?,
        }
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| anyhow!("invalid log level '{}': {}", level, e))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to set subscriber: {}", e))?;

    Ok(())
}
