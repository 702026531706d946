//! Logging setup.
//!
//! Logs go to stderr so that stdout carries only the round reports and
//! the final price summary.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
