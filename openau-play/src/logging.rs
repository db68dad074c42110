//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Filter directives applying `level` to this crate and openau-core
pub fn default_directives(level: &str) -> String {
    format!("openau_play={level},openau_core={level}")
}

/// Build the filter: an explicit level wins, then `RUST_LOG`, then
/// `fallback_level`.
pub fn build_filter(explicit_level: Option<&str>, fallback_level: &str) -> Result<EnvFilter> {
    if let Some(level) = explicit_level {
        return EnvFilter::try_new(default_directives(level))
            .map_err(|e| Error::Logging(format!("invalid log level '{}': {}", level, e)));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directives(fallback_level))
            .map_err(|e| Error::Logging(format!("invalid log level '{}': {}", fallback_level, e))),
    }
}

/// Install the global subscriber (stderr, so stdout stays clean for
/// `--list-devices --json`).
pub fn init(filter: EnvFilter) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
