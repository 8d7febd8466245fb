//! Subscriber setup

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use super::fields::RedactingFields;
use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Install the process-wide subscriber
///
/// `RUST_LOG` overrides the configured filter. Output goes to stderr.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| Error::Configuration(format!("invalid log filter: {}", e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(false)
        .fmt_fields(RedactingFields::new())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Configuration(format!("failed to install subscriber: {}", e)))
}

/// A scrubbing subscriber writing every level to `make_writer`, without ANSI
pub fn redacting_subscriber<W>(make_writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_ansi(false)
        .with_target(false)
        .fmt_fields(RedactingFields::new())
        .with_writer(make_writer)
        .finish()
}
