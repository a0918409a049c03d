//! Tracing initialization.
//!
//! Log verbosity follows the standard `RUST_LOG` environment variable (default `info`), e.g.
//!
//! ```bash
//! RUST_LOG=imgdrop=debug,tower_http=debug imgdrop
//! ```
//!
//! The line format is chosen by the `log_format` configuration field.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
    }

    info!(?format, "Telemetry initialized");
    Ok(())
}
