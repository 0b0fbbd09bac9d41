//! Logging for Pictura
//!
//! Structured `tracing` output goes to stderr so that stdout stays free for
//! command results.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when the configured one does not parse
const FALLBACK_FILTER: &str = "warn";

/// Install the global subscriber
///
/// `log_filter` uses `EnvFilter` directive syntax, e.g.
/// `info,pictura_imagegen=debug`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(log_filter: &str, ansi: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(filter = log_filter, "logging initialized");
    Ok(())
}
