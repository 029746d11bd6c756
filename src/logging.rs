/*!
 * Structured Logging
 *
 * Optional `tracing` subscriber for programs embedding the shim. The
 * library itself only emits events on cold paths (init, switch
 * transitions, exit guard, fatal dispatch errors) and only while
 * interception is off, so whatever locks the subscriber takes never reach
 * a strategy.
 *
 * Environment variables:
 * - RUST_LOG: log level filter (default: info)
 * - LOCKSHIM_TRACE_JSON: JSON output when `1` or `true`
 */

use tracing::info;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Format requested through `LOCKSHIM_TRACE_JSON`
    pub fn from_env() -> Self {
        let use_json = std::env::var("LOCKSHIM_TRACE_JSON")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        if use_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// Install a global subscriber writing to stderr
///
/// Call it before enabling interception. Fails if a global subscriber is
/// already set.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .compact(),
                )
                .try_init()?;
        }
    }

    info!(?format, "lockshim tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_format_from_env() {
        std::env::set_var("LOCKSHIM_TRACE_JSON", "true");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("LOCKSHIM_TRACE_JSON", "0");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);

        std::env::remove_var("LOCKSHIM_TRACE_JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
    }

    #[test]
    #[serial]
    fn test_second_init_is_rejected() {
        // the first call may lose to another test's subscriber
        let _ = init_tracing(LogFormat::Compact);
        assert!(init_tracing(LogFormat::Json).is_err());
    }
}
