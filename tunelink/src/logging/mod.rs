//! Logging setup.
//!
//! Console output goes to stderr because stdout carries native messaging
//! frames. A daily-rolling file can be added with a log directory.

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "tunelink=info,spotify_auth=info,reqwest=warn";

const LOG_FILE_PREFIX: &str = "tunelink.log";

/// Timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Pick the filter: `RUST_LOG` wins, then the verbosity flags, then the default.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = if quiet {
        "warn"
    } else if verbose {
        "tunelink=debug,spotify_auth=debug,reqwest=info"
    } else {
        DEFAULT_LOG_FILTER
    };
    EnvFilter::new(directive)
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process, otherwise
/// buffered file output is lost.
pub fn init_logging(
    verbose: bool,
    quiet: bool,
    log_dir: Option<&Path>,
) -> crate::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer)
                .with_target(verbose),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(DEFAULT_LOG_FILTER.contains("tunelink=info"));
        assert!(DEFAULT_LOG_FILTER.contains("reqwest=warn"));
    }

    #[test]
    fn test_directive_parses() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert!(filter.to_string().contains("spotify_auth=info"));
    }
}
