//! Logging for the `sofa-mock` binary
//!
//! Request spans from `TracingLogger` are printed to stdout. When a log
//! directory is configured they are also written as JSON lines to
//! `sofa-mock.log`, rotated by size. `RUST_LOG` replaces the default filter.

use anyhow::Result;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use sofa_mock::MockConfig;

const LOG_FILE: &str = "sofa-mock.log";
const DEFAULT_FILTER: &str = "sofa_mock=debug,actix_web=info";
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 3;

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init_telemetry(config: &MockConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = fmt::layer()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let (file, guard) = match log_file_writer(&config.log_dir)? {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}

/// Non-blocking writer onto the rolling log file, or `None` for an empty dir
fn log_file_writer(log_dir: &str) -> Result<Option<(NonBlocking, WorkerGuard)>> {
    if log_dir.is_empty() {
        return Ok(None);
    }

    let log_dir = Path::new(log_dir);
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(
        log_dir.join(LOG_FILE),
        RollingConditionBasic::new().max_size(MAX_LOG_BYTES),
        KEPT_LOG_FILES,
    )?;

    Ok(Some(tracing_appender::non_blocking(appender)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_dir_disables_file_output() {
        assert!(log_file_writer("").unwrap().is_none());
    }

    #[test]
    fn test_log_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("sofa-mock-logs-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let writer = log_file_writer(dir.to_str().unwrap()).unwrap();
        assert!(writer.is_some());
        assert!(dir.is_dir());

        drop(writer);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
