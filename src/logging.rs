// 📝 Logging - stderr plus an optional activity log in the output directory
//
// RUST_LOG controls both layers (default: info).

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Appended to on every run
pub const ACTIVITY_LOG: &str = "prayer_schedule_log.txt";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Non-blocking writer appending to <dir>/prayer_schedule_log.txt.
/// Keep the guard alive until exit or buffered lines are lost.
pub fn activity_log(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, ACTIVITY_LOG);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let (writer, guard) = activity_log(dir)?;
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr)
                .init();
            Ok(None)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing::info;

    fn write_run(dir: &Path, message: &str) {
        let (writer, guard) = activity_log(dir).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(writer));

        tracing::subscriber::with_default(subscriber, || {
            info!(week = 42, "{}", message);
        });
        drop(guard);
    }

    #[test]
    fn test_activity_log_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("output");

        write_run(&nested, "first run");
        write_run(&nested, "second run");

        let log = fs::read_to_string(nested.join(ACTIVITY_LOG)).unwrap();
        assert!(log.contains("first run"));
        assert!(log.contains("second run"));
        assert!(log.contains("week=42"));
    }
}
