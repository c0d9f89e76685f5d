use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber: human-readable lines on stderr (stdout is
/// kept for run summaries) and daily-rolled JSON files under `log_dir`.
///
/// `RUST_LOG` refines the default `catalog_sync=info`. Hold the returned
/// guard until exit so buffered file lines are flushed. Returns `None` when a
/// subscriber is already installed.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("cannot create log directory {}: {}", log_dir.display(), e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "catalog-sync.log"));

    let filter = match "catalog_sync=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok()
        .map(|_| guard)
}
