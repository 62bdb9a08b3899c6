//! Logging for reclaimx
//!
//! Full diagnostics go to `$XDG_STATE_HOME/reclaimx/reclaimx.log`, rotated
//! daily. Warnings and errors, such as skipped malformed rows, are echoed to
//! stderr so an operator sees them without opening the log.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::io;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Install the global subscriber.
///
/// The file filter comes from `RUST_LOG` when set, otherwise from
/// `config.level`. The returned guard must live until exit.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_path = Config::log_path();
    let file_appender = open_appender(&log_path, config.max_files)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_filter(filter);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(
        log_path = %log_path.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Daily-rotating appender writing `<log_path>.<date>` files next to
/// `log_path`, keeping at most `max_files` of them.
fn open_appender(log_path: &Path, max_files: usize) -> Result<RollingFileAppender> {
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(log_dir)?;

    let prefix = log_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reclaimx.log".to_string());

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1))
        .build(log_dir)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the non-blocking file writer alive; pending lines flush on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
