use std::path::PathBuf;

use directories::ProjectDirs;
use skyfollow_core::Error;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::set_global_default;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Daily log files kept on disk
const RETAINED_LOG_FILES: usize = 14;

/// HTTP stack crates that are only interesting when something breaks
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn";

/// Directory that receives the daily log files
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("social", "skyfollow", "skyfollow")
        .map(|d| d.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Filter used by both layers.
///
/// `RUST_LOG` replaces everything. Otherwise `level` applies to our crates
/// and the HTTP stack is held at warn; an unknown level falls back to info.
pub fn filter_for(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    EnvFilter::new(format!("{},{}", level, QUIET_DEPENDENCIES))
}

/// Install stderr logging plus a JSON-lines file per day under [`log_dir`].
///
/// Console output goes to stderr so it does not interleave with the CLI's
/// own stdout. Keep the returned guard alive until exit or buffered file
/// output is lost.
pub fn init_subscriber(name: &str, level: &str) -> Result<WorkerGuard, Error> {
    LogTracer::init().map_err(|e| Error::Other(format!("log bridge: {}", e)))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .filename_suffix("log")
        .max_log_files(RETAINED_LOG_FILES)
        .build(log_dir())
        .map_err(|e| Error::Other(format!("log file: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    let file = fmt::layer().json().with_writer(writer);

    let subscriber = Registry::default()
        .with(filter_for(level))
        .with(console)
        .with(file);

    set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("tracing subscriber: {}", e)))?;

    Ok(guard)
}
