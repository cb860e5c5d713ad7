//! Logging setup.
//!
//! The release binary has no console, so logs go to `audio-switcher.log`
//! beside the executable. `AUDIO_SWITCHER_LOG` takes an `EnvFilter`
//! directive (default `info`).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "AUDIO_SWITCHER_LOG";
pub const LOG_FILE_NAME: &str = "audio-switcher.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `dir/audio-switcher.log`.
///
/// Keep the returned guard alive for the life of the process; dropping
/// it flushes buffered lines.
pub fn init(dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // A second init (e.g. in tests) leaves the first subscriber in place
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true),
        )
        .try_init();

    guard
}

/// Log directory: the executable's folder, falling back to the temp dir.
pub fn default_dir() -> std::path::PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(std::env::temp_dir)
}
