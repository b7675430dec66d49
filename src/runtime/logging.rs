//! Log routing for the TUI.
//!
//! Everything goes to a file through a non-blocking writer; logging to the
//! terminal would fight the alternate screen.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. The returned guard must stay alive
/// for the lifetime of the process or buffered lines are dropped.
pub fn init() -> Option<WorkerGuard> {
    let dir = dirs::state_dir().or_else(dirs::cache_dir)?.join("kiai");
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(&dir, "kiai.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "kiai=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
