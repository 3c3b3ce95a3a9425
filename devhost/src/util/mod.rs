pub mod wait;

use std::path::Path;

use devhost_shared::errors::DevhostResult;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub use wait::{WaitOptions, wait_for, wait_for_with};

pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}

/// Initialize tracing with file logging.
///
/// Logs are written to `{logs_dir}/devhost.log` with daily rotation.
/// The returned guard must be kept alive to flush the background writer.
pub fn init_logging(logs_dir: &Path) -> DevhostResult<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "devhost.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Defaults to "info" if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    register_to_tracing(non_blocking, env_filter);

    Ok(guard)
}
