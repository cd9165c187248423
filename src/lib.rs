pub mod config;
pub mod db;
pub mod display;
pub mod errors;
pub mod models;
pub mod pages;
pub mod scheduler;

pub use crate::config::Settings;
pub use crate::db::Database;
pub use crate::errors::{AppError, AppResult};
pub use crate::pages::PageCore;
pub use crate::scheduler::PublishScheduler;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// JSON logs to a daily rolling file under `log_dir`. `RUST_LOG` wins over
/// `default_level` when set.
pub fn init_tracing(log_dir: &Path, default_level: &str) -> AppResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "linkbio.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
