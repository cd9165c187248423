use anyhow::Context;
use linkbio_core::{init_tracing, Database, PublishScheduler, Settings};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("failed to load settings")?;
    init_tracing(&settings.log_dir, &settings.log_level).context("failed to initialise logging")?;

    let db = Arc::new(
        Database::open(&settings.database_path, settings.busy_timeout())
            .with_context(|| format!("failed to open {}", settings.database_path.display()))?,
    );
    tracing::info!(
        database = %settings.database_path.display(),
        sweep_interval_secs = settings.publish_sweep_interval_secs,
        "linkbio publish daemon starting"
    );

    let scheduler = PublishScheduler::new(db, settings.sweep_interval());
    let handle = scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    scheduler.shutdown();
    handle.await.context("publish scheduler task panicked")?;
    tracing::info!("linkbio publish daemon stopped");
    Ok(())
}
