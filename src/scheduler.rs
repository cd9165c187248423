use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::SweepReport;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

/// Periodic publish/expiry sweep. Independent of the ordering engine: it
/// only flips `is_active`.
#[derive(Clone)]
pub struct PublishScheduler {
    db: Arc<Database>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl PublishScheduler {
    pub fn new(db: Arc<Database>, interval: Duration) -> Self {
        Self {
            db,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// One pass at `now`, run off the async workers.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.sweep_schedules(now))
            .await
            .map_err(|error| AppError::Internal(format!("publish sweep task failed: {}", error)))?
    }

    /// Spawns the sweep loop. The first sweep runs immediately.
    pub fn start(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_loop().await;
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    async fn run_loop(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "publish scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = ticker.tick() => {
                    match self.sweep(Utc::now()).await {
                        Ok(report) if report.activated > 0 || report.deactivated > 0 => {
                            tracing::info!(
                                activated = report.activated,
                                deactivated = report.deactivated,
                                "publish sweep updated items"
                            );
                        }
                        Ok(_) => tracing::debug!("publish sweep found nothing due"),
                        Err(error) => tracing::warn!(error = %error, "publish sweep failed"),
                    }
                }
            }
        }
        tracing::info!("publish scheduler stopped");
    }
}
