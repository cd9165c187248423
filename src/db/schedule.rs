use super::{format_time, parse_item_row, Database, ITEM_COLUMNS};
use crate::errors::AppResult;
use crate::models::{Item, SweepReport};
use chrono::{DateTime, Utc};
use rusqlite::params;

impl Database {
    /// Activates items whose publish time has passed and deactivates expired
    /// ones. Only `is_active` changes.
    pub fn sweep_schedules(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let now_raw = format_time(now);
        self.write(|tx| {
            let activated = tx.execute(
                "UPDATE items SET is_active = 1, updated_at = ?1
                 WHERE is_active = 0
                   AND scheduled_at IS NOT NULL AND scheduled_at <= ?1
                   AND (expires_at IS NULL OR expires_at > ?1)",
                params![now_raw],
            )?;
            let deactivated = tx.execute(
                "UPDATE items SET is_active = 0, updated_at = ?1
                 WHERE is_active = 1 AND expires_at IS NOT NULL AND expires_at <= ?1",
                params![now_raw],
            )?;
            Ok(SweepReport {
                activated,
                deactivated,
            })
        })
    }

    /// Items of a profile with a publish or expiry time still ahead, soonest first.
    pub fn upcoming_schedules(
        &self,
        profile_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        let now_raw = format_time(now);
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM items
                 WHERE profile_id = ?1
                   AND ((scheduled_at IS NOT NULL AND scheduled_at > ?2)
                     OR (expires_at IS NOT NULL AND expires_at > ?2))
                 ORDER BY COALESCE(
                     CASE WHEN scheduled_at > ?2 THEN scheduled_at END,
                     expires_at
                 ) ASC, id ASC
                 LIMIT ?3",
                ITEM_COLUMNS
            );
            let mut statement = conn.prepare(&sql)?;
            let rows = statement.query_map(params![profile_id, now_raw, limit as i64], parse_item_row)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
    }
}
