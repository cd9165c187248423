mod duplication;
mod grouping;
mod items;
mod pin;
mod position;
mod profiles;
mod schedule;

use crate::errors::{AppError, AppResult};
use crate::models::{BlockAttributes, Item, ItemAttributes, ItemKind, LinkAttributes};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("schema.sql");

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const ITEM_COLUMNS: &str = "id, profile_id, parent_id, kind, is_group, title, group_layout, grid_columns,
     grid_aspect_ratio, position, is_pinned, is_active, clicks, scheduled_at, expires_at,
     attributes_json, created_at, updated_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        Self::open(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open(path: &Path, busy_timeout: Duration) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        tracing::debug!(path = %path.display(), "opened item store");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    /// Runs `work` inside one IMMEDIATE transaction. The write lock is held from
    /// the first read, so read-then-insert sequences cannot interleave with other
    /// writers. Any error drops the transaction, rolling back every statement.
    fn write<T>(&self, work: impl FnOnce(&Transaction<'_>) -> AppResult<T>) -> AppResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn read<T>(&self, work: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self.lock()?;
        work(&conn)
    }
}

fn format_time(value: DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to chronological order in SQL comparisons.
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| conversion_failure(error.to_string()))
}

fn parse_optional_time(raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|value| parse_time(&value)).transpose()
}

fn parse_kind(raw: &str) -> rusqlite::Result<ItemKind> {
    match raw {
        "link" => Ok(ItemKind::Link),
        "block" => Ok(ItemKind::Block),
        other => Err(conversion_failure(format!("Unknown item kind '{}'", other))),
    }
}

fn parse_attributes(kind: ItemKind, raw: &str) -> rusqlite::Result<ItemAttributes> {
    let parsed = match kind {
        ItemKind::Link => serde_json::from_str::<LinkAttributes>(raw).map(ItemAttributes::Link),
        ItemKind::Block => serde_json::from_str::<BlockAttributes>(raw).map(ItemAttributes::Block),
    };
    parsed.map_err(|error| conversion_failure(error.to_string()))
}

fn attributes_json(attributes: &ItemAttributes) -> AppResult<String> {
    let raw = match attributes {
        ItemAttributes::Link(link) => serde_json::to_string(link)?,
        ItemAttributes::Block(block) => serde_json::to_string(block)?,
    };
    Ok(raw)
}

fn conversion_failure(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn parse_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let kind = parse_kind(&row.get::<_, String>(3)?)?;
    Ok(Item {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        parent_id: row.get(2)?,
        kind,
        is_group: row.get::<_, i32>(4)? != 0,
        title: row.get(5)?,
        group_layout: row.get(6)?,
        grid_columns: row.get(7)?,
        grid_aspect_ratio: row.get(8)?,
        position: row.get(9)?,
        is_pinned: row.get::<_, i32>(10)? != 0,
        is_active: row.get::<_, i32>(11)? != 0,
        clicks: row.get(12)?,
        scheduled_at: parse_optional_time(row.get(13)?)?,
        expires_at: parse_optional_time(row.get(14)?)?,
        attributes: parse_attributes(kind, &row.get::<_, String>(15)?)?,
        created_at: parse_time(&row.get::<_, String>(16)?)?,
        updated_at: parse_time(&row.get::<_, String>(17)?)?,
    })
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
