use super::grouping::require_group;
use super::{format_time, parse_kind, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{ItemKind, ReorderEntry, Scope};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

// Callers must hold the write transaction that consumes the value.
pub(super) fn next_position(conn: &Connection, scope: &Scope) -> AppResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM items WHERE profile_id = ?1 AND parent_id IS ?2",
        params![scope.profile_id, scope.parent_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn stored_kind_in_scope(conn: &Connection, scope: &Scope, id: &str) -> AppResult<Option<ItemKind>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT kind FROM items WHERE id = ?1 AND profile_id = ?2 AND parent_id IS ?3",
            params![id, scope.profile_id, scope.parent_id],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|value| parse_kind(&value).map_err(AppError::from))
        .transpose()
}

/// Validates every entry against `scope` before any row is written, then
/// assigns `position = index`. Entries carrying a kind must match the stored one.
fn renumber(conn: &Connection, scope: &Scope, entries: &[(Option<ItemKind>, &str)]) -> AppResult<usize> {
    if entries.is_empty() {
        return Err(AppError::InvalidReorderSet(
            "reorder set must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for (expected_kind, id) in entries {
        if !seen.insert(*id) {
            return Err(AppError::InvalidReorderSet(format!(
                "item {} appears more than once",
                id
            )));
        }
        let stored = stored_kind_in_scope(conn, scope, id)?;
        let matches = match (stored, expected_kind) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(stored), Some(expected)) => stored == *expected,
        };
        if !matches {
            return Err(AppError::InvalidReorderSet(format!(
                "item {} is not part of the target scope",
                id
            )));
        }
    }

    let now = format_time(Utc::now());
    let mut statement = conn.prepare(
        "UPDATE items SET position = ?1, updated_at = ?2 WHERE id = ?3 AND profile_id = ?4",
    )?;
    for (index, (_, id)) in entries.iter().enumerate() {
        statement.execute(params![index as i64, now, id, scope.profile_id])?;
    }
    Ok(entries.len())
}

impl Database {
    pub fn next_position(&self, scope: &Scope) -> AppResult<i64> {
        self.read(|conn| next_position(conn, scope))
    }

    /// Dense renumbering of a scope in caller order. Items not named keep
    /// their position. Group scopes must belong to the scope's profile.
    pub fn renumber_scope(&self, scope: &Scope, ordered_ids: &[String]) -> AppResult<usize> {
        let count = self.write(|tx| {
            if let Some(group_id) = scope.parent_id.as_deref() {
                require_group(tx, &scope.profile_id, group_id)?;
            }
            let entries: Vec<(Option<ItemKind>, &str)> =
                ordered_ids.iter().map(|id| (None, id.as_str())).collect();
            renumber(tx, scope, &entries)
        })?;
        tracing::debug!(
            profile_id = %scope.profile_id,
            parent_id = ?scope.parent_id,
            count,
            "renumbered scope"
        );
        Ok(count)
    }

    pub fn reorder_root(&self, profile_id: &str, entries: &[ReorderEntry]) -> AppResult<usize> {
        let scope = Scope::root(profile_id);
        self.write(|tx| {
            let entries: Vec<(Option<ItemKind>, &str)> = entries
                .iter()
                .map(|entry| (Some(entry.kind), entry.id.as_str()))
                .collect();
            renumber(tx, &scope, &entries)
        })
    }
}
