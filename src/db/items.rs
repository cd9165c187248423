use super::position::next_position;
use super::{
    attributes_json, format_time, merge_json, parse_attributes, parse_item_row, Database,
    ITEM_COLUMNS,
};
use crate::display;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Item, ItemAttributes, ItemFilters, ItemKind, ItemUpdate, ItemView, NewItem, Scope,
    StatusFilter,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub(super) struct ItemDraft {
    pub profile_id: String,
    pub parent_id: Option<String>,
    pub kind: ItemKind,
    pub is_group: bool,
    pub title: Option<String>,
    pub group_layout: Option<String>,
    pub grid_columns: Option<i64>,
    pub grid_aspect_ratio: Option<String>,
    pub is_active: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attributes: ItemAttributes,
}

impl ItemDraft {
    pub fn from_new_item(scope: &Scope, payload: NewItem, now: DateTime<Utc>) -> AppResult<Self> {
        let (kind, title, attributes, is_active, scheduled_at, expires_at) = match payload {
            NewItem::Link(link) => {
                let title = link.title.trim().to_string();
                if title.is_empty() {
                    return Err(AppError::Validation("link title must not be empty".to_string()));
                }
                if link.attributes.url.trim().is_empty() {
                    return Err(AppError::Validation("link url must not be empty".to_string()));
                }
                (
                    ItemKind::Link,
                    Some(title),
                    ItemAttributes::Link(link.attributes),
                    link.is_active,
                    link.scheduled_at,
                    link.expires_at,
                )
            }
            NewItem::Block(block) => {
                if block.attributes.block_type.trim().is_empty() {
                    return Err(AppError::Validation("block type must not be empty".to_string()));
                }
                (
                    ItemKind::Block,
                    block
                        .title
                        .map(|title| title.trim().to_string())
                        .filter(|title| !title.is_empty()),
                    ItemAttributes::Block(block.attributes),
                    block.is_active,
                    block.scheduled_at,
                    block.expires_at,
                )
            }
        };
        validate_schedule(scheduled_at, expires_at)?;

        // A future publish time starts the item hidden until the sweep flips it.
        let scheduled_in_future = scheduled_at.is_some_and(|at| at > now);
        let is_active = if scheduled_in_future { false } else { is_active.unwrap_or(true) };

        Ok(Self {
            profile_id: scope.profile_id.clone(),
            parent_id: scope.parent_id.clone(),
            kind,
            is_group: false,
            title,
            group_layout: None,
            grid_columns: None,
            grid_aspect_ratio: None,
            is_active,
            scheduled_at,
            expires_at,
            attributes,
        })
    }

    fn scope(&self) -> Scope {
        Scope {
            profile_id: self.profile_id.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}

pub(super) fn validate_schedule(
    scheduled_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let (Some(scheduled), Some(expires)) = (scheduled_at, expires_at) {
        if expires <= scheduled {
            return Err(AppError::Validation(
                "expiresAt must be later than scheduledAt".to_string(),
            ));
        }
    }
    Ok(())
}

/// Appends `draft` at the next position of its scope. New rows are never pinned.
pub(super) fn insert_item(conn: &Connection, draft: ItemDraft) -> AppResult<Item> {
    let position = next_position(conn, &draft.scope())?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let now_raw = format_time(now);

    conn.execute(
        "INSERT INTO items (
            id, profile_id, parent_id, kind, is_group, title, group_layout, grid_columns,
            grid_aspect_ratio, position, is_pinned, is_active, clicks, scheduled_at, expires_at,
            attributes_json, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, 0, ?12, ?13, ?14, ?15, ?15)",
        params![
            id,
            draft.profile_id,
            draft.parent_id,
            draft.kind.as_str(),
            if draft.is_group { 1 } else { 0 },
            draft.title,
            draft.group_layout,
            draft.grid_columns,
            draft.grid_aspect_ratio,
            position,
            if draft.is_active { 1 } else { 0 },
            draft.scheduled_at.map(format_time),
            draft.expires_at.map(format_time),
            attributes_json(&draft.attributes)?,
            now_raw,
        ],
    )?;

    Ok(Item {
        id,
        profile_id: draft.profile_id,
        parent_id: draft.parent_id,
        kind: draft.kind,
        is_group: draft.is_group,
        title: draft.title,
        group_layout: draft.group_layout,
        grid_columns: draft.grid_columns,
        grid_aspect_ratio: draft.grid_aspect_ratio,
        position,
        is_pinned: false,
        is_active: draft.is_active,
        clicks: 0,
        scheduled_at: draft.scheduled_at,
        expires_at: draft.expires_at,
        attributes: draft.attributes,
        created_at: now,
        updated_at: now,
    })
}

/// Loads an item owned by `profile_id`. Items of other profiles are reported
/// as missing so their existence never leaks.
pub(super) fn load_item(conn: &Connection, profile_id: &str, item_id: &str) -> AppResult<Item> {
    let sql = format!(
        "SELECT {} FROM items WHERE id = ?1 AND profile_id = ?2",
        ITEM_COLUMNS
    );
    conn.query_row(&sql, params![item_id, profile_id], parse_item_row)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))
}

pub(super) fn load_scope(conn: &Connection, scope: &Scope) -> AppResult<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM items WHERE profile_id = ?1 AND parent_id IS ?2 ORDER BY position ASC, created_at ASC, id ASC",
        ITEM_COLUMNS
    );
    let mut statement = conn.prepare(&sql)?;
    let rows = statement.query_map(params![scope.profile_id, scope.parent_id], parse_item_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn load_profile_items(conn: &Connection, profile_id: &str) -> AppResult<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM items WHERE profile_id = ?1 ORDER BY position ASC, created_at ASC, id ASC",
        ITEM_COLUMNS
    );
    let mut statement = conn.prepare(&sql)?;
    let rows = statement.query_map(params![profile_id], parse_item_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn matches_filters(item: &Item, filters: &ItemFilters) -> bool {
    if let Some(kind) = filters.kind {
        if item.kind != kind {
            return false;
        }
    }
    match filters.status {
        Some(StatusFilter::Active) if !item.is_active => return false,
        Some(StatusFilter::Inactive) if item.is_active => return false,
        _ => {}
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let title_hit = item
            .title
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(&needle));
        let body_hit = match &item.attributes {
            ItemAttributes::Link(link) => link.url.to_lowercase().contains(&needle),
            ItemAttributes::Block(block) => block
                .content
                .as_deref()
                .is_some_and(|content| content.to_lowercase().contains(&needle)),
        };
        if !title_hit && !body_hit {
            return false;
        }
    }
    true
}

impl Database {
    pub fn create_item(&self, profile_id: &str, payload: NewItem) -> AppResult<Item> {
        let scope = Scope::root(profile_id);
        let draft = ItemDraft::from_new_item(&scope, payload, Utc::now())?;
        let item = self.write(|tx| insert_item(tx, draft))?;
        tracing::info!(
            profile_id = %profile_id,
            item_id = %item.id,
            kind = item.kind.as_str(),
            position = item.position,
            "created item"
        );
        Ok(item)
    }

    pub fn get_item(&self, profile_id: &str, item_id: &str) -> AppResult<Item> {
        self.read(|conn| load_item(conn, profile_id, item_id))
    }

    /// Attribute-only update: position, parent and pin state are left alone.
    pub fn update_item(&self, profile_id: &str, item_id: &str, update: ItemUpdate) -> AppResult<Item> {
        self.write(|tx| {
            let existing = load_item(tx, profile_id, item_id)?;

            let title = match update.title {
                Some(title) => {
                    let title = title.trim().to_string();
                    if !title.is_empty() {
                        Some(title)
                    } else if existing.kind == ItemKind::Link || existing.is_group {
                        return Err(AppError::Validation("title must not be empty".to_string()));
                    } else {
                        None
                    }
                }
                None => existing.title.clone(),
            };

            let attributes = match update.attributes {
                Some(patch) => {
                    if !patch.is_object() {
                        return Err(AppError::Validation(
                            "attributes update must be a JSON object".to_string(),
                        ));
                    }
                    let mut merged = serde_json::from_str::<serde_json::Value>(&attributes_json(
                        &existing.attributes,
                    )?)?;
                    merge_json(&mut merged, patch);
                    parse_attributes(existing.kind, &merged.to_string()).map_err(|error| {
                        AppError::Validation(format!(
                            "invalid {} attributes: {}",
                            existing.kind.as_str(),
                            error
                        ))
                    })?
                }
                None => existing.attributes.clone(),
            };

            let scheduled_at = update.scheduled_at.or(existing.scheduled_at);
            let expires_at = update.expires_at.or(existing.expires_at);
            validate_schedule(scheduled_at, expires_at)?;

            tx.execute(
                "UPDATE items
                 SET title = ?1,
                     group_layout = COALESCE(?2, group_layout),
                     grid_columns = COALESCE(?3, grid_columns),
                     grid_aspect_ratio = COALESCE(?4, grid_aspect_ratio),
                     is_active = COALESCE(?5, is_active),
                     scheduled_at = ?6,
                     expires_at = ?7,
                     attributes_json = ?8,
                     updated_at = ?9
                 WHERE id = ?10 AND profile_id = ?11",
                params![
                    title,
                    update.group_layout,
                    update.grid_columns,
                    update.grid_aspect_ratio,
                    update.is_active.map(|active| if active { 1 } else { 0 }),
                    scheduled_at.map(format_time),
                    expires_at.map(format_time),
                    attributes_json(&attributes)?,
                    format_time(Utc::now()),
                    item_id,
                    profile_id,
                ],
            )?;
            load_item(tx, profile_id, item_id)
        })
    }

    /// Deletes one item; a group takes its children with it. Siblings keep
    /// their positions.
    pub fn delete_item(&self, profile_id: &str, item_id: &str) -> AppResult<bool> {
        let deleted = self.write(|tx| {
            let changed = tx.execute(
                "DELETE FROM items WHERE id = ?1 AND profile_id = ?2",
                params![item_id, profile_id],
            )?;
            Ok(changed > 0)
        })?;
        if deleted {
            tracing::info!(profile_id = %profile_id, item_id = %item_id, "deleted item");
        }
        Ok(deleted)
    }

    pub fn bulk_delete(&self, profile_id: &str, item_ids: &[String]) -> AppResult<usize> {
        let deleted = self.write(|tx| {
            let mut statement =
                tx.prepare("DELETE FROM items WHERE id = ?1 AND profile_id = ?2")?;
            let mut deleted = 0;
            for item_id in item_ids {
                deleted += statement.execute(params![item_id, profile_id])?;
            }
            Ok(deleted)
        })?;
        tracing::info!(
            profile_id = %profile_id,
            requested = item_ids.len(),
            deleted,
            "bulk deleted items"
        );
        Ok(deleted)
    }

    pub fn bulk_set_active(&self, profile_id: &str, item_ids: &[String], active: bool) -> AppResult<usize> {
        let changed = self.write(|tx| {
            let mut statement = tx.prepare(
                "UPDATE items SET is_active = ?1, updated_at = ?2 WHERE id = ?3 AND profile_id = ?4",
            )?;
            let now = format_time(Utc::now());
            let mut changed = 0;
            for item_id in item_ids {
                changed += statement.execute(params![
                    if active { 1 } else { 0 },
                    now,
                    item_id,
                    profile_id
                ])?;
            }
            Ok(changed)
        })?;
        tracing::info!(profile_id = %profile_id, active, changed, "bulk updated item status");
        Ok(changed)
    }

    pub fn list_scope(&self, scope: &Scope) -> AppResult<Vec<Item>> {
        self.read(|conn| load_scope(conn, scope))
    }

    pub fn list_profile_items(&self, profile_id: &str) -> AppResult<Vec<Item>> {
        self.read(|conn| load_profile_items(conn, profile_id))
    }

    pub fn list_items(&self, profile_id: &str, filters: &ItemFilters) -> AppResult<Vec<ItemView>> {
        let items = self.list_profile_items(profile_id)?;
        let mut views = display::assemble(items);
        views.retain(|view| matches_filters(&view.item, filters));
        display::sort_views(&mut views, filters.sort.unwrap_or_default());
        Ok(views)
    }
}
