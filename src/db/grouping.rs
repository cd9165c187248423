use super::items::{insert_item, load_item, ItemDraft};
use super::position::next_position;
use super::{format_time, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Item, ItemAttributes, NewGroup, NewItem, Scope};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Resolves `group_id` to a group owned by `profile_id`.
pub(super) fn require_group(conn: &Connection, profile_id: &str, group_id: &str) -> AppResult<Item> {
    let group = load_item(conn, profile_id, group_id).map_err(|error| match error {
        AppError::NotFound(_) => AppError::NotFound(format!("group {} not found", group_id)),
        other => other,
    })?;
    if !group.is_group {
        return Err(AppError::NotAGroup(format!("item {} is not a group", group_id)));
    }
    Ok(group)
}

/// Moves an item to the end of `destination`, dropping its pin when the
/// scope actually changes.
fn relocate(conn: &Connection, item: &Item, destination: &Scope) -> AppResult<Item> {
    if item.parent_id == destination.parent_id {
        return Ok(item.clone());
    }
    let position = next_position(conn, destination)?;
    conn.execute(
        "UPDATE items SET parent_id = ?1, position = ?2, is_pinned = 0, updated_at = ?3
         WHERE id = ?4 AND profile_id = ?5",
        params![
            destination.parent_id,
            position,
            format_time(Utc::now()),
            item.id,
            item.profile_id
        ],
    )?;
    load_item(conn, &item.profile_id, &item.id)
}

impl Database {
    /// Appends an empty group at the end of the root scope.
    pub fn create_group(&self, profile_id: &str, payload: NewGroup) -> AppResult<Item> {
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("group title must not be empty".to_string()));
        }
        let draft = ItemDraft {
            profile_id: profile_id.to_string(),
            parent_id: None,
            kind: payload.kind,
            is_group: true,
            title: Some(title),
            group_layout: payload.layout,
            grid_columns: payload.grid_columns,
            grid_aspect_ratio: payload.grid_aspect_ratio,
            is_active: true,
            scheduled_at: None,
            expires_at: None,
            attributes: ItemAttributes::empty(payload.kind),
        };
        let group = self.write(|tx| insert_item(tx, draft))?;
        tracing::info!(
            profile_id = %profile_id,
            group_id = %group.id,
            position = group.position,
            "created group"
        );
        Ok(group)
    }

    pub fn add_to_group(&self, profile_id: &str, group_id: &str, payload: NewItem) -> AppResult<Item> {
        let scope = Scope::group(profile_id, group_id);
        let draft = ItemDraft::from_new_item(&scope, payload, Utc::now())?;
        let item = self.write(|tx| {
            require_group(tx, profile_id, group_id)?;
            insert_item(tx, draft)
        })?;
        tracing::info!(
            profile_id = %profile_id,
            group_id = %group_id,
            item_id = %item.id,
            position = item.position,
            "added item to group"
        );
        Ok(item)
    }

    pub fn move_to_group(&self, profile_id: &str, item_id: &str, group_id: &str) -> AppResult<Item> {
        let moved = self.write(|tx| {
            let item = load_item(tx, profile_id, item_id)?;
            if item.is_group {
                return Err(AppError::CannotNestGroups(format!(
                    "group {} cannot be placed inside another group",
                    item_id
                )));
            }

            let destination: Option<(String, bool)> = tx
                .query_row(
                    "SELECT profile_id, is_group FROM items WHERE id = ?1",
                    params![group_id],
                    |row| Ok((row.get(0)?, row.get::<_, i32>(1)? != 0)),
                )
                .optional()?;
            let (owner_id, is_group) = destination
                .ok_or_else(|| AppError::NotFound(format!("group {} not found", group_id)))?;
            if owner_id != profile_id {
                return Err(AppError::CrossProfileMove(format!(
                    "group {} belongs to another profile",
                    group_id
                )));
            }
            if !is_group {
                return Err(AppError::NotAGroup(format!("item {} is not a group", group_id)));
            }

            relocate(tx, &item, &Scope::group(profile_id, group_id))
        })?;
        tracing::info!(
            profile_id = %profile_id,
            item_id = %item_id,
            group_id = %group_id,
            position = moved.position,
            "moved item into group"
        );
        Ok(moved)
    }

    pub fn remove_from_group(&self, profile_id: &str, item_id: &str) -> AppResult<Item> {
        let moved = self.write(|tx| {
            let item = load_item(tx, profile_id, item_id)?;
            if item.parent_id.is_none() {
                return Err(AppError::NotInGroup(format!("item {} is not in a group", item_id)));
            }
            relocate(tx, &item, &Scope::root(profile_id))
        })?;
        tracing::info!(
            profile_id = %profile_id,
            item_id = %item_id,
            position = moved.position,
            "removed item from group"
        );
        Ok(moved)
    }

    pub fn reorder_within_group(
        &self,
        profile_id: &str,
        group_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<usize> {
        self.renumber_scope(&Scope::group(profile_id, group_id), ordered_ids)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{new_block, new_link, open_temp};
    use crate::db::Database;
    use crate::errors::AppError;
    use crate::models::{ItemKind, NewGroup, NewItem, Scope};

    fn group(db: &Database, profile_id: &str, title: &str) -> String {
        db.create_group(
            profile_id,
            NewGroup {
                kind: ItemKind::Link,
                title: title.to_string(),
                layout: Some("grid".to_string()),
                grid_columns: Some(2),
                grid_aspect_ratio: None,
            },
        )
        .expect("group")
        .id
    }

    #[test]
    fn add_to_group_appends_both_kinds_in_one_scope() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let group_id = group(&db, &profile.id, "Mixed");
        let link = db
            .add_to_group(&profile.id, &group_id, NewItem::Link(new_link("A")))
            .expect("link");
        let block = db
            .add_to_group(&profile.id, &group_id, NewItem::Block(new_block("text")))
            .expect("block");
        assert_eq!((link.position, block.position), (0, 1));
        assert_eq!(block.parent_id.as_deref(), Some(group_id.as_str()));
    }

    #[test]
    fn nesting_and_missing_targets_are_rejected_without_changes() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let first = group(&db, &profile.id, "First");
        let second = group(&db, &profile.id, "Second");
        let link = db
            .create_item(&profile.id, NewItem::Link(new_link("A")))
            .expect("link");
        let before = db.list_profile_items(&profile.id).expect("before");

        let nested = db
            .move_to_group(&profile.id, &second, &first)
            .expect_err("group into group");
        assert!(matches!(nested, AppError::CannotNestGroups(_)));

        let not_group = db
            .move_to_group(&profile.id, &first, &link.id)
            .expect_err("group into link");
        assert!(matches!(not_group, AppError::CannotNestGroups(_)));

        let into_link = db
            .add_to_group(&profile.id, &link.id, NewItem::Link(new_link("B")))
            .expect_err("link is not a group");
        assert!(matches!(into_link, AppError::NotAGroup(_)));

        let missing = db
            .move_to_group(&profile.id, &link.id, "missing")
            .expect_err("missing group");
        assert!(matches!(missing, AppError::NotFound(_)));

        let after = db.list_profile_items(&profile.id).expect("after");
        assert_eq!(before, after);
    }

    #[test]
    fn move_into_foreign_group_is_a_cross_profile_move() {
        let (_dir, db) = open_temp();
        let owner = db.profile_for_user("owner").expect("owner");
        let other = db.profile_for_user("other").expect("other");
        let foreign_group = group(&db, &other.id, "Theirs");
        let link = db
            .create_item(&owner.id, NewItem::Link(new_link("A")))
            .expect("link");

        let error = db
            .move_to_group(&owner.id, &link.id, &foreign_group)
            .expect_err("foreign");
        assert!(matches!(error, AppError::CrossProfileMove(_)));
        let add = db
            .add_to_group(&owner.id, &foreign_group, NewItem::Link(new_link("B")))
            .expect_err("add into foreign group");
        assert!(matches!(add, AppError::NotFound(_)));
    }

    #[test]
    fn moving_across_scopes_appends_and_clears_pin() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let group_id = group(&db, &profile.id, "Socials");
        db.add_to_group(&profile.id, &group_id, NewItem::Link(new_link("Existing")))
            .expect("existing");
        let link = db
            .create_item(&profile.id, NewItem::Link(new_link("A")))
            .expect("link");
        db.toggle_pin(&profile.id, &link.id).expect("pin");

        let moved = db
            .move_to_group(&profile.id, &link.id, &group_id)
            .expect("move");
        assert_eq!(moved.parent_id.as_deref(), Some(group_id.as_str()));
        assert_eq!(moved.position, 1);
        assert!(!moved.is_pinned);

        let back = db.remove_from_group(&profile.id, &link.id).expect("remove");
        assert_eq!(back.parent_id, None);
        assert_eq!(back.position, 2);

        let error = db
            .remove_from_group(&profile.id, &link.id)
            .expect_err("already at root");
        assert!(matches!(error, AppError::NotInGroup(_)));
    }

    #[test]
    fn reorder_within_group_checks_group_ownership() {
        let (_dir, db) = open_temp();
        let owner = db.profile_for_user("owner").expect("owner");
        let other = db.profile_for_user("other").expect("other");
        let group_id = group(&db, &owner.id, "Socials");
        let a = db
            .add_to_group(&owner.id, &group_id, NewItem::Link(new_link("A")))
            .expect("a");
        let b = db
            .add_to_group(&owner.id, &group_id, NewItem::Link(new_link("B")))
            .expect("b");

        let foreign = db
            .reorder_within_group(&other.id, &group_id, &[b.id.clone(), a.id.clone()])
            .expect_err("not the owner");
        assert!(matches!(foreign, AppError::NotFound(_)));

        db.reorder_within_group(&owner.id, &group_id, &[b.id.clone(), a.id.clone()])
            .expect("reorder");
        let listed = db
            .list_scope(&Scope::group(&owner.id, &group_id))
            .expect("list");
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[0].position, 0);
        assert_eq!(listed[1].id, a.id);
    }
}
