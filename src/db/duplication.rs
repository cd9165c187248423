use super::grouping::require_group;
use super::items::{insert_item, load_item, load_scope, ItemDraft};
use super::Database;
use crate::errors::AppResult;
use crate::models::{Item, ItemView, Scope};

const COPY_SUFFIX: &str = " (Copy)";

fn copy_title(title: Option<&str>) -> Option<String> {
    title.map(|title| format!("{}{}", title, COPY_SUFFIX))
}

/// Draft of a copy of `source` placed in `scope`. Copies are never pinned
/// and start with zero clicks.
fn copy_draft(source: &Item, scope: &Scope, title: Option<String>) -> ItemDraft {
    ItemDraft {
        profile_id: scope.profile_id.clone(),
        parent_id: scope.parent_id.clone(),
        kind: source.kind,
        is_group: source.is_group,
        title,
        group_layout: source.group_layout.clone(),
        grid_columns: source.grid_columns,
        grid_aspect_ratio: source.grid_aspect_ratio.clone(),
        is_active: source.is_active,
        scheduled_at: source.scheduled_at,
        expires_at: source.expires_at,
        attributes: source.attributes.clone(),
    }
}

impl Database {
    /// Copies one row to the end of its own scope. A group is copied without
    /// its children; `duplicate_group` is the deep copy.
    pub fn duplicate_item(&self, profile_id: &str, item_id: &str) -> AppResult<Item> {
        let copy = self.write(|tx| {
            let source = load_item(tx, profile_id, item_id)?;
            let draft = copy_draft(&source, &source.scope(), copy_title(source.title.as_deref()));
            insert_item(tx, draft)
        })?;
        tracing::info!(
            profile_id = %profile_id,
            source_id = %item_id,
            item_id = %copy.id,
            position = copy.position,
            "duplicated item"
        );
        Ok(copy)
    }

    /// Copies a group and all of its children in one transaction. Children are
    /// read in full before the first insert, so new rows are never re-read.
    pub fn duplicate_group(&self, profile_id: &str, group_id: &str) -> AppResult<ItemView> {
        let view = self.write(|tx| {
            let source = require_group(tx, profile_id, group_id)?;
            let children = load_scope(tx, &Scope::group(profile_id, group_id))?;

            let group_copy = insert_item(
                tx,
                copy_draft(&source, &Scope::root(profile_id), copy_title(source.title.as_deref())),
            )?;
            let child_scope = Scope::group(profile_id, &group_copy.id);
            let mut copied = Vec::with_capacity(children.len());
            for child in &children {
                copied.push(insert_item(
                    tx,
                    copy_draft(child, &child_scope, child.title.clone()),
                )?);
            }

            Ok(ItemView {
                item: group_copy,
                children: copied,
            })
        })?;
        tracing::info!(
            profile_id = %profile_id,
            source_id = %group_id,
            group_id = %view.item.id,
            children = view.children.len(),
            "duplicated group"
        );
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{new_block, new_link, open_temp};
    use crate::errors::AppError;
    use crate::models::{ItemKind, NewGroup, NewItem, Scope};

    #[test]
    fn duplicate_item_appends_an_unpinned_copy() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let source = db
            .create_item(&profile.id, NewItem::Link(new_link("Shop")))
            .expect("source");
        db.create_item(&profile.id, NewItem::Block(new_block("text")))
            .expect("block");
        db.toggle_pin(&profile.id, &source.id).expect("pin");

        let copy = db.duplicate_item(&profile.id, &source.id).expect("copy");
        assert_eq!(copy.title.as_deref(), Some("Shop (Copy)"));
        assert_eq!(copy.position, 2);
        assert!(!copy.is_pinned);
        assert_eq!(copy.attributes, source.attributes);
        assert!(db.get_item(&profile.id, &source.id).expect("source").is_pinned);

        let untitled = db
            .create_item(&profile.id, NewItem::Block(new_block("divider")))
            .expect("untitled");
        let untitled_copy = db
            .duplicate_item(&profile.id, &untitled.id)
            .expect("untitled copy");
        assert_eq!(untitled_copy.title, None);
    }

    #[test]
    fn duplicate_group_copies_children_in_order_and_leaves_source_alone() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let group = db
            .create_group(
                &profile.id,
                NewGroup {
                    kind: ItemKind::Block,
                    title: "Gallery".to_string(),
                    layout: Some("carousel".to_string()),
                    grid_columns: Some(3),
                    grid_aspect_ratio: Some("1:1".to_string()),
                },
            )
            .expect("group");
        let first = db
            .add_to_group(&profile.id, &group.id, NewItem::Block(new_block("image")))
            .expect("first");
        let second = db
            .add_to_group(&profile.id, &group.id, NewItem::Link(new_link("B")))
            .expect("second");
        db.reorder_within_group(&profile.id, &group.id, &[second.id.clone(), first.id.clone()])
            .expect("reorder");
        db.toggle_pin(&profile.id, &first.id).expect("pin");
        let before = db
            .list_scope(&Scope::group(&profile.id, &group.id))
            .expect("before");

        let copy = db.duplicate_group(&profile.id, &group.id).expect("copy");
        assert_eq!(copy.item.title.as_deref(), Some("Gallery (Copy)"));
        assert_eq!(copy.item.group_layout.as_deref(), Some("carousel"));
        assert_eq!(copy.item.position, 1);
        assert_eq!(copy.children.len(), 2);
        assert!(copy.children.iter().all(|child| !child.is_pinned));
        assert_eq!(copy.children[0].attributes, second.attributes);
        assert_eq!(copy.children[1].attributes, first.attributes);
        assert_eq!(
            (copy.children[0].position, copy.children[1].position),
            (0, 1)
        );

        let after = db
            .list_scope(&Scope::group(&profile.id, &group.id))
            .expect("after");
        assert_eq!(before, after);
    }

    #[test]
    fn failed_child_copy_rolls_back_the_whole_group_copy() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let group = db
            .create_group(
                &profile.id,
                NewGroup {
                    kind: ItemKind::Link,
                    title: "Socials".to_string(),
                    layout: None,
                    grid_columns: None,
                    grid_aspect_ratio: None,
                },
            )
            .expect("group");
        for title in ["A", "Boom", "C"] {
            db.add_to_group(&profile.id, &group.id, NewItem::Link(new_link(title)))
                .expect("child");
        }
        let count_rows = || {
            db.read(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
                Ok(count)
            })
            .expect("count")
        };
        let before = count_rows();
        db.read(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_second_child BEFORE INSERT ON items
                 WHEN NEW.title = 'Boom' BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )?;
            Ok(())
        })
        .expect("trigger");

        let error = db
            .duplicate_group(&profile.id, &group.id)
            .expect_err("child insert aborted");
        assert!(matches!(error, AppError::Internal(_)));
        assert_eq!(count_rows(), before);
        let root = db.list_scope(&Scope::root(&profile.id)).expect("root");
        assert_eq!(root.len(), 1);
        assert!(root
            .iter()
            .all(|item| !item.title.as_deref().unwrap_or_default().ends_with(" (Copy)")));
    }

    #[test]
    fn duplicate_group_requires_a_group() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let link = db
            .create_item(&profile.id, NewItem::Link(new_link("A")))
            .expect("link");
        let error = db
            .duplicate_group(&profile.id, &link.id)
            .expect_err("not a group");
        assert!(matches!(error, AppError::NotAGroup(_)));
        assert_eq!(
            db.list_scope(&Scope::root(&profile.id)).expect("root").len(),
            1
        );
    }
}
