use super::items::load_item;
use super::{format_time, Database};
use crate::errors::AppResult;
use crate::models::Item;
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Flips the pin of one item. Pinning clears every other pin in the
    /// item's own scope inside the same transaction; positions never change.
    pub fn toggle_pin(&self, profile_id: &str, item_id: &str) -> AppResult<Item> {
        let item = self.write(|tx| {
            let item = load_item(tx, profile_id, item_id)?;
            let now = format_time(Utc::now());

            if item.is_pinned {
                tx.execute(
                    "UPDATE items SET is_pinned = 0, updated_at = ?1 WHERE id = ?2 AND profile_id = ?3",
                    params![now, item_id, profile_id],
                )?;
            } else {
                tx.execute(
                    "UPDATE items SET is_pinned = 0, updated_at = ?1
                     WHERE profile_id = ?2 AND parent_id IS ?3 AND is_pinned = 1 AND id != ?4",
                    params![now, profile_id, item.parent_id, item_id],
                )?;
                tx.execute(
                    "UPDATE items SET is_pinned = 1, updated_at = ?1 WHERE id = ?2 AND profile_id = ?3",
                    params![now, item_id, profile_id],
                )?;
            }
            load_item(tx, profile_id, item_id)
        })?;
        tracing::info!(
            profile_id = %profile_id,
            item_id = %item_id,
            pinned = item.is_pinned,
            "toggled pin"
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{new_block, new_link, open_temp};
    use crate::models::{ItemKind, NewGroup, NewItem, Scope};

    #[test]
    fn pinning_is_exclusive_within_a_scope_only() {
        let (_dir, db) = open_temp();
        let profile = db.profile_for_user("user-1").expect("profile");
        let link = db
            .create_item(&profile.id, NewItem::Link(new_link("A")))
            .expect("link");
        let block = db
            .create_item(&profile.id, NewItem::Block(new_block("text")))
            .expect("block");
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
        let child = db
            .add_to_group(&profile.id, &group.id, NewItem::Link(new_link("B")))
            .expect("child");

        db.toggle_pin(&profile.id, &link.id).expect("pin link");
        db.toggle_pin(&profile.id, &child.id).expect("pin child");
        let pinned_block = db.toggle_pin(&profile.id, &block.id).expect("pin block");
        assert!(pinned_block.is_pinned);
        assert_eq!(pinned_block.position, block.position);

        let root = db.list_scope(&Scope::root(&profile.id)).expect("root");
        let pinned: Vec<&str> = root
            .iter()
            .filter(|item| item.is_pinned)
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(pinned, vec![block.id.as_str()]);
        assert!(db.get_item(&profile.id, &child.id).expect("child").is_pinned);

        let unpinned = db.toggle_pin(&profile.id, &block.id).expect("unpin");
        assert!(!unpinned.is_pinned);
        let root = db.list_scope(&Scope::root(&profile.id)).expect("root");
        assert!(root.iter().all(|item| !item.is_pinned));
    }
}
