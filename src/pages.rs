use crate::db::Database;
use crate::display;
use crate::errors::{AppError, AppResult};
use crate::models::{
    DisplaySort, Item, ItemFilters, ItemUpdate, ItemView, NewBlock, NewGroup, NewItem, NewLink,
    Profile, PublicPage, ReorderEntry, Scope, UpdateProfilePayload,
};
use chrono::Utc;
use std::sync::Arc;

/// Entry point for the API layer. Every editing call takes the opaque
/// authenticated user id and works on that user's profile, created lazily.
#[derive(Clone)]
pub struct PageCore {
    db: Arc<Database>,
}

fn traced<T>(operation: &'static str, user_id: &str, result: AppResult<T>) -> AppResult<T> {
    if let Err(error) = &result {
        if error.is_retryable() {
            tracing::warn!(operation, user_id = %user_id, code = error.code(), error = %error, "operation conflicted");
        } else {
            tracing::debug!(operation, user_id = %user_id, code = error.code(), error = %error, "operation rejected");
        }
    }
    result
}

impl PageCore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn profile_id(&self, user_id: &str) -> AppResult<String> {
        Ok(self.db.profile_for_user(user_id)?.id)
    }

    fn with_profile<T>(
        &self,
        operation: &'static str,
        user_id: &str,
        work: impl FnOnce(&Database, &str) -> AppResult<T>,
    ) -> AppResult<T> {
        let result = self
            .profile_id(user_id)
            .and_then(|profile_id| work(&self.db, &profile_id));
        traced(operation, user_id, result)
    }

    pub fn profile(&self, user_id: &str) -> AppResult<Profile> {
        traced("profile", user_id, self.db.profile_for_user(user_id))
    }

    pub fn update_profile(&self, user_id: &str, payload: UpdateProfilePayload) -> AppResult<Profile> {
        self.with_profile("update_profile", user_id, |db, profile_id| {
            db.update_profile(profile_id, payload)
        })
    }

    pub fn claim_username(&self, user_id: &str, username: &str) -> AppResult<Profile> {
        self.with_profile("claim_username", user_id, |db, profile_id| {
            db.claim_username(profile_id, username)
        })
    }

    pub fn create_link(&self, user_id: &str, payload: NewLink) -> AppResult<Item> {
        self.with_profile("create_link", user_id, |db, profile_id| {
            db.create_item(profile_id, NewItem::Link(payload))
        })
    }

    pub fn create_block(&self, user_id: &str, payload: NewBlock) -> AppResult<Item> {
        self.with_profile("create_block", user_id, |db, profile_id| {
            db.create_item(profile_id, NewItem::Block(payload))
        })
    }

    pub fn create_item(&self, user_id: &str, payload: NewItem) -> AppResult<Item> {
        self.with_profile("create_item", user_id, |db, profile_id| {
            db.create_item(profile_id, payload)
        })
    }

    pub fn get_item(&self, user_id: &str, item_id: &str) -> AppResult<Item> {
        self.with_profile("get_item", user_id, |db, profile_id| db.get_item(profile_id, item_id))
    }

    pub fn update_item(&self, user_id: &str, item_id: &str, update: ItemUpdate) -> AppResult<Item> {
        self.with_profile("update_item", user_id, |db, profile_id| {
            db.update_item(profile_id, item_id, update)
        })
    }

    pub fn delete_item(&self, user_id: &str, item_id: &str) -> AppResult<bool> {
        self.with_profile("delete_item", user_id, |db, profile_id| {
            db.delete_item(profile_id, item_id)
        })
    }

    pub fn bulk_delete(&self, user_id: &str, item_ids: &[String]) -> AppResult<usize> {
        self.with_profile("bulk_delete", user_id, |db, profile_id| {
            db.bulk_delete(profile_id, item_ids)
        })
    }

    pub fn bulk_set_active(&self, user_id: &str, item_ids: &[String], active: bool) -> AppResult<usize> {
        self.with_profile("bulk_set_active", user_id, |db, profile_id| {
            db.bulk_set_active(profile_id, item_ids, active)
        })
    }

    pub fn next_position(&self, user_id: &str, parent_id: Option<&str>) -> AppResult<i64> {
        self.with_profile("next_position", user_id, |db, profile_id| {
            db.next_position(&scope_of(profile_id, parent_id))
        })
    }

    pub fn list_scope(&self, user_id: &str, parent_id: Option<&str>) -> AppResult<Vec<Item>> {
        self.with_profile("list_scope", user_id, |db, profile_id| {
            db.list_scope(&scope_of(profile_id, parent_id))
        })
    }

    pub fn list_items(&self, user_id: &str, filters: &ItemFilters) -> AppResult<Vec<ItemView>> {
        self.with_profile("list_items", user_id, |db, profile_id| {
            db.list_items(profile_id, filters)
        })
    }

    pub fn create_group(&self, user_id: &str, payload: NewGroup) -> AppResult<Item> {
        self.with_profile("create_group", user_id, |db, profile_id| {
            db.create_group(profile_id, payload)
        })
    }

    pub fn add_to_group(&self, user_id: &str, group_id: &str, payload: NewItem) -> AppResult<Item> {
        self.with_profile("add_to_group", user_id, |db, profile_id| {
            db.add_to_group(profile_id, group_id, payload)
        })
    }

    pub fn move_to_group(&self, user_id: &str, item_id: &str, group_id: &str) -> AppResult<Item> {
        self.with_profile("move_to_group", user_id, |db, profile_id| {
            db.move_to_group(profile_id, item_id, group_id)
        })
    }

    pub fn remove_from_group(&self, user_id: &str, item_id: &str) -> AppResult<Item> {
        self.with_profile("remove_from_group", user_id, |db, profile_id| {
            db.remove_from_group(profile_id, item_id)
        })
    }

    pub fn reorder_within_group(&self, user_id: &str, group_id: &str, ordered_ids: &[String]) -> AppResult<usize> {
        self.with_profile("reorder_within_group", user_id, |db, profile_id| {
            db.reorder_within_group(profile_id, group_id, ordered_ids)
        })
    }

    pub fn reorder_root(&self, user_id: &str, entries: &[ReorderEntry]) -> AppResult<usize> {
        self.with_profile("reorder_root", user_id, |db, profile_id| {
            db.reorder_root(profile_id, entries)
        })
    }

    pub fn toggle_pin(&self, user_id: &str, item_id: &str) -> AppResult<Item> {
        self.with_profile("toggle_pin", user_id, |db, profile_id| {
            db.toggle_pin(profile_id, item_id)
        })
    }

    pub fn duplicate_item(&self, user_id: &str, item_id: &str) -> AppResult<Item> {
        self.with_profile("duplicate_item", user_id, |db, profile_id| {
            db.duplicate_item(profile_id, item_id)
        })
    }

    pub fn duplicate_group(&self, user_id: &str, group_id: &str) -> AppResult<ItemView> {
        self.with_profile("duplicate_group", user_id, |db, profile_id| {
            db.duplicate_group(profile_id, group_id)
        })
    }

    pub fn upcoming_schedules(&self, user_id: &str, limit: usize) -> AppResult<Vec<Item>> {
        self.with_profile("upcoming_schedules", user_id, |db, profile_id| {
            db.upcoming_schedules(profile_id, Utc::now(), limit)
        })
    }

    /// Visitor view: active items only, pinned first then by position, with
    /// groups carrying their active children.
    pub fn public_page(&self, username: &str) -> AppResult<PublicPage> {
        let profile = self.db.profile_by_username(username).map_err(|error| match error {
            AppError::NotFound(_) => AppError::NotFound(format!("page '{}' not found", username.trim())),
            other => other,
        })?;
        let items = self
            .db
            .list_profile_items(&profile.id)?
            .into_iter()
            .filter(|item| item.is_active)
            .collect();
        let mut views = display::assemble(items);
        display::sort_views(&mut views, DisplaySort::Position);
        tracing::debug!(profile_id = %profile.id, items = views.len(), "assembled public page");
        Ok(PublicPage {
            profile,
            items: views,
        })
    }
}

fn scope_of(profile_id: &str, parent_id: Option<&str>) -> Scope {
    match parent_id {
        Some(group_id) => Scope::group(profile_id, group_id),
        None => Scope::root(profile_id),
    }
}

#[cfg(test)]
mod tests {
    use super::PageCore;
    use crate::db::Database;
    use crate::errors::AppError;
    use crate::models::{BlockAttributes, ItemKind, LinkAttributes, NewBlock, NewGroup, NewItem, NewLink};
    use std::sync::Arc;

    fn core() -> (tempfile::TempDir, PageCore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        (dir, PageCore::new(Arc::new(db)))
    }

    fn link(title: &str) -> NewLink {
        NewLink {
            title: title.to_string(),
            attributes: LinkAttributes {
                url: format!("https://example.com/{}", title),
                ..LinkAttributes::default()
            },
            ..NewLink::default()
        }
    }

    #[test]
    fn public_page_hides_inactive_items_and_floats_pins() {
        let (_dir, core) = core();
        core.claim_username("user-1", "maker").expect("username");
        let first = core.create_link("user-1", link("first")).expect("first");
        let hidden = core.create_link("user-1", link("hidden")).expect("hidden");
        let block = core
            .create_block(
                "user-1",
                NewBlock {
                    title: Some("About".to_string()),
                    attributes: BlockAttributes {
                        block_type: "text".to_string(),
                        ..BlockAttributes::default()
                    },
                    ..NewBlock::default()
                },
            )
            .expect("block");
        let group = core
            .create_group(
                "user-1",
                NewGroup {
                    kind: ItemKind::Link,
                    title: "Socials".to_string(),
                    layout: None,
                    grid_columns: None,
                    grid_aspect_ratio: None,
                },
            )
            .expect("group");
        core.add_to_group("user-1", &group.id, NewItem::Link(link("child")))
            .expect("child");
        core.bulk_set_active("user-1", &[hidden.id.clone()], false)
            .expect("hide");
        core.toggle_pin("user-1", &block.id).expect("pin");

        let page = core.public_page(" Maker ").expect("page");
        let ids: Vec<&str> = page.items.iter().map(|view| view.item.id.as_str()).collect();
        assert_eq!(ids, vec![block.id.as_str(), first.id.as_str(), group.id.as_str()]);
        assert_eq!(page.items[2].children.len(), 1);

        let json = serde_json::to_value(&page).expect("json");
        assert_eq!(json["items"][0]["isPinned"], true);
        assert_eq!(json["items"][2]["children"][0]["attributes"]["url"], "https://example.com/child");
    }

    #[test]
    fn users_never_see_each_others_items() {
        let (_dir, core) = core();
        let theirs = core.create_link("owner", link("mine")).expect("owner link");
        let error = core.toggle_pin("intruder", &theirs.id).expect_err("foreign");
        assert!(matches!(error, AppError::NotFound(_)));
        let missing = core.public_page("nobody").expect_err("no page");
        assert!(matches!(missing, AppError::NotFound(_)));
        assert!(core.list_scope("intruder", None).expect("empty").is_empty());
    }
}
