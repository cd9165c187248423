use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Link,
    Block,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Block => "block",
        }
    }
}

/// A `(profile_id, parent_id)` pair: the unit for positions and pin exclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub profile_id: String,
    pub parent_id: Option<String>,
}

impl Scope {
    pub fn root(profile_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            parent_id: None,
        }
    }

    pub fn group(profile_id: &str, group_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            parent_id: Some(group_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LinkAttributes {
    pub url: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_shape: Option<String>,
    pub layout_type: Option<String>,
    pub image_placement: Option<String>,
    pub text_alignment: Option<String>,
    pub text_size: Option<String>,
    pub show_description: Option<bool>,
    pub show_text: Option<bool>,
    pub style: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BlockAttributes {
    pub block_type: String,
    pub content: Option<String>,
    pub text_style: Option<serde_json::Value>,
    pub style: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub alt_text: Option<String>,
    pub video_url: Option<String>,
    pub social_links: Vec<serde_json::Value>,
    pub divider_style: Option<String>,
    pub placeholder: Option<String>,
    pub embed_url: Option<String>,
    pub embed_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ItemAttributes {
    Link(LinkAttributes),
    Block(BlockAttributes),
}

impl ItemAttributes {
    pub fn empty(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Link => Self::Link(LinkAttributes::default()),
            ItemKind::Block => Self::Block(BlockAttributes::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub profile_id: String,
    pub parent_id: Option<String>,
    pub kind: ItemKind,
    pub is_group: bool,
    pub title: Option<String>,
    pub group_layout: Option<String>,
    pub grid_columns: Option<i64>,
    pub grid_aspect_ratio: Option<String>,
    pub position: i64,
    pub is_pinned: bool,
    pub is_active: bool,
    pub clicks: i64,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attributes: ItemAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn scope(&self) -> Scope {
        Scope {
            profile_id: self.profile_id.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}

/// An item as rendered: groups carry their children, ordered for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewLink {
    pub title: String,
    pub attributes: LinkAttributes,
    pub is_active: Option<bool>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewBlock {
    pub title: Option<String>,
    pub attributes: BlockAttributes,
    pub is_active: Option<bool>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NewItem {
    Link(NewLink),
    Block(NewBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub kind: ItemKind,
    pub title: String,
    pub layout: Option<String>,
    pub grid_columns: Option<i64>,
    pub grid_aspect_ratio: Option<String>,
}

/// Attribute-only update. Never moves, re-parents or pins an item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub title: Option<String>,
    /// Merged key-wise into the stored kind-specific attributes.
    pub attributes: Option<serde_json::Value>,
    pub group_layout: Option<String>,
    pub grid_columns: Option<i64>,
    pub grid_aspect_ratio: Option<String>,
    pub is_active: Option<bool>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub kind: ItemKind,
    pub id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DisplaySort {
    #[default]
    Position,
    Clicks,
    Created,
    Updated,
    Title,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilters {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub kind: Option<ItemKind>,
    pub sort: Option<DisplaySort>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    pub profile: Profile,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub activated: usize,
    pub deactivated: usize,
}
