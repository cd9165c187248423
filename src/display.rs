//! Read-path ordering. Nothing here touches stored positions.

use crate::models::{DisplaySort, Item, ItemView};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Pinned item first, then ascending position. Ties (possible after
/// concurrent edits outside a reorder) fall back to creation time and id.
pub fn position_order(a: &Item, b: &Item) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then(a.position.cmp(&b.position))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn compare(sort: DisplaySort, a: &Item, b: &Item) -> Ordering {
    match sort {
        DisplaySort::Position => position_order(a, b),
        DisplaySort::Clicks => b.clicks.cmp(&a.clicks).then_with(|| position_order(a, b)),
        DisplaySort::Created => b
            .created_at
            .cmp(&a.created_at)
            .then_with(|| position_order(a, b)),
        DisplaySort::Updated => b
            .updated_at
            .cmp(&a.updated_at)
            .then_with(|| position_order(a, b)),
        DisplaySort::Title => title_key(a)
            .cmp(&title_key(b))
            .then_with(|| position_order(a, b)),
    }
}

fn title_key(item: &Item) -> String {
    item.title.as_deref().unwrap_or_default().to_lowercase()
}

/// Nests children under their groups. Roots keep input order; children whose
/// group is absent from `items` are dropped.
pub fn assemble(items: Vec<Item>) -> Vec<ItemView> {
    let mut children: HashMap<String, Vec<Item>> = HashMap::new();
    let mut roots = Vec::new();
    for item in items {
        match item.parent_id.clone() {
            Some(parent_id) => children.entry(parent_id).or_default().push(item),
            None => roots.push(item),
        }
    }
    roots
        .into_iter()
        .map(|item| {
            let children = if item.is_group {
                children.remove(&item.id).unwrap_or_default()
            } else {
                Vec::new()
            };
            ItemView { item, children }
        })
        .collect()
}

/// Orders roots by `sort`; children always follow the position order.
pub fn sort_views(views: &mut [ItemView], sort: DisplaySort) {
    views.sort_by(|a, b| compare(sort, &a.item, &b.item));
    for view in views.iter_mut() {
        view.children.sort_by(position_order);
    }
}
