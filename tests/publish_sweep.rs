use chrono::{Duration, Utc};
use linkbio_core::models::{LinkAttributes, NewLink, SweepReport};
use linkbio_core::{Database, PageCore, PublishScheduler};
use std::sync::Arc;

fn scheduled_link(title: &str) -> NewLink {
    NewLink {
        title: title.to_string(),
        attributes: LinkAttributes {
            url: format!("https://example.com/{}", title.to_lowercase()),
            ..LinkAttributes::default()
        },
        ..NewLink::default()
    }
}

#[tokio::test]
async fn sweep_publishes_and_expires_without_touching_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(Database::new(&dir.path().join("pages.db")).expect("db"));
    let core = PageCore::new(db.clone());
    core.claim_username("creator", "creator").expect("username");
    let now = Utc::now();

    let always = core
        .create_link("creator", scheduled_link("Always"))
        .expect("always");
    let mut launch = scheduled_link("Launch");
    launch.scheduled_at = Some(now + Duration::hours(1));
    let launch = core.create_link("creator", launch).expect("launch");
    let mut promo = scheduled_link("Promo");
    promo.expires_at = Some(now + Duration::hours(2));
    let promo = core.create_link("creator", promo).expect("promo");
    core.toggle_pin("creator", &promo.id).expect("pin promo");

    let upcoming = core.upcoming_schedules("creator", 10).expect("upcoming");
    let upcoming_ids: Vec<&str> = upcoming.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(upcoming_ids, vec![launch.id.as_str(), promo.id.as_str()]);

    let page = core.public_page("creator").expect("page");
    let visible: Vec<&str> = page.items.iter().map(|view| view.item.id.as_str()).collect();
    assert_eq!(visible, vec![promo.id.as_str(), always.id.as_str()]);

    let scheduler = PublishScheduler::new(db.clone(), std::time::Duration::from_secs(60));
    let report = scheduler
        .sweep(now + Duration::minutes(90))
        .await
        .expect("first sweep");
    assert_eq!(report, SweepReport { activated: 1, deactivated: 0 });

    let report = scheduler
        .sweep(now + Duration::hours(3))
        .await
        .expect("second sweep");
    assert_eq!(report, SweepReport { activated: 0, deactivated: 1 });

    let page = core.public_page("creator").expect("page");
    let visible: Vec<&str> = page.items.iter().map(|view| view.item.id.as_str()).collect();
    assert_eq!(visible, vec![always.id.as_str(), launch.id.as_str()]);

    let promo_after = core.get_item("creator", &promo.id).expect("promo");
    assert!(promo_after.is_pinned);
    assert_eq!(promo_after.position, promo.position);
}
