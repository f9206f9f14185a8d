mod common;

use casetrack_core::constants::events as event_names;
use casetrack_core::exclusion::{ExclusionChange, ExclusionScope, ResetScope};
use casetrack_core::models::NoticePriority;
use casetrack_core::state_machine::Stage;
use casetrack_core::store::CaseStore;
use casetrack_core::sync::SyncLayer;
use casetrack_core::test_utils::{test_context, CaseBuilder};
use common::*;
use serde_json::json;
use std::time::Duration;

/// Poll `check` until it holds or two seconds pass
async fn eventually(sync: &SyncLayer, check: impl Fn(&SyncLayer) -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check(sync) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check(sync)
}

#[tokio::test]
async fn initial_load_skips_archived_and_diverts_sentinels() {
    let ctx = test_context();
    ctx.seed(CaseBuilder::new("b").due_in_days(5).build());
    ctx.seed(CaseBuilder::new("a").due_in_days(1).build());
    ctx.seed(CaseBuilder::new("old").archived().build());
    ctx.seed(
        CaseBuilder::new("notice")
            .case_number("Update")
            .tags(&["high", "New release", "Please restart"])
            .build(),
    );

    let loaded = ctx.sync.load().await.unwrap();

    assert_eq!(loaded, 2);
    let ids: Vec<String> = ctx.sync.cases().iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let notice = ctx.sync.latest_notice().unwrap();
    assert_eq!(notice.priority, NoticePriority::High);
    assert_eq!(notice.notes, "New release\nPlease restart");
    assert!(ctx.store.get(&"notice".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn feed_updates_reach_the_cache() {
    let ctx = test_context();
    let id = seed_digital(&ctx, "live", &["stage-design"]);
    ctx.sync.load().await.unwrap();
    let _handle = ctx.sync.clone().spawn();

    ctx.transitions.change_stage(&id, Some(Stage::Qc), false).await.unwrap();
    assert!(
        eventually(&ctx.sync, |s| {
            s.case(&id).is_some_and(|c| c.tags == tags(&["stage-qc"]))
        })
        .await
    );

    ctx.store.archive(&id).unwrap();
    assert!(eventually(&ctx.sync, |s| s.case(&id).is_none()).await);
}

#[tokio::test]
async fn sentinel_arriving_on_feed_becomes_notice() {
    let ctx = test_context();
    ctx.sync.load().await.unwrap();
    let _handle = ctx.sync.clone().spawn();
    let mut events = ctx.publisher.subscribe();

    ctx.seed(
        CaseBuilder::new("sentinel")
            .case_number(" UPDATE ")
            .tags(&["critical", "Hotfix"])
            .build(),
    );

    assert!(eventually(&ctx.sync, |s| s.latest_notice().is_some()).await);
    assert!(ctx.sync.cases().is_empty());

    let event = events.recv().await.unwrap();
    assert_eq!(event.name, event_names::UPDATE_NOTICE_RECEIVED);
    assert_eq!(event.context["priority"], json!("critical"));
    assert!(eventually(&ctx.sync, |_| ctx.store.is_empty()).await);
}

#[tokio::test]
async fn reset_event_forces_full_reload() {
    let ctx = test_context();
    // Seeded before the layer subscribes, so only a full reload can see it
    seed_digital(&ctx, "missed", &["stats-exclude:all"]);
    let _handle = ctx.sync.clone().spawn();
    assert!(ctx.sync.cases().is_empty());

    ctx.resets.reset_exclusions(ResetScope::Stage(Stage::Qc)).await.unwrap();

    assert!(eventually(&ctx.sync, |s| s.cases().len() == 1).await);
}

#[tokio::test]
async fn exclusion_event_forces_full_reload() {
    let ctx = test_context();
    let before = seed_digital(&ctx, "before", &[]);
    let _handle = ctx.sync.clone().spawn();

    ctx.exclusions
        .toggle_exclusion(&before, ExclusionChange::exclude(ExclusionScope::All, None))
        .await
        .unwrap();

    assert!(
        eventually(&ctx.sync, |s| {
            s.case(&before)
                .is_some_and(|c| c.tags == tags(&["stats-exclude:all"]))
        })
        .await
    );
}

#[tokio::test]
async fn dropping_the_handle_stops_following() {
    let ctx = test_context();
    ctx.sync.load().await.unwrap();
    let handle = ctx.sync.clone().spawn();
    drop(handle);
    tokio::time::sleep(Duration::from_millis(20)).await;

    seed_digital(&ctx, "late", &[]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(ctx.sync.cases().is_empty());
}
