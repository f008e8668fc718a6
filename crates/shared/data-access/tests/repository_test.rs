//! Repository integration tests against in-memory SQLite.

mod common;

use std::collections::HashMap;

use sea_orm::ColumnTrait;

use common::{catalogue, seed, setup, widget};
use data_access::{DataError, DbContext, PersistenceContext, Repository, UnitOfWork};

#[tokio::test]
async fn test_add_is_visible_only_after_commit() {
    let db = setup().await;
    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    repo.add(common::widget(1, "bolt", true, 10));
    assert!(repo.get_all().all().await.unwrap().is_empty());
    assert!(ctx.tracker().has_changes());

    let affected = ctx.save_changes().await.unwrap();
    assert_eq!(affected, 1);
    assert!(!ctx.tracker().has_changes());

    let all = repo.get_all().all().await.unwrap();
    assert_eq!(all, vec![common::widget(1, "bolt", true, 10)]);

    let named = repo
        .filter(widget::Column::Name.eq("bolt"))
        .all()
        .await
        .unwrap();
    assert_eq!(named.len(), 1);
}

#[tokio::test]
async fn test_delete_then_commit_removes_entity() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let washer = repo.first(widget::Column::Name.eq("washer")).await.unwrap();
    repo.delete(washer);
    assert_eq!(repo.get_all().count().await.unwrap(), 5);

    ctx.save_changes().await.unwrap();

    assert_eq!(repo.get_all().count().await.unwrap(), 4);
    assert!(!repo.any(widget::Column::Name.eq("washer")).await.unwrap());
}

#[tokio::test]
async fn test_tracked_changes_are_saved_without_update() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let bolt = repo.first_tracked(widget::Column::Id.eq(1)).await.unwrap();
    bolt.modify(|w| w.quantity = 99);
    assert_eq!(ctx.tracker().pending_count(), 1);

    assert_eq!(ctx.save_changes().await.unwrap(), 1);

    let reader = DbContext::new(db.clone());
    let stored = Repository::<widget::Entity>::new(&reader)
        .get_by_id(1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 99);

    // Snapshot refreshed, so a second commit has nothing to do
    assert_eq!(ctx.save_changes().await.unwrap(), 0);
}

#[tokio::test]
async fn test_detached_changes_need_explicit_update() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let mut nut = repo.get_by_id(2).await.unwrap().unwrap();
    nut.name = "hex nut".to_string();

    assert_eq!(ctx.save_changes().await.unwrap(), 0);
    let stored = repo.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(stored.name, "nut");

    repo.update(nut);
    assert_eq!(ctx.save_changes().await.unwrap(), 1);
    let stored = repo.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(stored.name, "hex nut");
}

#[tokio::test]
async fn test_tracked_reads_share_one_instance_per_row() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let first = repo.first_tracked(widget::Column::Id.eq(4)).await.unwrap();
    let all = repo.get_all_with_tracking().all().await.unwrap();
    let again = all
        .iter()
        .find(|w| w.read(|m| m.id) == 4)
        .expect("gear should be listed");

    assert!(first.same_instance(again));
    assert_eq!(ctx.tracker().tracked_count(), 5);
}

#[tokio::test]
async fn test_tracking_large_result_sets_keeps_one_entry_per_row() {
    let db = setup().await;
    let rows: Vec<widget::Model> = (1..=2_000)
        .map(|id| common::widget(id, "part", id % 2 == 0, id))
        .collect();
    seed(&db, rows).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let first = repo.get_all_with_tracking().all().await.unwrap();
    let second = repo.get_all_with_tracking().all().await.unwrap();
    assert_eq!(ctx.tracker().tracked_count(), 2_000);
    assert!(first
        .iter()
        .zip(second.iter())
        .all(|(a, b)| a.same_instance(b)));

    second[1_234].modify(|w| w.quantity = 0);
    assert_eq!(ctx.tracker().pending_count(), 1);

    repo.delete(first[1_234].get());
    assert_eq!(ctx.tracker().tracked_count(), 1_999);
    assert_eq!(ctx.tracker().pending_count(), 1);
}

#[tokio::test]
async fn test_count_by_partitions_collection() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let counts = repo
        .count_by(widget::Column::InStock.eq(true))
        .fetch()
        .await
        .unwrap();
    assert_eq!(counts, HashMap::from([(true, 3), (false, 2)]));

    let everything = repo
        .count_by(widget::Column::Id.gt(0))
        .fetch()
        .await
        .unwrap();
    assert_eq!(everything, HashMap::from([(true, 5)]));
}

#[tokio::test]
async fn test_count_by_groups_compound_predicates() {
    let db = setup().await;
    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);
    let well_stocked = widget::Column::InStock
        .eq(true)
        .and(widget::Column::Quantity.gt(5));

    assert!(repo.count_by(well_stocked.clone()).fetch().await.unwrap().is_empty());

    seed(&db, catalogue()).await;

    let counts = repo.count_by(well_stocked).fetch().await.unwrap();
    assert_eq!(counts, HashMap::from([(true, 2), (false, 3)]));
    assert_eq!(counts.values().sum::<u64>(), repo.get_all().count().await.unwrap());
}

#[tokio::test]
async fn test_count_by_is_re_evaluated() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);
    let in_stock = repo.count_by(widget::Column::InStock.eq(true));

    assert_eq!(in_stock.fetch().await.unwrap().get(&true), Some(&3));

    repo.add(common::widget(6, "pulley", true, 1));
    ctx.save_changes().await.unwrap();

    assert_eq!(in_stock.fetch().await.unwrap().get(&true), Some(&4));
}

#[tokio::test]
async fn test_first_fails_but_first_or_default_returns_none() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);
    let missing = widget::Column::Name.eq("sprocket");

    let err = repo.first(missing.clone()).await.unwrap_err();
    assert!(matches!(err, DataError::EmptySequence));

    assert!(repo.first_or_default(missing.clone()).await.unwrap().is_none());
    assert!(repo.get_by_expression(missing.clone()).await.unwrap().is_none());
    assert!(repo
        .get_by_expression_with_tracking(missing)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_get_first_on_empty_and_populated_tables() {
    let db = setup().await;
    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    assert!(repo.get_first().await.unwrap().is_none());

    seed(&db, catalogue()).await;
    assert!(repo.get_first().await.unwrap().is_some());
}

#[tokio::test]
async fn test_any_reports_matches() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    assert!(repo.any(widget::Column::Quantity.gt(20)).await.unwrap());
    assert!(!repo.any(widget::Column::Quantity.gt(100)).await.unwrap());
}

#[tokio::test]
async fn test_delete_by_id_and_expression() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    repo.delete_by_id(1).await.unwrap();
    repo.delete_by_expression(widget::Column::Name.eq("spring"))
        .await
        .unwrap();
    assert_eq!(ctx.save_changes().await.unwrap(), 2);

    let remaining: Vec<i32> = repo
        .get_all()
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(remaining.len(), 3);
    assert!(!remaining.contains(&1));
    assert!(!remaining.contains(&5));
}

#[tokio::test]
async fn test_delete_of_missing_entity_is_not_found() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let by_id = repo.delete_by_id(42).await.unwrap_err();
    assert!(matches!(by_id, DataError::NotFound(ref table) if table == "widgets"));

    let by_expression = repo
        .delete_by_expression(widget::Column::Name.eq("sprocket"))
        .await
        .unwrap_err();
    assert!(matches!(by_expression, DataError::NotFound(_)));
    assert!(!ctx.tracker().has_changes());
}

#[tokio::test]
async fn test_range_operations() {
    let db = setup().await;
    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    repo.add_range(catalogue());
    assert_eq!(ctx.save_changes().await.unwrap(), 5);

    let mut out_of_stock = repo
        .filter(widget::Column::InStock.eq(false))
        .all()
        .await
        .unwrap();
    for w in &mut out_of_stock {
        w.quantity = 50;
        w.in_stock = true;
    }
    repo.update_range(out_of_stock);
    assert_eq!(ctx.save_changes().await.unwrap(), 2);
    assert!(!repo.any(widget::Column::InStock.eq(false)).await.unwrap());

    let big = repo
        .filter(widget::Column::Quantity.gte(25))
        .all()
        .await
        .unwrap();
    assert_eq!(big.len(), 3);
    repo.delete_range(big);
    assert_eq!(ctx.save_changes().await.unwrap(), 3);
    assert_eq!(repo.get_all().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_staged_delete_stops_tracking() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let gear = repo.first_tracked(widget::Column::Id.eq(4)).await.unwrap();
    gear.modify(|w| w.quantity = 0);
    repo.delete(gear.get());

    assert_eq!(ctx.tracker().tracked_count(), 0);
    assert_eq!(ctx.save_changes().await.unwrap(), 1);
    assert!(repo.get_by_id(4).await.unwrap().is_none());
}

#[tokio::test]
async fn test_query_views_compose_filters() {
    let db = setup().await;
    seed(&db, catalogue()).await;

    let ctx = DbContext::new(db.clone());
    let repo = Repository::<widget::Entity>::new(&ctx);

    let query = repo
        .filter(widget::Column::InStock.eq(true))
        .filter(widget::Column::Quantity.lt(20));
    let ids: Vec<i32> = query.all().await.unwrap().into_iter().map(|w| w.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&1));
    assert!(ids.contains(&4));

    let tracked = query.with_tracking().all().await.unwrap();
    assert_eq!(tracked.len(), 2);
    assert_eq!(ctx.tracker().tracked_count(), 2);
}
