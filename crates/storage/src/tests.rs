use super::*;
use crate::query::compare_scalars;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::cmp::Ordering;

#[test]
fn scalar_ordering_matches_sqlite_classes() {
    assert_eq!(compare_scalars(&json!(null), &json!(0)), Ordering::Less);
    assert_eq!(compare_scalars(&json!(2), &json!(10)), Ordering::Less);
    assert_eq!(compare_scalars(&json!(10), &json!("1")), Ordering::Less);
    assert_eq!(compare_scalars(&json!(true), &json!(1)), Ordering::Equal);
    assert_eq!(compare_scalars(&json!("b"), &json!("a")), Ordering::Greater);
}

#[test]
fn between_is_inclusive_and_skips_missing_fields() {
    let query = Query::between("order", Some(json!(1)), Some(json!(3)));
    assert!(query.matches(&json!(1)));
    assert!(query.matches(&json!(3)));
    assert!(!query.matches(&json!(4)));
    assert!(!query.matches(&json!(null)));
}

#[tokio::test]
async fn memory_update_merges_and_reports_missing() {
    let store = MemoryStore::new();
    store
        .add("jobs", "a", json!({ "id": "a", "title": "x", "order": 0 }))
        .await
        .unwrap();
    assert!(store.update("jobs", "a", json!({ "order": 4 })).await.unwrap());
    assert!(!store.update("jobs", "zz", json!({ "order": 4 })).await.unwrap());
    let doc = store.get("jobs", "a").await.unwrap().unwrap();
    assert_eq!(doc, json!({ "id": "a", "title": "x", "order": 4 }));
    assert!(store.get("jobs", "zz").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_transaction_is_all_or_nothing() {
    let store = MemoryStore::new();
    store.add("jobs", "a", json!({ "id": "a" })).await.unwrap();
    let err = store
        .transaction(vec![
            WriteOp::Put {
                collection: "jobs".to_string(),
                id: "b".to_string(),
                body: json!({ "id": "b" }),
            },
            WriteOp::Add {
                collection: "jobs".to_string(),
                id: "a".to_string(),
                body: json!({ "id": "a", "dup": true }),
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
    assert_eq!(store.count("jobs").await.unwrap(), 1);
    assert!(store.get("jobs", "b").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_query_orders_by_field_then_id() {
    let store = MemoryStore::new();
    store
        .bulk_add(
            "jobs",
            vec![
                ("c".to_string(), json!({ "status": "open", "order": 2 })),
                ("a".to_string(), json!({ "status": "open", "order": 0 })),
                ("b".to_string(), json!({ "status": "closed", "order": 1 })),
            ],
        )
        .await
        .unwrap();
    let open = store
        .query("jobs", &Query::equals("status", "open"))
        .await
        .unwrap();
    assert_eq!(open.len(), 2);
    assert_eq!(open[0]["order"], 0);

    let tail = store
        .query("jobs", &Query::between("order", Some(json!(1)), None).with_limit(1))
        .await
        .unwrap();
    assert_eq!(tail, vec![json!({ "status": "closed", "order": 1 })]);
}

#[test]
fn seed_generation_is_deterministic_and_dense() {
    let plan = seed::SeedPlan {
        jobs: 25,
        candidates: 40,
    };
    let first = seed::generate(plan, &mut StdRng::seed_from_u64(7), 1_000);
    let second = seed::generate(plan, &mut StdRng::seed_from_u64(7), 1_000);
    assert_eq!(first.jobs, second.jobs);
    assert_eq!(first.jobs.len(), 25);
    assert_eq!(first.candidates.len(), 40);
    let orders: Vec<u32> = first.jobs.iter().map(|job| job.order).collect();
    assert_eq!(orders, (0..25).collect::<Vec<u32>>());
    assert!(first.jobs[0].title.ends_with("Engineer 1"));
    assert!(first.jobs[0].slug.ends_with("-1"));
    assert!(
        first
            .candidates
            .iter()
            .all(|c| first.jobs.iter().any(|j| j.id == c.job_id))
    );
}

#[tokio::test]
async fn seed_if_empty_runs_once() {
    let store = MemoryStore::new();
    let plan = seed::SeedPlan {
        jobs: 5,
        candidates: 10,
    };
    let mut rng = StdRng::seed_from_u64(1);
    assert!(seed::seed_if_empty(&store, plan, &mut rng).await.unwrap());
    assert!(!seed::seed_if_empty(&store, plan, &mut rng).await.unwrap());
    assert_eq!(store.count("jobs").await.unwrap(), 5);
    assert_eq!(store.count("candidates").await.unwrap(), 10);
}
