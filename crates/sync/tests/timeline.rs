#![forbid(unsafe_code)]

mod support;

use std::sync::Arc;
use support::*;
use tf_core::{CandidateId, NoteId, Timeline, TimelineId, TimelineNote};
use tf_storage::{Collection, DurableStore, MemoryStore, Query};
use tf_sync::{SimConfig, SimulatedBackend, SyncError, TimelineCache};

fn candidate_id() -> CandidateId {
    CandidateId::try_new("cand-1").expect("candidate id")
}

fn note(id: &str, text: &str, at_ms: i64) -> TimelineNote {
    TimelineNote::note(NoteId::try_new(id).expect("note id"), text, at_ms)
}

async fn seeded_server(events: Vec<TimelineNote>) -> Arc<dyn DurableStore> {
    let server: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    Collection::<Timeline>::new(Arc::clone(&server))
        .add(&Timeline {
            id: TimelineId::try_new("tl-server").expect("timeline id"),
            candidate_id: candidate_id(),
            events,
        })
        .await
        .expect("seed timeline");
    server
}

fn backend(server: Arc<dyn DurableStore>, config: SimConfig) -> Arc<SimulatedBackend> {
    Arc::new(SimulatedBackend::new(server, config))
}

fn texts(events: &[TimelineNote]) -> Vec<&str> {
    events.iter().map(|event| event.text.as_str()).collect()
}

#[tokio::test]
async fn refresh_orders_events_newest_first() {
    let server = seeded_server(vec![note("n1", "older", 10), note("n2", "newer", 20)]).await;
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(server, SimConfig::reliable()),
        Arc::new(MemoryStore::new()),
    );

    let events = timeline.refresh().await.expect("refresh");
    assert_eq!(texts(&events), vec!["newer", "older"]);
    assert_eq!(timeline.events(), events);
}

#[tokio::test]
async fn added_note_lands_on_top_and_survives_in_the_local_store() {
    let server = seeded_server(vec![note("n1", "screen booked", 10)]).await;
    let local: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(server, SimConfig::reliable()),
        Arc::clone(&local),
    );
    timeline.refresh().await.expect("refresh");
    let (views, record) = recorder();
    let _sub = timeline.subscribe(record);

    let added = timeline
        .add_note("strong system design")
        .await
        .expect("add");
    assert_eq!(added.kind, "note");
    assert_eq!(
        texts(&timeline.events()),
        vec!["strong system design", "screen booked"]
    );
    assert_eq!(views.lock().len(), 3, "initial, speculative, settled");
    assert!(!timeline.is_stale());

    let stored = Collection::<Timeline>::new(Arc::clone(&local))
        .query(&Query::equals("candidateId", "cand-1"))
        .await
        .expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].events[0].id, added.id);

    let offline = TimelineCache::new(
        candidate_id(),
        backend(Arc::new(MemoryStore::new()), SimConfig::always_failing()),
        local,
    );
    let hydrated = offline.hydrate().await.expect("hydrate");
    assert_eq!(texts(&hydrated), vec!["strong system design", "screen booked"]);
}

#[tokio::test]
async fn rejected_note_disappears_again() {
    let server = seeded_server(vec![note("n1", "kept", 10)]).await;
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(server, SimConfig::always_failing()),
        Arc::new(MemoryStore::new()),
    );
    timeline.refresh().await.expect("reads still succeed");
    let before = timeline.events();

    let err = timeline.add_note("lost").await.expect_err("append rejected");
    assert!(err.is_rejection());
    assert_eq!(timeline.events(), before);
}

#[tokio::test]
async fn delete_removes_cached_notes_and_ignores_unknown_ones() {
    let server = seeded_server(vec![note("n1", "first", 10), note("n2", "second", 20)]).await;
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(Arc::clone(&server), SimConfig::reliable()),
        Arc::new(MemoryStore::new()),
    );
    timeline.refresh().await.expect("refresh");

    let missing = NoteId::try_new("nope").expect("note id");
    assert!(!timeline.delete_note(&missing).await.expect("no-op"));
    assert_eq!(timeline.events().len(), 2);

    let n2 = NoteId::try_new("n2").expect("note id");
    assert!(timeline.delete_note(&n2).await.expect("delete"));
    assert_eq!(texts(&timeline.events()), vec!["first"]);

    let server_copy = Collection::<Timeline>::new(server)
        .get("tl-server")
        .await
        .expect("get")
        .expect("timeline exists");
    assert_eq!(texts(&server_copy.events), vec!["first"]);
}

#[tokio::test]
async fn blank_note_is_rejected_before_any_network_call() {
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(Arc::new(MemoryStore::new()), SimConfig::always_failing()),
        Arc::new(MemoryStore::new()),
    );
    let err = timeline.add_note("   ").await.expect_err("blank text");
    assert!(matches!(err, SyncError::InvalidInput(_)));
    assert!(timeline.events().is_empty());
}

#[tokio::test]
async fn first_note_creates_the_server_timeline() {
    let server: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let timeline = TimelineCache::new(
        candidate_id(),
        backend(Arc::clone(&server), SimConfig::reliable()),
        Arc::new(MemoryStore::new()),
    );

    timeline.add_note("hello").await.expect("add");
    let created = Collection::<Timeline>::new(server)
        .query(&Query::equals("candidateId", "cand-1"))
        .await
        .expect("query");
    assert_eq!(created.len(), 1);
    assert!(created[0].id.as_str().starts_with("tl-"));
    assert_eq!(texts(&created[0].events), vec!["hello"]);
}
