#![forbid(unsafe_code)]

use crate::SyncError;
use crate::bus::{Subscription, SubscriptionBus};
use crate::remote::{RemoteError, RemoteTimeline};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tf_core::{CandidateId, NoteId, Timeline, TimelineId, TimelineNote, sort_newest_first};
use tf_storage::seed::random_id;
use tf_storage::{Collection, DurableStore, Query, StoreError};
use tracing::{debug, warn};

struct TimelineInner {
    candidate: CandidateId,
    remote: Arc<dyn RemoteTimeline>,
    store: Collection<Timeline>,
    events: Mutex<Vec<TimelineNote>>,
    stale: AtomicBool,
    bus: SubscriptionBus<Vec<TimelineNote>>,
    gate: tokio::sync::Mutex<()>,
}

/// Optimistic view of one candidate's timeline, newest event first.
#[derive(Clone)]
pub struct TimelineCache {
    inner: Arc<TimelineInner>,
}

impl TimelineCache {
    pub fn new(
        candidate: CandidateId,
        remote: Arc<dyn RemoteTimeline>,
        store: Arc<dyn DurableStore>,
    ) -> Self {
        Self {
            inner: Arc::new(TimelineInner {
                candidate,
                remote,
                store: Collection::new(store),
                events: Mutex::new(Vec::new()),
                stale: AtomicBool::new(false),
                bus: SubscriptionBus::new(),
                gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn candidate(&self) -> &CandidateId {
        &self.inner.candidate
    }

    pub fn events(&self) -> Vec<TimelineNote> {
        self.inner.events.lock().clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<TimelineNote>) + Send + Sync + 'static,
    {
        let view = self.events();
        self.inner.bus.subscribe(&view, callback)
    }

    /// `true` after the remote accepted a change the durable store failed to record.
    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::Relaxed)
    }

    /// Fills the cache from the durable store copy.
    pub async fn hydrate(&self) -> Result<Vec<TimelineNote>, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let events = self
            .stored_timeline()
            .await?
            .map(|timeline| timeline.events)
            .unwrap_or_default();
        Ok(self.replace(events))
    }

    /// Fills the cache from the remote.
    pub async fn refresh(&self) -> Result<Vec<TimelineNote>, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let events = self.inner.remote.timeline(&self.inner.candidate).await?;
        Ok(self.replace(events))
    }

    pub async fn add_note(&self, text: impl Into<String>) -> Result<TimelineNote, SyncError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SyncError::InvalidInput("note text must not be empty"));
        }
        let id = NoteId::try_new(random_id(&mut rand::thread_rng()))
            .map_err(|_| SyncError::InvalidInput("generated note id is invalid"))?;
        let note = TimelineNote::note(id, text, tf_core::now_ms());

        let _turn = self.inner.gate.lock().await;
        let snapshot = {
            let mut events = self.inner.events.lock();
            let snapshot = events.clone();
            events.insert(0, note.clone());
            snapshot
        };
        debug!(candidate = %self.inner.candidate, note = %note.id, "speculative note append");
        self.publish();

        match self
            .inner
            .remote
            .append_note(&self.inner.candidate, &note)
            .await
        {
            Ok(events) => {
                let events = self.replace(events);
                self.persist(events).await;
                Ok(note)
            }
            Err(err) => {
                self.restore(snapshot, "append_note", &err);
                Err(err.into())
            }
        }
    }

    /// Returns `false` without contacting the remote when the note is not cached.
    pub async fn delete_note(&self, id: &NoteId) -> Result<bool, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let snapshot = {
            let mut events = self.inner.events.lock();
            if !events.iter().any(|event| &event.id == id) {
                return Ok(false);
            }
            let snapshot = events.clone();
            events.retain(|event| &event.id != id);
            snapshot
        };
        debug!(candidate = %self.inner.candidate, note = %id, "speculative note delete");
        self.publish();

        match self.inner.remote.delete_note(&self.inner.candidate, id).await {
            Ok(events) => {
                let events = self.replace(events);
                self.persist(events).await;
                Ok(true)
            }
            Err(err) => {
                self.restore(snapshot, "delete_note", &err);
                Err(err.into())
            }
        }
    }

    fn publish(&self) {
        let view = self.events();
        self.inner.bus.publish(&view);
    }

    fn replace(&self, mut events: Vec<TimelineNote>) -> Vec<TimelineNote> {
        sort_newest_first(&mut events);
        *self.inner.events.lock() = events.clone();
        self.publish();
        events
    }

    fn restore(&self, snapshot: Vec<TimelineNote>, operation: &'static str, err: &RemoteError) {
        warn!(
            candidate = %self.inner.candidate,
            operation,
            error = %err,
            "remote rejected timeline change, rolling back"
        );
        *self.inner.events.lock() = snapshot;
        self.publish();
    }

    async fn stored_timeline(&self) -> Result<Option<Timeline>, StoreError> {
        let query = Query::equals("candidateId", self.inner.candidate.as_str()).with_limit(1);
        Ok(self.inner.store.query(&query).await?.into_iter().next())
    }

    async fn write_timeline(&self, events: Vec<TimelineNote>) -> Result<(), StoreError> {
        let id = match self.stored_timeline().await? {
            Some(existing) => existing.id,
            None => TimelineId::try_new(format!("tl-{}", self.inner.candidate))
                .map_err(|_| StoreError::InvalidInput("timeline id is invalid"))?,
        };
        self.inner
            .store
            .put(&Timeline {
                id,
                candidate_id: self.inner.candidate.clone(),
                events,
            })
            .await
    }

    /// A failed write after remote success only marks the timeline stale.
    async fn persist(&self, events: Vec<TimelineNote>) {
        match self.write_timeline(events).await {
            Ok(()) => self.inner.stale.store(false, Ordering::Relaxed),
            Err(err) => {
                warn!(
                    candidate = %self.inner.candidate,
                    error = %err,
                    "durable store write failed after remote success"
                );
                self.inner.stale.store(true, Ordering::Relaxed);
            }
        }
    }
}
