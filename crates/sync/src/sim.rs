#![forbid(unsafe_code)]

//! In-process stand-in for the HTTP backend, answering out of a durable store with
//! configurable latency and random rejections.

use crate::SimConfig;
use crate::remote::{
    ListQuery, Page, RemoteCollection, RemoteError, RemoteReorder, RemoteTimeline,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tf_core::{
    CandidateId, Entity, NoteId, Provisional, Ranked, Timeline, TimelineId, TimelineNote,
};
use tf_storage::seed::random_id;
use tf_storage::{Collection, DurableStore, Query, StoreError};
use tracing::debug;

const SERVER_ERROR: u16 = 500;

pub struct SimulatedBackend {
    store: Arc<dyn DurableStore>,
    config: SimConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedBackend {
    pub fn new(store: Arc<dyn DurableStore>, config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Sleeps for the configured latency, then rolls for a rejection when `mutating`
    /// (or for every call when reads may fail too).
    async fn round_trip(&self, mutating: bool, failure: &str) -> Result<(), RemoteError> {
        let (delay_ms, fail) = {
            let mut rng = self.rng.lock();
            let delay_ms = rng.gen_range(self.config.latency_range());
            let rate = self.config.failure_rate.clamp(0.0, 1.0);
            let fail = (mutating || self.config.fail_reads) && rng.gen_bool(rate);
            (delay_ms, fail)
        };
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if fail {
            debug!(failure, "simulated rejection");
            return Err(RemoteError::Rejected {
                status: SERVER_ERROR,
                message: failure.to_string(),
            });
        }
        Ok(())
    }

    fn server_id(&self) -> String {
        random_id(&mut *self.rng.lock())
    }

    async fn find_timeline(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<Timeline>, RemoteError> {
        let query = Query::equals("candidateId", candidate.as_str()).with_limit(1);
        let found = Collection::<Timeline>::new(Arc::clone(&self.store))
            .query(&query)
            .await
            .map_err(internal)?;
        Ok(found.into_iter().next())
    }
}

fn internal(err: StoreError) -> RemoteError {
    RemoteError::Rejected {
        status: SERVER_ERROR,
        message: err.to_string(),
    }
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for SimulatedBackend {
    async fn list(&self, query: ListQuery<E::Category>) -> Result<Page<E>, RemoteError> {
        self.round_trip(false, "simulated error listing").await?;
        let mut items = Collection::<E>::new(Arc::clone(&self.store))
            .all()
            .await
            .map_err(internal)?;
        if !query.search.is_empty() {
            let needle = query.search.to_lowercase();
            items.retain(|item| item.matches_text(&needle));
        }
        if let Some(category) = query.category {
            items.retain(|item| item.category() == category);
        }
        items.sort_by_key(|item| item.rank());

        let total = items.len();
        let start = query.page.max(1).saturating_sub(1).saturating_mul(query.page_size);
        let items = items.into_iter().skip(start).take(query.page_size).collect();
        Ok(Page { items, total })
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        self.round_trip(true, "simulated server error creating").await?;
        let collection = Collection::<E>::new(Arc::clone(&self.store));
        let count = collection.count().await.map_err(internal)?;
        let id = E::Id::try_from(self.server_id())
            .map_err(|err| RemoteError::Transport(err.message().to_string()))?;
        let hint = Provisional {
            next_rank: u32::try_from(count).unwrap_or(u32::MAX),
            now_ms: tf_core::now_ms(),
        };
        let created = E::provisional(id, draft, hint);
        collection.add(&created).await.map_err(internal)?;
        Ok(created)
    }

    async fn patch(&self, id: &E::Id, patch: &E::Patch) -> Result<E, RemoteError> {
        self.round_trip(true, "simulated error updating").await?;
        let collection = Collection::<E>::new(Arc::clone(&self.store));
        if !collection.update(id.as_ref(), patch).await.map_err(internal)? {
            return Err(RemoteError::NotFound);
        }
        collection
            .get(id.as_ref())
            .await
            .map_err(internal)?
            .ok_or(RemoteError::NotFound)
    }
}

#[async_trait]
impl<E: Ranked> RemoteReorder<E> for SimulatedBackend {
    async fn reorder(&self, id: &E::Id, to_index: usize) -> Result<(), RemoteError> {
        self.round_trip(true, "reorder failed (simulated)").await?;
        let collection = Collection::<E>::new(Arc::clone(&self.store));
        let mut items = collection.all().await.map_err(internal)?;
        items.sort_by_key(|item| item.order());
        let from = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or(RemoteError::NotFound)?;
        let moved = items.remove(from);
        items.insert(to_index.min(items.len()), moved);

        let ops = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Collection::<E>::update_op(item.id().as_ref(), &json!({ "order": index }))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        self.store.transaction(ops).await.map_err(internal)
    }
}

#[async_trait]
impl RemoteTimeline for SimulatedBackend {
    async fn timeline(&self, candidate: &CandidateId) -> Result<Vec<TimelineNote>, RemoteError> {
        self.round_trip(false, "simulated error loading timeline").await?;
        Ok(self
            .find_timeline(candidate)
            .await?
            .map(|timeline| timeline.events)
            .unwrap_or_default())
    }

    async fn append_note(
        &self,
        candidate: &CandidateId,
        note: &TimelineNote,
    ) -> Result<Vec<TimelineNote>, RemoteError> {
        self.round_trip(true, "simulated error saving note").await?;
        let collection = Collection::<Timeline>::new(Arc::clone(&self.store));
        match self.find_timeline(candidate).await? {
            Some(mut timeline) => {
                timeline.events.insert(0, note.clone());
                collection.put(&timeline).await.map_err(internal)?;
                Ok(timeline.events)
            }
            None => {
                let id = TimelineId::try_new(format!("tl-{}", self.server_id()))
                    .map_err(|err| RemoteError::Transport(err.message().to_string()))?;
                let events = vec![note.clone()];
                collection
                    .add(&Timeline {
                        id,
                        candidate_id: candidate.clone(),
                        events: events.clone(),
                    })
                    .await
                    .map_err(internal)?;
                Ok(events)
            }
        }
    }

    async fn delete_note(
        &self,
        candidate: &CandidateId,
        note: &NoteId,
    ) -> Result<Vec<TimelineNote>, RemoteError> {
        self.round_trip(true, "simulated error deleting note").await?;
        let Some(mut timeline) = self.find_timeline(candidate).await? else {
            return Ok(Vec::new());
        };
        timeline.events.retain(|event| &event.id != note);
        Collection::<Timeline>::new(Arc::clone(&self.store))
            .put(&timeline)
            .await
            .map_err(internal)?;
        Ok(timeline.events)
    }
}
