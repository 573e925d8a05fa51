#![forbid(unsafe_code)]

use crate::bus::{Subscription, SubscriptionBus};
use crate::filter::{Filter, project};
use crate::remote::{ListQuery, RemoteCollection, RemoteError};
use crate::{SyncConfig, SyncError};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tf_core::{Entity, Provisional};
use tf_storage::{Collection, DurableStore, StoreError, WriteOp};
use tracing::{debug, info, warn};

pub(crate) struct State<E: Entity> {
    pub(crate) items: Vec<E>,
    pub(crate) filter: Filter<E::Category>,
    /// Accepted by the remote but not yet written to the durable store.
    pub(crate) stale: BTreeSet<E::Id>,
}

pub(crate) struct Inner<E: Entity> {
    remote: Arc<dyn RemoteCollection<E>>,
    store: Collection<E>,
    config: SyncConfig,
    pub(crate) state: Mutex<State<E>>,
    bus: SubscriptionBus<Vec<E>>,
    /// Single-flight turn: a mutation snapshots only after the previous one settled.
    pub(crate) gate: tokio::sync::Mutex<()>,
    temp_seq: AtomicU64,
}

/// In-memory mirror of one entity collection.
///
/// Every mutation runs snapshot, speculate (apply + publish), then reconcile against the
/// remote: success merges the server value, persists it and publishes again; failure
/// restores the snapshot, publishes, and returns the error. Mutations on one cache are
/// serialized, so a rollback only ever reverts its own change.
pub struct OptimisticCache<E: Entity> {
    inner: Arc<Inner<E>>,
}

impl<E: Entity> Clone for OptimisticCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) fn rank_of(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

impl<E: Entity> OptimisticCache<E> {
    pub fn new(
        remote: Arc<dyn RemoteCollection<E>>,
        store: Arc<dyn DurableStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                store: Collection::new(store),
                config,
                state: Mutex::new(State {
                    items: Vec::new(),
                    filter: Filter::default(),
                    stale: BTreeSet::new(),
                }),
                bus: SubscriptionBus::new(),
                gate: tokio::sync::Mutex::new(()),
                temp_seq: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Inner<E> {
        &self.inner
    }

    /// Current filtered, sorted projection. Never blocks on in-flight mutations.
    pub fn read(&self) -> Vec<E> {
        let state = self.inner.state.lock();
        project(&state.items, &state.filter)
    }

    /// Raw collection, unfiltered, in cache order.
    pub fn snapshot(&self) -> Vec<E> {
        self.inner.state.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filter(&self) -> Filter<E::Category> {
        self.inner.state.lock().filter.clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<E>) + Send + Sync + 'static,
    {
        let view = self.read();
        self.inner.bus.subscribe(&view, callback)
    }

    pub fn set_filter(&self, filter: Filter<E::Category>) {
        self.inner.state.lock().filter = filter;
        self.publish();
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.inner.state.lock().filter.search = text.into();
        self.publish();
    }

    pub fn set_category(&self, category: Option<E::Category>) {
        self.inner.state.lock().filter.category = category;
        self.publish();
    }

    pub fn clear(&self) {
        self.inner.state.lock().items.clear();
        self.publish();
    }

    /// Cache-fill: hits the remote only when the cache is empty or `force` is set, and
    /// then replaces the whole collection.
    pub async fn load(&self, force: bool) -> Result<Vec<E>, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let cached = {
            let state = self.inner.state.lock();
            (!force && !state.items.is_empty()).then(|| state.items.clone())
        };
        if let Some(items) = cached {
            self.publish();
            return Ok(items);
        }

        let query = ListQuery::first_page(self.inner.config.load_page_size);
        let page = self.inner.remote.list(query).await?;
        info!(
            collection = E::COLLECTION,
            loaded = page.items.len(),
            total = page.total,
            "loaded collection"
        );
        self.inner.state.lock().items = page.items.clone();
        self.publish();
        Ok(page.items)
    }

    pub async fn refresh(&self) -> Result<Vec<E>, SyncError> {
        self.load(true).await
    }

    /// Cached entity, falling back to the durable store.
    pub async fn get(&self, id: &E::Id) -> Result<Option<E>, SyncError> {
        let cached = {
            let state = self.inner.state.lock();
            state.items.iter().find(|item| item.id() == id).cloned()
        };
        if cached.is_some() {
            return Ok(cached);
        }
        Ok(self.inner.store.get(id.as_ref()).await?)
    }

    pub async fn create(&self, draft: E::Draft) -> Result<E, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let temp_id = self.next_temp_id()?;
        let snapshot = {
            let mut state = self.inner.state.lock();
            let snapshot = state.items.clone();
            let hint = Provisional {
                next_rank: rank_of(state.items.len()),
                now_ms: tf_core::now_ms(),
            };
            state
                .items
                .insert(0, E::provisional(temp_id.clone(), &draft, hint));
            snapshot
        };
        debug!(collection = E::COLLECTION, id = %temp_id, "speculative create");
        self.publish();

        let created = match self.inner.remote.create(&draft).await {
            Ok(created) => created,
            Err(err) => {
                self.restore(snapshot, "create", &err);
                return Err(err.into());
            }
        };

        {
            let mut state = self.inner.state.lock();
            if let Some(slot) = state.items.iter_mut().find(|item| item.id() == &temp_id) {
                *slot = created.clone();
            }
        }
        debug!(collection = E::COLLECTION, temp = %temp_id, id = %created.id(), "create settled");
        self.persist(
            "create",
            Collection::<E>::put_op(&created).map(|op| vec![op]),
            vec![created.id().clone()],
        )
        .await;
        self.publish();
        Ok(created)
    }

    /// Field-merge update. A missing id is a no-op returning `Ok(None)`.
    pub async fn patch(&self, id: &E::Id, patch: E::Patch) -> Result<Option<E>, SyncError> {
        self.patch_with("patch", id, move |_| Some(patch)).await
    }

    /// Runs a patch computed from the entity's value at the start of this mutation's
    /// turn. `make_patch` returning `None` leaves the entity untouched.
    pub(crate) async fn patch_with<F>(
        &self,
        operation: &'static str,
        id: &E::Id,
        make_patch: F,
    ) -> Result<Option<E>, SyncError>
    where
        F: FnOnce(&E) -> Option<E::Patch> + Send,
    {
        let _turn = self.inner.gate.lock().await;
        let (snapshot, patch) = {
            let mut state = self.inner.state.lock();
            let Some(position) = state.items.iter().position(|item| item.id() == id) else {
                return Ok(None);
            };
            let Some(patch) = make_patch(&state.items[position]) else {
                return Ok(Some(state.items[position].clone()));
            };
            let snapshot = state.items.clone();
            let next = state.items[position].apply_patch(&patch);
            state.items[position] = next;
            (snapshot, patch)
        };
        debug!(collection = E::COLLECTION, %id, operation, "speculative patch");
        self.publish();

        let updated = match self.inner.remote.patch(id, &patch).await {
            Ok(updated) => updated,
            Err(err) => {
                self.restore(snapshot, operation, &err);
                return Err(err.into());
            }
        };

        {
            let mut state = self.inner.state.lock();
            if let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) {
                *slot = updated.clone();
            }
        }
        self.persist(
            operation,
            Collection::<E>::put_op(&updated).map(|op| vec![op]),
            vec![updated.id().clone()],
        )
        .await;
        self.publish();
        Ok(Some(updated))
    }

    /// Ids whose durable copy lags behind the cache.
    pub fn stale_ids(&self) -> Vec<E::Id> {
        self.inner.state.lock().stale.iter().cloned().collect()
    }

    /// Re-persists stale entities from their current cached value. Ids no longer cached
    /// are dropped from the stale set.
    pub async fn flush_stale(&self) -> Result<usize, SyncError> {
        let _turn = self.inner.gate.lock().await;
        let pending = {
            let state = self.inner.state.lock();
            state
                .items
                .iter()
                .filter(|item| state.stale.contains(item.id()))
                .cloned()
                .collect::<Vec<_>>()
        };
        if !pending.is_empty() {
            let ops = pending
                .iter()
                .map(Collection::<E>::put_op)
                .collect::<Result<Vec<_>, _>>()?;
            self.inner.store.store().transaction(ops).await?;
        }
        self.inner.state.lock().stale.clear();
        Ok(pending.len())
    }

    pub(crate) fn publish(&self) {
        let view = self.read();
        self.inner.bus.publish(&view);
    }

    pub(crate) fn restore(&self, snapshot: Vec<E>, operation: &'static str, err: &RemoteError) {
        warn!(
            collection = E::COLLECTION,
            operation,
            error = %err,
            "remote rejected change, rolling back"
        );
        self.inner.state.lock().items = snapshot;
        self.publish();
    }

    /// The remote already accepted the change, so a failed write is logged and the ids
    /// are marked stale instead of failing the mutation.
    pub(crate) async fn persist(
        &self,
        operation: &'static str,
        ops: Result<Vec<WriteOp>, StoreError>,
        ids: Vec<E::Id>,
    ) {
        let result = match ops {
            Ok(ops) => self.inner.store.store().transaction(ops).await,
            Err(err) => Err(err),
        };
        let mut state = self.inner.state.lock();
        match result {
            Ok(()) => {
                for id in &ids {
                    state.stale.remove(id);
                }
            }
            Err(err) => {
                warn!(
                    collection = E::COLLECTION,
                    operation,
                    error = %err,
                    "durable store write failed after remote success"
                );
                state.stale.extend(ids);
            }
        }
    }

    fn next_temp_id(&self) -> Result<E::Id, SyncError> {
        let seq = self.inner.temp_seq.fetch_add(1, Ordering::Relaxed);
        let raw = format!("{}{}-{seq}", self.inner.config.temp_id_prefix, E::COLLECTION);
        E::Id::try_from(raw)
            .map_err(|_| SyncError::InvalidInput("temp id prefix does not form a valid id"))
    }
}
