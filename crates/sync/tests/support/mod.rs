#![forbid(unsafe_code)]
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tf_core::{Candidate, CandidateId, Entity, Job, JobId, JobStatus, Ranked, Stage};
use tf_storage::{Collection, DurableStore, MemoryStore, Query, StoreError, WriteOp};
use tf_sync::{
    JobsCache, JobsReconciler, ListQuery, OptimisticCache, Page, Reconciler, RemoteCollection,
    RemoteError, RemoteReorder, SimConfig, SimulatedBackend, SyncConfig,
};
use tokio::sync::Semaphore;

pub fn job(id: &str, title: &str, status: JobStatus, order: u32) -> Job {
    Job {
        id: JobId::try_new(id).expect("job id"),
        title: title.to_string(),
        slug: format!("{id}-slug"),
        status,
        tags: Default::default(),
        order,
    }
}

pub fn numbered_jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| job(&format!("id{i}"), &format!("Job {i}"), JobStatus::Open, i as u32))
        .collect()
}

/// 25 jobs: every fifth title mentions engineering, statuses cycle open/closed/archived,
/// and orders run backwards so the projection has to sort.
pub fn dashboard_jobs() -> Vec<Job> {
    const TITLES: &[&str] = &[
        "Senior Engineer",
        "Product Designer",
        "Recruiter",
        "Data Analyst",
        "Support Lead",
    ];
    const STATUSES: &[JobStatus] = &[JobStatus::Open, JobStatus::Closed, JobStatus::Archived];
    (0..25)
        .map(|i| {
            job(
                &format!("j{i:02}"),
                &format!("{} {i}", TITLES[i % TITLES.len()]),
                STATUSES[i % STATUSES.len()],
                (24 - i) as u32,
            )
        })
        .collect()
}

pub fn candidate(id: &str, stage: Stage) -> Candidate {
    Candidate {
        id: CandidateId::try_new(id).expect("candidate id"),
        name: format!("Candidate {id}"),
        email: format!("{id}@example.com"),
        stage,
        job_id: JobId::try_new("id0").expect("job id"),
        created_at_ms: 0,
    }
}

pub fn ids<E: Entity>(items: &[E]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

pub fn orders<E: Ranked>(items: &[E]) -> Vec<u32> {
    items.iter().map(|item| item.order()).collect()
}

pub fn rejected() -> RemoteError {
    RemoteError::Rejected {
        status: 500,
        message: "scripted failure".to_string(),
    }
}

/// Wraps the simulated backend so tests can count calls, script failures, and hold
/// calls in flight until released.
pub struct ControlledRemote {
    backend: SimulatedBackend,
    calls: AtomicUsize,
    failures: Mutex<VecDeque<bool>>,
    always_fail: AtomicBool,
    hold: Option<Semaphore>,
}

impl ControlledRemote {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            backend: SimulatedBackend::new(store, SimConfig::reliable()),
            calls: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
            always_fail: AtomicBool::new(false),
            hold: None,
        }
    }

    /// Every call parks until `release` hands it a permit.
    pub fn held(store: Arc<dyn DurableStore>) -> Self {
        Self {
            hold: Some(Semaphore::new(0)),
            ..Self::new(store)
        }
    }

    pub fn release(&self, calls: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(calls);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queues outcomes for upcoming calls; `true` fails the call.
    pub fn script(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.failures.lock().extend(outcomes);
    }

    pub fn clear_script(&self) {
        self.failures.lock().clear();
    }

    pub fn fail_always(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    async fn step(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.acquire().await.expect("hold semaphore open").forget();
        }
        let scripted = self.failures.lock().pop_front().unwrap_or(false);
        if scripted || self.always_fail.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for ControlledRemote
where
    SimulatedBackend: RemoteCollection<E>,
{
    async fn list(&self, query: ListQuery<E::Category>) -> Result<Page<E>, RemoteError> {
        self.step().await?;
        RemoteCollection::<E>::list(&self.backend, query).await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        self.step().await?;
        RemoteCollection::<E>::create(&self.backend, draft).await
    }

    async fn patch(&self, id: &E::Id, patch: &E::Patch) -> Result<E, RemoteError> {
        self.step().await?;
        RemoteCollection::<E>::patch(&self.backend, id, patch).await
    }
}

#[async_trait]
impl<E: Ranked> RemoteReorder<E> for ControlledRemote
where
    SimulatedBackend: RemoteReorder<E>,
{
    async fn reorder(&self, id: &E::Id, to_index: usize) -> Result<(), RemoteError> {
        self.step().await?;
        RemoteReorder::<E>::reorder(&self.backend, id, to_index).await
    }
}

/// Client-side store whose writes can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidInput("writes disabled"));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.update(collection, id, partial).await
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.inner.count(collection).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.inner.query(collection, query).await
    }

    async fn all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.all(collection).await
    }

    async fn clear(&self, collection: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.clear(collection).await
    }

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.check()?;
        self.inner.transaction(ops).await
    }
}

pub struct JobsHarness {
    pub server: Arc<dyn DurableStore>,
    pub remote: Arc<ControlledRemote>,
    pub local: Arc<FlakyStore>,
    pub cache: JobsCache,
    pub reconciler: JobsReconciler,
}

impl JobsHarness {
    pub async fn new(jobs: Vec<Job>) -> Self {
        let server: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        Self::with_remote(jobs, Arc::clone(&server), ControlledRemote::new(server)).await
    }

    pub async fn held(jobs: Vec<Job>) -> Self {
        let server: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        Self::with_remote(jobs, Arc::clone(&server), ControlledRemote::held(server)).await
    }

    async fn with_remote(
        jobs: Vec<Job>,
        server: Arc<dyn DurableStore>,
        remote: ControlledRemote,
    ) -> Self {
        Collection::<Job>::new(Arc::clone(&server))
            .bulk_add(&jobs)
            .await
            .expect("seed server");
        let remote = Arc::new(remote);
        let local = Arc::new(FlakyStore::default());
        let cache = OptimisticCache::new(
            Arc::clone(&remote) as Arc<dyn RemoteCollection<Job>>,
            Arc::clone(&local) as Arc<dyn DurableStore>,
            SyncConfig::default(),
        );
        let reconciler = Reconciler::new(
            cache.clone(),
            Arc::clone(&remote) as Arc<dyn RemoteReorder<Job>>,
        );
        remote.release(1);
        cache.load(false).await.expect("initial load");
        Self {
            server,
            remote,
            local,
            cache,
            reconciler,
        }
    }

    pub async fn server_jobs(&self) -> Vec<Job> {
        let mut jobs = Collection::<Job>::new(Arc::clone(&self.server))
            .all()
            .await
            .expect("server jobs");
        jobs.sort_by_key(|job| job.order);
        jobs
    }

    pub async fn local_job(&self, id: &str) -> Option<Job> {
        Collection::<Job>::new(Arc::clone(&self.local) as Arc<dyn DurableStore>)
            .get(id)
            .await
            .expect("local job")
    }
}

pub fn job_id(id: &str) -> JobId {
    JobId::try_new(id).expect("job id")
}

/// Collects every view a subscriber receives.
pub fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync)
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |view: &T| sink.lock().push(view.clone()))
}
