#![forbid(unsafe_code)]

use crate::Command;
use anyhow::{Context, Result, anyhow, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::sync::Arc;
use tf_core::{Candidate, CandidateId, Entity, Job, JobDraft, JobId, NoteId, TimelineNote};
use tf_storage::seed::{SeedPlan, seed_if_empty};
use tf_storage::{DurableStore, SqliteStore};
use tf_sync::{
    CandidatesCache, Filter, JobsCache, JobsReconciler, MoveOutcome, OptimisticCache,
    Reconciler, SimConfig, SimulatedBackend, SyncConfig, TimelineCache,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

/// One process serves both sides: the simulated backend answers out of the same database
/// the client caches persist to.
struct App {
    store: Arc<dyn DurableStore>,
    backend: Arc<SimulatedBackend>,
    config: SyncConfig,
}

impl App {
    fn open(storage_dir: &Path) -> Result<Self> {
        let store: Arc<dyn DurableStore> = Arc::new(
            SqliteStore::open(storage_dir)
                .with_context(|| format!("open store at {}", storage_dir.display()))?,
        );
        let sim = SimConfig::from_env();
        info!(
            storage_dir = %storage_dir.display(),
            failure_rate = sim.failure_rate,
            "store opened"
        );
        Ok(Self {
            backend: Arc::new(SimulatedBackend::new(Arc::clone(&store), sim)),
            store,
            config: SyncConfig::from_env(),
        })
    }

    async fn jobs(&self) -> Result<(JobsCache, JobsReconciler)> {
        let cache = OptimisticCache::<Job>::new(
            self.backend.clone(),
            Arc::clone(&self.store),
            self.config.clone(),
        );
        cache.load(false).await.context("load jobs")?;
        let reconciler = Reconciler::<Job>::new(cache.clone(), self.backend.clone());
        Ok((cache, reconciler))
    }

    /// Candidate commands address single records, so the whole collection is loaded.
    async fn candidates(&self) -> Result<CandidatesCache> {
        let config = SyncConfig {
            load_page_size: usize::MAX,
            ..self.config.clone()
        };
        let cache = OptimisticCache::<Candidate>::new(
            self.backend.clone(),
            Arc::clone(&self.store),
            config,
        );
        cache.load(false).await.context("load candidates")?;
        Ok(cache)
    }

    async fn timeline(&self, candidate: &str) -> Result<TimelineCache> {
        let timeline = TimelineCache::new(
            CandidateId::try_new(candidate)?,
            self.backend.clone(),
            Arc::clone(&self.store),
        );
        timeline.refresh().await.context("load timeline")?;
        Ok(timeline)
    }
}

pub async fn run(storage_dir: &Path, command: Command) -> Result<()> {
    let app = App::open(storage_dir)?;
    match command {
        Command::Seed {
            jobs,
            candidates,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let plan = SeedPlan { jobs, candidates };
            if seed_if_empty(app.store.as_ref(), plan, &mut rng).await? {
                println!("seeded {jobs} jobs and {candidates} candidates");
            } else {
                println!("database already holds jobs; nothing seeded");
            }
        }
        Command::Jobs { search, status } => {
            let (cache, _) = app.jobs().await?;
            cache.set_filter(Filter {
                search,
                category: status,
            });
            let view = cache.read();
            for job in &view {
                print_job(job);
            }
            println!("{} of {} jobs", view.len(), cache.len());
        }
        Command::CreateJob { title, slug, tags } => {
            let (cache, _) = app.jobs().await?;
            let mut draft = JobDraft::new(title).with_tags(tags);
            draft.slug = slug;
            let created = cache.create(draft).await?;
            flush(&cache).await;
            print_job(&created);
        }
        Command::MoveJob { id, index } => {
            let (cache, reconciler) = app.jobs().await?;
            let id = JobId::try_new(id)?;
            match reconciler.move_to(&id, index).await? {
                MoveOutcome::Moved { from, to } => println!("moved {id} from {from} to {to}"),
                MoveOutcome::Unchanged { index } => println!("{id} already at {index}"),
                MoveOutcome::NotFound => bail!("no job with id {id}"),
            }
            flush(&cache).await;
        }
        Command::Archive { id } => {
            let (cache, _) = app.jobs().await?;
            let id = JobId::try_new(id)?;
            let job = cache
                .toggle_archive(&id)
                .await?
                .ok_or_else(|| anyhow!("no job with id {id}"))?;
            flush(&cache).await;
            print_job(&job);
        }
        Command::Candidates {
            search,
            stage,
            board,
        } => {
            let cache = app.candidates().await?;
            cache.set_filter(Filter {
                search,
                category: stage,
            });
            if board {
                for (stage, column) in cache.by_stage() {
                    println!("{} ({})", stage.title(), column.len());
                    for candidate in &column {
                        println!("  {}", candidate_line(candidate));
                    }
                }
            } else {
                let view = cache.read();
                for candidate in &view {
                    println!("{}", candidate_line(candidate));
                }
                println!("{} of {} candidates", view.len(), cache.len());
            }
        }
        Command::Stage { candidate, stage } => {
            let cache = app.candidates().await?;
            let id = CandidateId::try_new(candidate)?;
            let updated = cache
                .move_stage(&id, stage)
                .await?
                .ok_or_else(|| anyhow!("no candidate with id {id}"))?;
            flush(&cache).await;
            println!("{}", candidate_line(&updated));
        }
        Command::Timeline { candidate } => {
            let timeline = app.timeline(&candidate).await?;
            for event in timeline.events() {
                print_event(&event);
            }
        }
        Command::Note { candidate, text } => {
            let timeline = app.timeline(&candidate).await?;
            let note = timeline.add_note(text).await?;
            if timeline.is_stale() {
                warn!(candidate = %candidate, "note saved remotely but not locally");
            }
            print_event(&note);
        }
        Command::DeleteNote { candidate, note } => {
            let timeline = app.timeline(&candidate).await?;
            let note = NoteId::try_new(note)?;
            if !timeline.delete_note(&note).await? {
                bail!("no note {note} on {candidate}");
            }
            println!("deleted {note}");
        }
    }
    Ok(())
}

async fn flush<E: Entity>(cache: &OptimisticCache<E>) {
    if cache.stale_ids().is_empty() {
        return;
    }
    match cache.flush_stale().await {
        Ok(written) => info!(collection = E::COLLECTION, written, "stale entities flushed"),
        Err(err) => warn!(collection = E::COLLECTION, error = %err, "stale entities left behind"),
    }
}

fn print_job(job: &Job) {
    let tags = job.tags.iter().cloned().collect::<Vec<_>>().join(",");
    println!(
        "{:>3}  {:<21}  {:<8}  {}  [{tags}]",
        job.order,
        job.id,
        job.status.as_str(),
        job.title
    );
}

fn candidate_line(candidate: &Candidate) -> String {
    format!(
        "{:<21}  {:<8}  {} <{}>",
        candidate.id,
        candidate.stage.as_str(),
        candidate.name,
        candidate.email
    )
}

fn print_event(event: &TimelineNote) {
    println!("{}  {}  {}", format_ms(event.at_ms), event.id, event.text);
}

pub(crate) fn format_ms(at_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(at_ms) * 1_000_000)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| at_ms.to_string())
}
