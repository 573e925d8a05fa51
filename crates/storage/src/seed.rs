#![forbid(unsafe_code)]

use crate::{Collection, DurableStore, StoreError};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tf_core::{Candidate, CandidateId, Document, Job, JobId, JobStatus, Stage, slugify};

const SENIORITY: &[&str] = &["Senior", "Junior", "Lead", "Principal"];
const DISCIPLINES: &[&str] = &["Frontend", "Backend", "Fullstack", "DevOps", "Designer"];
const TAG_POOL: &[&str] = &["frontend", "backend", "devops", "design", "hr", "product", "qa"];
const FIRST_NAMES: &[&str] = &[
    "Alex", "Sam", "Jordan", "Taylor", "Casey", "Riley", "Morgan", "Jamie", "Robin", "Avery",
];
const LAST_NAMES: &[&str] = &[
    "Patel", "Khan", "Gupta", "Singh", "Shah", "Rao", "Iyer", "Das", "Ganguly", "Roy",
];
const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const ID_LEN: usize = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedPlan {
    pub jobs: usize,
    pub candidates: usize,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            jobs: 25,
            candidates: 1000,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SeedData {
    pub jobs: Vec<Job>,
    pub candidates: Vec<Candidate>,
}

pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

pub fn generate<R: Rng + ?Sized>(plan: SeedPlan, rng: &mut R, now_ms: i64) -> SeedData {
    let mut jobs = Vec::with_capacity(plan.jobs);
    for index in 0..plan.jobs {
        let title = format!(
            "{} {} Engineer {}",
            pick(rng, SENIORITY),
            pick(rng, DISCIPLINES),
            index + 1
        );
        let tags = [pick(rng, TAG_POOL), pick(rng, TAG_POOL)]
            .into_iter()
            .map(str::to_string)
            .collect::<BTreeSet<_>>();
        let status = *JobStatus::ALL.choose(rng).unwrap_or(&JobStatus::Open);
        let Ok(id) = JobId::try_new(random_id(rng)) else {
            continue;
        };
        jobs.push(Job {
            id,
            slug: format!("{}-{}", slugify(&title), index + 1),
            title,
            status,
            tags,
            order: u32::try_from(jobs.len()).unwrap_or(u32::MAX),
        });
    }

    let mut candidates = Vec::with_capacity(plan.candidates);
    if !jobs.is_empty() {
        for index in 0..plan.candidates {
            let first = pick(rng, FIRST_NAMES);
            let last = pick(rng, LAST_NAMES);
            let job = &jobs[rng.gen_range(0..jobs.len())];
            let stage = *Stage::ALL.choose(rng).unwrap_or(&Stage::Applied);
            let Ok(id) = CandidateId::try_new(random_id(rng)) else {
                continue;
            };
            candidates.push(Candidate {
                id,
                name: format!("{first} {last} {index}"),
                email: format!(
                    "{}.{}{index}@gmail.com",
                    first.to_lowercase(),
                    last.to_lowercase()
                ),
                stage,
                job_id: job.id.clone(),
                created_at_ms: now_ms - rng.gen_range(0..=365) * DAY_MS,
            });
        }
    }

    SeedData { jobs, candidates }
}

/// Writes a generated data set in one transaction. Returns `false` and writes nothing
/// when the store already holds jobs.
pub async fn seed_if_empty<R: Rng + Send + ?Sized>(
    store: &dyn DurableStore,
    plan: SeedPlan,
    rng: &mut R,
) -> Result<bool, StoreError> {
    if store.count(Job::COLLECTION).await? > 0 {
        tracing::info!("store already seeded");
        return Ok(false);
    }
    let data = generate(plan, rng, tf_core::now_ms());
    let mut ops = Vec::with_capacity(data.jobs.len() + data.candidates.len());
    for job in &data.jobs {
        ops.push(Collection::<Job>::add_op(job)?);
    }
    for candidate in &data.candidates {
        ops.push(Collection::<Candidate>::add_op(candidate)?);
    }
    store.transaction(ops).await?;
    tracing::info!(
        jobs = data.jobs.len(),
        candidates = data.candidates.len(),
        "seeded store"
    );
    Ok(true)
}
