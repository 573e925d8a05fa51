#![forbid(unsafe_code)]

use crate::entity::{Document, Entity, Provisional, contains_lower};
use crate::ids::{CandidateId, JobId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hiring pipeline, in board order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Applied,
    Screen,
    Tech,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Applied,
        Stage::Screen,
        Stage::Tech,
        Stage::Offer,
        Stage::Hired,
        Stage::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Screen => "screen",
            Stage::Tech => "tech",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Screen => "Screen",
            Stage::Tech => "Tech",
            Stage::Offer => "Offer",
            Stage::Hired => "Hired",
            Stage::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|stage| stage.as_str() == value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub stage: Stage,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "createdAtMs", default)]
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub name: String,
    pub email: String,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(rename = "jobId", default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl CandidatePatch {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }
}

impl Document for Candidate {
    const COLLECTION: &'static str = "candidates";
    const INDEXES: &'static [&'static str] = &["email", "stage", "jobId", "createdAtMs"];

    fn doc_id(&self) -> &str {
        self.id.as_str()
    }
}

impl Entity for Candidate {
    type Id = CandidateId;
    type Draft = CandidateDraft;
    type Patch = CandidatePatch;
    type Category = Stage;

    fn id(&self) -> &CandidateId {
        &self.id
    }

    fn matches_text(&self, needle_lower: &str) -> bool {
        contains_lower(&self.name, needle_lower) || contains_lower(&self.email, needle_lower)
    }

    fn category(&self) -> Stage {
        self.stage
    }

    fn apply_patch(&self, patch: &CandidatePatch) -> Self {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(email) = &patch.email {
            next.email = email.clone();
        }
        if let Some(stage) = patch.stage {
            next.stage = stage;
        }
        if let Some(job_id) = &patch.job_id {
            next.job_id = job_id.clone();
        }
        next
    }

    fn provisional(id: CandidateId, draft: &CandidateDraft, hint: Provisional) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            stage: draft.stage.unwrap_or(Stage::Applied),
            job_id: draft.job_id.clone(),
            created_at_ms: hint.now_ms,
        }
    }
}

/// Kanban columns: every stage is present, candidates keep their input order.
pub fn group_by_stage(candidates: &[Candidate]) -> BTreeMap<Stage, Vec<Candidate>> {
    let mut columns: BTreeMap<Stage, Vec<Candidate>> =
        Stage::ALL.into_iter().map(|stage| (stage, Vec::new())).collect();
    for candidate in candidates {
        columns
            .entry(candidate.stage)
            .or_default()
            .push(candidate.clone());
    }
    columns
}
