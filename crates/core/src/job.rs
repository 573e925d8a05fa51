#![forbid(unsafe_code)]

use crate::entity::{Document, Entity, Provisional, Ranked, contains_lower};
use crate::ids::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
    Archived,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Open, JobStatus::Closed, JobStatus::Archived];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
            JobStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn toggled_archive(self) -> Self {
        match self {
            JobStatus::Archived => JobStatus::Open,
            JobStatus::Open | JobStatus::Closed => JobStatus::Archived,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    pub status: JobStatus,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub order: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl JobDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn resolved_slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.title))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

impl Document for Job {
    const COLLECTION: &'static str = "jobs";
    const INDEXES: &'static [&'static str] = &["slug", "status", "order"];

    fn doc_id(&self) -> &str {
        self.id.as_str()
    }
}

impl Entity for Job {
    type Id = JobId;
    type Draft = JobDraft;
    type Patch = JobPatch;
    type Category = JobStatus;

    fn id(&self) -> &JobId {
        &self.id
    }

    fn matches_text(&self, needle_lower: &str) -> bool {
        contains_lower(&self.title, needle_lower)
            || self.tags.iter().any(|tag| contains_lower(tag, needle_lower))
    }

    fn category(&self) -> JobStatus {
        self.status
    }

    fn rank(&self) -> Option<u32> {
        Some(self.order)
    }

    fn apply_patch(&self, patch: &JobPatch) -> Self {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(slug) = &patch.slug {
            next.slug = slug.clone();
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(tags) = &patch.tags {
            next.tags = tags.clone();
        }
        next
    }

    fn provisional(id: JobId, draft: &JobDraft, hint: Provisional) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            slug: draft.resolved_slug(),
            status: JobStatus::Open,
            tags: draft.tags.clone(),
            order: hint.next_rank,
        }
    }
}

impl Ranked for Job {
    fn order(&self) -> u32 {
        self.order
    }

    fn with_order(&self, order: u32) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }
}

/// Lowercases `value`, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims dashes from both ends.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}
