#![forbid(unsafe_code)]

pub mod candidate;
pub mod entity;
pub mod ids;
pub mod job;
pub mod timeline;

pub use candidate::{Candidate, CandidateDraft, CandidatePatch, Stage, group_by_stage};
pub use entity::{Document, Entity, Provisional, Ranked};
pub use ids::{CandidateId, IdError, JobId, NoteId, TimelineId};
pub use job::{Job, JobDraft, JobPatch, JobStatus, slugify};
pub use timeline::{NOTE_KIND, Timeline, TimelineNote, sort_newest_first};

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
