#![forbid(unsafe_code)]

use crate::entity::Document;
use crate::ids::{CandidateId, NoteId, TimelineId};
use serde::{Deserialize, Serialize};

pub const NOTE_KIND: &str = "note";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNote {
    pub id: NoteId,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(rename = "atMs")]
    pub at_ms: i64,
}

impl TimelineNote {
    pub fn note(id: NoteId, text: impl Into<String>, at_ms: i64) -> Self {
        Self {
            id,
            kind: NOTE_KIND.to_string(),
            text: text.into(),
            at_ms,
        }
    }
}

/// Per-candidate event log. `events` is newest-first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: TimelineId,
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub events: Vec<TimelineNote>,
}

impl Document for Timeline {
    const COLLECTION: &'static str = "timelines";
    const INDEXES: &'static [&'static str] = &["candidateId"];

    fn doc_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Newest first; notes sharing a timestamp keep their relative order.
pub fn sort_newest_first(events: &mut [TimelineNote]) {
    events.sort_by(|a, b| b.at_ms.cmp(&a.at_ms));
}
