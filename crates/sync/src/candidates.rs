#![forbid(unsafe_code)]

use crate::{OptimisticCache, SyncError};
use std::collections::BTreeMap;
use tf_core::{Candidate, CandidateId, CandidatePatch, Stage, group_by_stage};

pub type CandidatesCache = OptimisticCache<Candidate>;

impl OptimisticCache<Candidate> {
    /// Kanban drop. Dropping into the current column changes nothing and sends nothing.
    pub async fn move_stage(
        &self,
        id: &CandidateId,
        stage: Stage,
    ) -> Result<Option<Candidate>, SyncError> {
        self.patch_with("move_stage", id, move |candidate| {
            (candidate.stage != stage).then(|| CandidatePatch::stage(stage))
        })
        .await
    }

    /// Projection grouped into kanban columns.
    pub fn by_stage(&self) -> BTreeMap<Stage, Vec<Candidate>> {
        group_by_stage(&self.read())
    }
}
