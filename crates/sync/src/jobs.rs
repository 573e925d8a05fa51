#![forbid(unsafe_code)]

use crate::{OptimisticCache, Reconciler, SyncError};
use tf_core::{Job, JobId, JobPatch};

pub type JobsCache = OptimisticCache<Job>;
pub type JobsReconciler = Reconciler<Job>;

impl OptimisticCache<Job> {
    /// Archived jobs reopen, anything else gets archived. The new status is computed
    /// from the job's value when this mutation takes its turn.
    pub async fn toggle_archive(&self, id: &JobId) -> Result<Option<Job>, SyncError> {
        self.patch_with("toggle_archive", id, |job| {
            Some(JobPatch::status(job.status.toggled_archive()))
        })
        .await
    }
}
