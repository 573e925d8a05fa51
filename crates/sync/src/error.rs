#![forbid(unsafe_code)]

use crate::RemoteError;
use tf_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl SyncError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Remote(RemoteError::Rejected { .. }))
    }
}
