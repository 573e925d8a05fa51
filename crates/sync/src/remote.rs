#![forbid(unsafe_code)]

use async_trait::async_trait;
use tf_core::{CandidateId, Entity, NoteId, Ranked, TimelineNote};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("rejected by server (status={status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("not found")]
    NotFound,
    #[error("transport: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery<C> {
    pub search: String,
    pub category: Option<C>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl<C> ListQuery<C> {
    pub fn first_page(page_size: usize) -> Self {
        Self {
            search: String::new(),
            category: None,
            page: 1,
            page_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub total: usize,
}

/// Authoritative backend for one entity collection.
#[async_trait]
pub trait RemoteCollection<E: Entity>: Send + Sync {
    async fn list(&self, query: ListQuery<E::Category>) -> Result<Page<E>, RemoteError>;

    /// Returns the server entity with id (and rank, where the entity has one) assigned.
    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError>;

    async fn patch(&self, id: &E::Id, patch: &E::Patch) -> Result<E, RemoteError>;
}

#[async_trait]
pub trait RemoteReorder<E: Ranked>: Send + Sync {
    async fn reorder(&self, id: &E::Id, to_index: usize) -> Result<(), RemoteError>;
}

/// Candidate timeline sub-resource. Mutations answer with the full, updated event list.
#[async_trait]
pub trait RemoteTimeline: Send + Sync {
    async fn timeline(&self, candidate: &CandidateId) -> Result<Vec<TimelineNote>, RemoteError>;

    async fn append_note(
        &self,
        candidate: &CandidateId,
        note: &TimelineNote,
    ) -> Result<Vec<TimelineNote>, RemoteError>;

    async fn delete_note(
        &self,
        candidate: &CandidateId,
        note: &NoteId,
    ) -> Result<Vec<TimelineNote>, RemoteError>;
}
