#![forbid(unsafe_code)]

use crate::ids::IdError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A JSON document addressable by `(COLLECTION, doc_id)` in a durable store.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    /// Top-level json fields the store keeps an index for.
    const INDEXES: &'static [&'static str];

    fn doc_id(&self) -> &str;
}

/// Best-guess fields for an entity that exists only locally until the backend confirms it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provisional {
    pub next_rank: u32,
    pub now_ms: i64,
}

/// A value record held by an optimistic cache. Entities are immutable; every change
/// produces a new value that replaces the old one wholesale.
pub trait Entity: Document + Clone + Debug + PartialEq + 'static {
    type Id: Clone
        + Debug
        + Display
        + Eq
        + Ord
        + Hash
        + AsRef<str>
        + TryFrom<String, Error = IdError>
        + Send
        + Sync
        + 'static;
    type Draft: Clone + Debug + Serialize + Send + Sync + 'static;
    type Patch: Clone + Debug + Serialize + Send + Sync + 'static;
    type Category: Copy + Debug + Eq + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;

    /// `needle_lower` is already lowercased and non-empty.
    fn matches_text(&self, needle_lower: &str) -> bool;

    fn category(&self) -> Self::Category;

    /// Sort key of the projection. Entities without a rank keep collection order.
    fn rank(&self) -> Option<u32> {
        None
    }

    fn apply_patch(&self, patch: &Self::Patch) -> Self;

    fn provisional(id: Self::Id, draft: &Self::Draft, hint: Provisional) -> Self;
}

/// Entity carrying a dense zero-based `order` within its collection.
pub trait Ranked: Entity {
    fn order(&self) -> u32;

    fn with_order(&self, order: u32) -> Self;
}

pub(crate) fn contains_lower(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}
