#![forbid(unsafe_code)]

use crate::query::compare_scalars;
use crate::store::merge_shallow;
use crate::{DurableStore, Query, StoreError, WriteOp};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-process store with the same semantics as `SqliteStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_op(state: &mut Collections, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Add {
            collection,
            id,
            body,
        } => {
            let docs = state.entry(collection.clone()).or_default();
            if docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists { collection, id });
            }
            docs.insert(id, body);
        }
        WriteOp::Put {
            collection,
            id,
            body,
        } => {
            state.entry(collection).or_default().insert(id, body);
        }
        WriteOp::Update {
            collection,
            id,
            partial,
        } => {
            if let Some(existing) = state.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) {
                merge_shallow(existing, &partial)?;
            }
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = state.get_mut(&collection) {
                docs.remove(&id);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let state = self.collections.lock();
        Ok(state.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        let mut state = self.collections.lock();
        let Some(existing) = state.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(false);
        };
        let mut next = existing.clone();
        merge_shallow(&mut next, &partial)?;
        *existing = next;
        Ok(true)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let state = self.collections.lock();
        Ok(state.get(collection).map_or(0, BTreeMap::len))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let state = self.collections.lock();
        let Some(docs) = state.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits = docs
            .iter()
            .filter_map(|(id, body)| {
                let field = body.get(&query.field).cloned().unwrap_or(Value::Null);
                query.matches(&field).then(|| (field, id, body))
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| compare_scalars(&a.0, &b.0).then_with(|| a.1.cmp(b.1)));
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(_, _, body)| body.clone())
            .collect())
    }

    async fn all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let state = self.collections.lock();
        Ok(state
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, collection: &str) -> Result<(), StoreError> {
        self.collections.lock().remove(collection);
        Ok(())
    }

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut state = self.collections.lock();
        let mut staged = state.clone();
        for op in ops {
            apply_op(&mut staged, op)?;
        }
        *state = staged;
        Ok(())
    }
}
