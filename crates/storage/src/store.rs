#![forbid(unsafe_code)]

use crate::{Query, StoreError};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Fails the whole batch if the id already exists.
    Add {
        collection: String,
        id: String,
        body: Value,
    },
    Put {
        collection: String,
        id: String,
        body: Value,
    },
    /// Shallow merge into an existing document; skipped when the id is missing.
    Update {
        collection: String,
        id: String,
        partial: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Local, transactional, indexed document store keyed by `(collection, id)`.
///
/// Every call is its own unit of work. `transaction` applies all of its writes or none of
/// them; there is no atomicity across separate calls, and the last write for an id wins.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Returns `false` without writing when the id is missing.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError>;

    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Every document of the collection, by id.
    async fn all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    async fn clear(&self, collection: &str) -> Result<(), StoreError>;

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    async fn add(&self, collection: &str, id: &str, body: Value) -> Result<(), StoreError> {
        self.transaction(vec![WriteOp::Add {
            collection: collection.to_string(),
            id: id.to_string(),
            body,
        }])
        .await
    }

    async fn put(&self, collection: &str, id: &str, body: Value) -> Result<(), StoreError> {
        self.transaction(vec![WriteOp::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            body,
        }])
        .await
    }

    async fn bulk_add(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        let ops = docs
            .into_iter()
            .map(|(id, body)| WriteOp::Add {
                collection: collection.to_string(),
                id,
                body,
            })
            .collect();
        self.transaction(ops).await
    }
}

pub(crate) fn merge_shallow(target: &mut Value, partial: &Value) -> Result<(), StoreError> {
    let Value::Object(fields) = partial else {
        return Err(StoreError::InvalidInput("update payload must be a json object"));
    };
    let Value::Object(existing) = target else {
        return Err(StoreError::InvalidInput("stored document is not a json object"));
    };
    for (key, value) in fields {
        existing.insert(key.clone(), value.clone());
    }
    Ok(())
}
