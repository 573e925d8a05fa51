#![forbid(unsafe_code)]

use crate::{DurableStore, Query, StoreError, WriteOp};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tf_core::Document;

/// Typed view of one collection of a `DurableStore`.
pub struct Collection<D> {
    store: Arc<dyn DurableStore>,
    _doc: PhantomData<fn() -> D>,
}

impl<D> Clone for Collection<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _doc: PhantomData,
        }
    }
}

impl<D: Document> Collection<D> {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    pub async fn get(&self, id: &str) -> Result<Option<D>, StoreError> {
        match self.store.get(D::COLLECTION, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    pub async fn add(&self, doc: &D) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        self.store.add(D::COLLECTION, doc.doc_id(), body).await
    }

    pub async fn put(&self, doc: &D) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        self.store.put(D::COLLECTION, doc.doc_id(), body).await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: &str,
        partial: &P,
    ) -> Result<bool, StoreError> {
        let partial = serde_json::to_value(partial)?;
        self.store.update(D::COLLECTION, id, partial).await
    }

    pub async fn bulk_add(&self, docs: &[D]) -> Result<(), StoreError> {
        let docs = docs
            .iter()
            .map(|doc| Ok((doc.doc_id().to_string(), serde_json::to_value(doc)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.store.bulk_add(D::COLLECTION, docs).await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.store.count(D::COLLECTION).await
    }

    pub async fn query(&self, query: &Query) -> Result<Vec<D>, StoreError> {
        decode_all(self.store.query(D::COLLECTION, query).await?)
    }

    pub async fn all(&self) -> Result<Vec<D>, StoreError> {
        decode_all(self.store.all(D::COLLECTION).await?)
    }

    pub fn put_op(doc: &D) -> Result<WriteOp, StoreError> {
        Ok(WriteOp::Put {
            collection: D::COLLECTION.to_string(),
            id: doc.doc_id().to_string(),
            body: serde_json::to_value(doc)?,
        })
    }

    pub fn add_op(doc: &D) -> Result<WriteOp, StoreError> {
        Ok(WriteOp::Add {
            collection: D::COLLECTION.to_string(),
            id: doc.doc_id().to_string(),
            body: serde_json::to_value(doc)?,
        })
    }

    pub fn update_op<P: Serialize + ?Sized>(id: &str, partial: &P) -> Result<WriteOp, StoreError> {
        Ok(WriteOp::Update {
            collection: D::COLLECTION.to_string(),
            id: id.to_string(),
            partial: serde_json::to_value(partial)?,
        })
    }
}

fn decode_all<D: Document>(bodies: Vec<Value>) -> Result<Vec<D>, StoreError> {
    bodies
        .into_iter()
        .map(|body| serde_json::from_value(body).map_err(StoreError::from))
        .collect()
}
