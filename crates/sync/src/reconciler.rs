#![forbid(unsafe_code)]

use crate::SyncError;
use crate::cache::{OptimisticCache, rank_of};
use crate::remote::RemoteReorder;
use std::sync::Arc;
use tf_core::Ranked;
use tf_storage::Collection;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: usize, to: usize },
    /// Already at the (clamped) target; nothing was sent or published.
    Unchanged { index: usize },
    NotFound,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MovePlan<E> {
    Moved { from: usize, to: usize, items: Vec<E> },
    Unchanged { index: usize },
    NotFound,
}

/// Removes `id` from the rank-sorted sequence, reinserts it at `target` (clamped to the
/// last index) and re-stamps every `order` to its position.
pub fn plan_move<E: Ranked>(items: &[E], id: &E::Id, target: usize) -> MovePlan<E> {
    let mut ranked = items.to_vec();
    ranked.sort_by_key(|item| item.order());
    let Some(from) = ranked.iter().position(|item| item.id() == id) else {
        return MovePlan::NotFound;
    };
    let to = target.min(ranked.len() - 1);
    if from == to {
        return MovePlan::Unchanged { index: from };
    }
    let moved = ranked.remove(from);
    ranked.insert(to, moved);
    MovePlan::Moved {
        from,
        to,
        items: restamp(ranked),
    }
}

pub fn restamp<E: Ranked>(items: Vec<E>) -> Vec<E> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.with_order(rank_of(index)))
        .collect()
}

/// `true` when the orders are exactly `0..len`, each once.
pub fn is_dense<E: Ranked>(items: &[E]) -> bool {
    let mut orders = items.iter().map(|item| item.order()).collect::<Vec<_>>();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| usize::try_from(*order).is_ok_and(|order| order == index))
}

/// Drag-and-drop rank reassignment for a ranked collection.
pub struct Reconciler<E: Ranked> {
    cache: OptimisticCache<E>,
    remote: Arc<dyn RemoteReorder<E>>,
}

impl<E: Ranked> Clone for Reconciler<E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<E: Ranked> Reconciler<E> {
    pub fn new(cache: OptimisticCache<E>, remote: Arc<dyn RemoteReorder<E>>) -> Self {
        Self { cache, remote }
    }

    pub fn cache(&self) -> &OptimisticCache<E> {
        &self.cache
    }

    /// `target` indexes the whole rank-sorted collection, not the filtered view.
    pub async fn move_to(&self, id: &E::Id, target: usize) -> Result<MoveOutcome, SyncError> {
        let inner = self.cache.inner();
        let _turn = inner.gate.lock().await;
        let (snapshot, from, to) = {
            let mut state = inner.state.lock();
            match plan_move(&state.items, id, target) {
                MovePlan::NotFound => return Ok(MoveOutcome::NotFound),
                MovePlan::Unchanged { index } => return Ok(MoveOutcome::Unchanged { index }),
                MovePlan::Moved { from, to, items } => {
                    (std::mem::replace(&mut state.items, items), from, to)
                }
            }
        };
        debug!(collection = E::COLLECTION, %id, from, to, "speculative move");
        self.cache.publish();

        if let Err(err) = self.remote.reorder(id, to).await {
            self.cache.restore(snapshot, "reorder", &err);
            return Err(err.into());
        }

        let (ops, ids) = {
            let state = inner.state.lock();
            let ops = state
                .items
                .iter()
                .map(Collection::<E>::put_op)
                .collect::<Result<Vec<_>, _>>();
            let ids = state
                .items
                .iter()
                .map(|item| item.id().clone())
                .collect::<Vec<_>>();
            (ops, ids)
        };
        self.cache.persist("reorder", ops, ids).await;
        Ok(MoveOutcome::Moved { from, to })
    }
}
