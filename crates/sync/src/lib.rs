#![forbid(unsafe_code)]

mod bus;
mod cache;
mod candidates;
mod config;
mod error;
mod filter;
mod jobs;
mod reconciler;
mod remote;
mod sim;
mod timeline;

pub use bus::{Subscription, SubscriptionBus};
pub use cache::OptimisticCache;
pub use candidates::CandidatesCache;
pub use config::{SimConfig, SyncConfig};
pub use error::SyncError;
pub use filter::{Filter, project};
pub use jobs::{JobsCache, JobsReconciler};
pub use reconciler::{MoveOutcome, MovePlan, Reconciler, is_dense, plan_move, restamp};
pub use remote::{
    ListQuery, Page, RemoteCollection, RemoteError, RemoteReorder, RemoteTimeline,
};
pub use sim::SimulatedBackend;
pub use timeline::TimelineCache;
