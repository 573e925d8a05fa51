#![forbid(unsafe_code)]

mod collection;
mod error;
mod memory;
mod query;
pub mod seed;
mod sqlite;
mod store;

pub use collection::Collection;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{Condition, Query};
pub use sqlite::SqliteStore;
pub use store::{DurableStore, WriteOp};

#[cfg(test)]
mod tests;
