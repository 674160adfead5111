//! In-memory backend - reference implementation of the data source contract.
//!
//! Records live in an `Arc<RwLock<..>>` table kept in insertion order, which
//! is the natural match order for `find`, `skip` and `find_stream`. Queries
//! are evaluated with [`Selector`](crate::Selector) and updates with
//! [`Patch`](crate::Patch).
//!
//! ## Example
//!
//! ```ignore
//! use datasource_rust::{DataSource, FieldQuery, InMemoryDataSource, MergePatch};
//!
//! let users = InMemoryDataSource::<User, u64, FieldQuery, MergePatch>::new();
//! let id = users.insert(user).await?;
//! users
//!     .batch_update(FieldQuery::new().field("team", "core"), json!({ "active": true }).into())
//!     .await?;
//! ```

mod config;
pub mod ids;
mod snapshot;
mod store;

use thiserror::Error;

use crate::error::BoxError;

/// Causes carried by errors from the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("a record with this id already exists")]
    DuplicateId,
    #[error("no record is stored under this id")]
    MissingRecord,
    #[error("capacity of {capacity} records exceeded")]
    CapacityExceeded { capacity: usize },
    #[error("query could not be evaluated: {0}")]
    Query(BoxError),
    #[error("patch rejected: {0}")]
    Patch(BoxError),
    #[error("snapshot codec error: {0}")]
    Snapshot(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub use config::MemoryConfig;
pub use ids::{Embedded, IdAssigner, Sequential};
pub use store::InMemoryDataSource;
