//! DataSource - the generic async data-access contract.
//!
//! A data source stores records of type `T` under identifiers of type `Id`,
//! selects groups of records with a query value `Q` and mutates parts of
//! records with an update descriptor `U`. The contract says nothing about how
//! any of these are interpreted; that is up to the backend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                DataSource<T, Id, Q, U>                    │
//! │  insert / get / delete / update / update_partial          │
//! │  find / find_stream                                       │
//! │  batch_insert / batch_delete / batch_update               │
//! └──────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//! ┌──────────────────┐ ┌───────────────┐ ┌──────────────────┐
//! │InMemoryDataSource│ │ Scheduled<D>  │ │    Traced<D>     │
//! │   (reference)    │ │ (runs on a    │ │ (spans + logs)   │
//! │                  │ │  tokio handle)│ │                  │
//! └──────────────────┘ └───────────────┘ └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use datasource_rust::{DataSource, Filter, InMemoryDataSource, Modify};
//!
//! let users = InMemoryDataSource::<User, u64, Filter<User>, Modify<User>>::new();
//! let id = users.insert(User::new("a")).await?;
//! let found = users.get(id).await?;
//! users.delete(id).await?;
//! ```

mod cursor;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

pub use cursor::paged;

/// A stored record together with its identifier.
pub type Entry<T, Id> = (T, Id);

/// A bounded batch of entries produced while streaming.
pub type Page<T, Id> = Vec<Entry<T, Id>>;

/// Lazily fetched pages of a `find_stream` call.
pub type PageStream<'a, T, Id> = BoxStream<'a, Result<Page<T, Id>>>;

/// Records fed to `batch_insert`; pulled on demand.
pub type RecordStream<'a, T> = BoxStream<'a, T>;

/// Uniform asynchronous operation set every storage backend implements.
///
/// Pagination arguments use `0` as "no bound": a `limit` of zero returns every
/// match and a `skip` of zero starts at the first match. Matches are returned
/// in the backend's natural match order, which must be stable between calls
/// that see the same data so that `skip` is meaningful.
#[async_trait]
pub trait DataSource<T, Id, Q, U>: Send + Sync
where
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    /// Store a record, returning the identifier assigned to it (or already
    /// present in it).
    async fn insert(&self, record: T) -> Result<Id>;

    /// Look up a record. Absent records are `Ok(None)`.
    async fn get(&self, id: Id) -> Result<Option<Entry<T, Id>>>;

    /// Remove a record. Removing an absent record is not an error.
    async fn delete(&self, id: Id) -> Result<()>;

    /// Replace the whole content of a record.
    async fn update(&self, id: Id, record: T) -> Result<()>;

    /// Apply a partial mutation to a record.
    async fn update_partial(&self, id: Id, update: U) -> Result<()>;

    /// Return matching records, skipping the first `skip` and returning at most
    /// `limit` (zero meaning unbounded).
    async fn find(&self, query: Q, limit: usize, skip: usize) -> Result<Vec<Entry<T, Id>>>;

    /// Stream matching records in pages of at most `page_size` entries.
    ///
    /// Pages are fetched only when the stream is polled, so memory use is
    /// bounded by the page size rather than the result size. Each call starts
    /// a fresh cursor at `skip`. A `page_size` of zero yields every match in a
    /// single page. The stream never yields an empty page.
    ///
    /// The default implementation pages through [`find`](DataSource::find).
    fn find_stream<'a>(&'a self, query: Q, skip: usize, page_size: usize) -> PageStream<'a, T, Id> {
        paged::<Self, T, Id, Q, U>(self, query, skip, page_size)
    }

    /// Persist every record pulled from `records`, returning how many were
    /// inserted.
    async fn batch_insert(&self, records: RecordStream<'_, T>) -> Result<u64>;

    /// Delete every record matching `query`.
    async fn batch_delete(&self, query: Q) -> Result<()>;

    /// Apply `update` to every record matching `query`.
    async fn batch_update(&self, query: Q, update: U) -> Result<()>;
}
