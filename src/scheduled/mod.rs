//! Scheduled - run a data source's operations on an explicit tokio runtime.
//!
//! Futures returned by a plain data source run wherever the caller polls
//! them. The caller names the runtime at the call site instead: [`RunOn::on`]
//! on a shared source (or [`Scheduled::on`] on a scheduled one) spawns that
//! one call on the given [`Handle`]. A [`Scheduled`] built once with
//! [`Scheduled::new`] keeps using its handle for every call.
//!
//! ```ignore
//! let storage_rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
//! let users = Arc::new(InMemoryDataSource::new());
//!
//! let id = users.on(storage_rt.handle()).insert(user).await?;
//! let found = users.on(reports_rt.handle()).get(id).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_stream::wrappers::ReceiverStream;

use crate::datasource::{DataSource, Entry, PageStream, RecordStream};
use crate::error::{DataSourceError, Operation, Result};

/// Causes carried by errors from the scheduled adapter itself.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("scheduled task did not complete: {0}")]
    Join(#[from] JoinError),
    #[error("no tokio runtime to schedule on: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// A data source whose operations run on a specific runtime.
///
/// `find_stream` spawns a producer that runs at most
/// [`page_buffer`](Self::with_page_buffer) pages ahead of the consumer.
/// `batch_insert` forwards the caller's records through a channel of
/// [`record_buffer`](Self::with_record_buffer) slots, so the input stream is
/// still pulled on demand.
pub struct Scheduled<D> {
    inner: Arc<D>,
    handle: Handle,
    page_buffer: usize,
    record_buffer: usize,
}

impl<D> Clone for Scheduled<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: self.handle.clone(),
            page_buffer: self.page_buffer,
            record_buffer: self.record_buffer,
        }
    }
}

impl<D> Scheduled<D> {
    pub fn new(inner: D, handle: Handle) -> Self {
        Self::from_arc(Arc::new(inner), handle)
    }

    /// Schedule a source that is already shared.
    pub fn from_arc(inner: Arc<D>, handle: Handle) -> Self {
        Self {
            inner,
            handle,
            page_buffer: 1,
            record_buffer: 256,
        }
    }

    /// The same source and buffers, running on another runtime.
    pub fn on(&self, handle: &Handle) -> Self {
        Self {
            handle: handle.clone(),
            ..self.clone()
        }
    }

    /// Schedule on the runtime the caller is currently running in.
    pub fn on_current(inner: D) -> std::result::Result<Self, ScheduleError> {
        Ok(Self::new(inner, Handle::try_current()?))
    }

    pub fn with_page_buffer(mut self, pages: usize) -> Self {
        self.page_buffer = pages.max(1);
        self
    }

    pub fn with_record_buffer(mut self, records: usize) -> Self {
        self.record_buffer = records.max(1);
        self
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    async fn run<R, F>(&self, operation: Operation, task: F) -> Result<R>
    where
        F: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
    {
        self.handle
            .spawn(task)
            .await
            .map_err(|e| DataSourceError::new(operation, ScheduleError::Join(e)))?
    }
}

/// Choose the runtime for a single call on a shared data source.
pub trait RunOn<D> {
    fn on(&self, handle: &Handle) -> Scheduled<D>;
}

impl<D> RunOn<D> for Arc<D> {
    fn on(&self, handle: &Handle) -> Scheduled<D> {
        Scheduled::from_arc(Arc::clone(self), handle.clone())
    }
}

#[async_trait]
impl<D, T, Id, Q, U> DataSource<T, Id, Q, U> for Scheduled<D>
where
    D: DataSource<T, Id, Q, U> + 'static,
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    async fn insert(&self, record: T) -> Result<Id> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::Insert, async move { inner.insert(record).await })
            .await
    }

    async fn get(&self, id: Id) -> Result<Option<Entry<T, Id>>> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::Get, async move { inner.get(id).await })
            .await
    }

    async fn delete(&self, id: Id) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::Delete, async move { inner.delete(id).await })
            .await
    }

    async fn update(&self, id: Id, record: T) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::Update, async move { inner.update(id, record).await })
            .await
    }

    async fn update_partial(&self, id: Id, update: U) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::UpdatePartial, async move {
            inner.update_partial(id, update).await
        })
        .await
    }

    async fn find(&self, query: Q, limit: usize, skip: usize) -> Result<Vec<Entry<T, Id>>> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::Find, async move {
            inner.find(query, limit, skip).await
        })
        .await
    }

    fn find_stream<'a>(&'a self, query: Q, skip: usize, page_size: usize) -> PageStream<'a, T, Id> {
        let (tx, rx) = mpsc::channel(self.page_buffer);
        let inner = Arc::clone(&self.inner);

        let producer = self.handle.spawn(async move {
            let mut pages = inner.find_stream(query, skip, page_size);
            while let Some(page) = pages.next().await {
                let failed = page.is_err();
                // a closed channel means the consumer went away
                if tx.send(page).await.is_err() || failed {
                    break;
                }
            }
        });

        // Surface a producer panic instead of ending the stream silently.
        let outcome = stream::once(producer).filter_map(|joined| async move {
            joined
                .err()
                .map(|e| Err(DataSourceError::new(Operation::FindStream, ScheduleError::Join(e))))
        });

        ReceiverStream::new(rx).chain(outcome).boxed()
    }

    async fn batch_insert(&self, mut records: RecordStream<'_, T>) -> Result<u64> {
        let (tx, rx) = mpsc::channel(self.record_buffer);
        let inner = Arc::clone(&self.inner);

        let consumer = self.handle.spawn(async move {
            inner.batch_insert(ReceiverStream::new(rx).boxed()).await
        });

        let feed = async move {
            while let Some(record) = records.next().await {
                if tx.send(record).await.is_err() {
                    break;
                }
            }
        };

        let ((), joined) = futures::join!(feed, consumer);
        joined.map_err(|e| DataSourceError::new(Operation::BatchInsert, ScheduleError::Join(e)))?
    }

    async fn batch_delete(&self, query: Q) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::BatchDelete, async move {
            inner.batch_delete(query).await
        })
        .await
    }

    async fn batch_update(&self, query: Q, update: U) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(Operation::BatchUpdate, async move {
            inner.batch_update(query, update).await
        })
        .await
    }
}
