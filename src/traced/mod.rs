//! Traced - structured logging around any data source.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, debug_span, trace, warn, Instrument, Span};

use crate::datasource::{DataSource, Entry, PageStream, RecordStream};
use crate::error::{Operation, Result};

/// Wraps a data source and records a `datasource` span per operation.
///
/// Successful calls log at `debug` with their elapsed time; failures log at
/// `warn` with the error. Streamed pages log at `trace`.
pub struct Traced<D> {
    inner: D,
    name: Arc<str>,
}

impl<D> Traced<D> {
    pub fn new(inner: D, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: Arc::from(name.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    fn span(&self, operation: Operation) -> Span {
        debug_span!(target: "datasource", "datasource", source = %self.name, operation = %operation)
    }

    async fn observe<R, F>(&self, operation: Operation, call: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let span = self.span(operation);
        let started = Instant::now();
        let result = call.instrument(span.clone()).await;
        let elapsed_us = started.elapsed().as_micros() as u64;

        match &result {
            Ok(_) => debug!(target: "datasource", parent: &span, elapsed_us, "completed"),
            Err(err) => warn!(target: "datasource", parent: &span, elapsed_us, error = %err, "failed"),
        }
        result
    }
}

#[async_trait]
impl<D, T, Id, Q, U> DataSource<T, Id, Q, U> for Traced<D>
where
    D: DataSource<T, Id, Q, U>,
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    async fn insert(&self, record: T) -> Result<Id> {
        self.observe(Operation::Insert, self.inner.insert(record))
            .await
    }

    async fn get(&self, id: Id) -> Result<Option<Entry<T, Id>>> {
        let found = self.observe(Operation::Get, self.inner.get(id)).await?;
        trace!(target: "datasource", source = %self.name, found = found.is_some(), "lookup");
        Ok(found)
    }

    async fn delete(&self, id: Id) -> Result<()> {
        self.observe(Operation::Delete, self.inner.delete(id)).await
    }

    async fn update(&self, id: Id, record: T) -> Result<()> {
        self.observe(Operation::Update, self.inner.update(id, record))
            .await
    }

    async fn update_partial(&self, id: Id, update: U) -> Result<()> {
        self.observe(
            Operation::UpdatePartial,
            self.inner.update_partial(id, update),
        )
        .await
    }

    async fn find(&self, query: Q, limit: usize, skip: usize) -> Result<Vec<Entry<T, Id>>> {
        let found = self
            .observe(Operation::Find, self.inner.find(query, limit, skip))
            .await?;
        trace!(target: "datasource", source = %self.name, limit, skip, rows = found.len(), "find");
        Ok(found)
    }

    fn find_stream<'a>(&'a self, query: Q, skip: usize, page_size: usize) -> PageStream<'a, T, Id> {
        let span = self.span(Operation::FindStream);
        debug!(target: "datasource", parent: &span, skip, page_size, "stream opened");

        let mut pages = 0usize;
        self.inner
            .find_stream(query, skip, page_size)
            .inspect(move |page| match page {
                Ok(page) => {
                    pages += 1;
                    trace!(target: "datasource", parent: &span, page = pages, rows = page.len(), "page");
                }
                Err(err) => {
                    warn!(target: "datasource", parent: &span, page = pages + 1, error = %err, "page failed");
                }
            })
            .boxed()
    }

    async fn batch_insert(&self, records: RecordStream<'_, T>) -> Result<u64> {
        let inserted = self
            .observe(Operation::BatchInsert, self.inner.batch_insert(records))
            .await?;
        debug!(target: "datasource", source = %self.name, inserted, "batch insert");
        Ok(inserted)
    }

    async fn batch_delete(&self, query: Q) -> Result<()> {
        self.observe(Operation::BatchDelete, self.inner.batch_delete(query))
            .await
    }

    async fn batch_update(&self, query: Q, update: U) -> Result<()> {
        self.observe(
            Operation::BatchUpdate,
            self.inner.batch_update(query, update),
        )
        .await
    }
}
