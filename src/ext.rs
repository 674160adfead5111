//! DataSourceExt - convenience reads and writes built from the core operations.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};

use crate::datasource::{DataSource, Entry};
use crate::error::Result;

/// Page size used when counting through a stream.
const COUNT_PAGE_SIZE: usize = 512;

/// Extension methods available on every data source.
#[async_trait]
pub trait DataSourceExt<T, Id, Q, U>: DataSource<T, Id, Q, U>
where
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    /// Get just the record, without its id.
    async fn get_record(&self, id: Id) -> Result<Option<T>> {
        Ok(self.get(id).await?.map(|(record, _)| record))
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Every match, unpaginated.
    async fn find_all(&self, query: Q) -> Result<Vec<Entry<T, Id>>> {
        self.find(query, 0, 0).await
    }

    /// The first match in natural order.
    async fn find_one(&self, query: Q) -> Result<Option<Entry<T, Id>>> {
        Ok(self.find(query, 1, 0).await?.into_iter().next())
    }

    /// Count matches page by page, without holding them all.
    async fn count(&self, query: Q) -> Result<usize> {
        let mut pages = self.find_stream(query, 0, COUNT_PAGE_SIZE);
        let mut total = 0;
        while let Some(page) = pages.next().await {
            total += page?.len();
        }
        Ok(total)
    }

    /// `batch_insert` from anything iterable.
    async fn insert_all<I>(&self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = T> + Send,
        I::IntoIter: Send + 'static,
    {
        self.batch_insert(stream::iter(records).boxed()).await
    }

    /// Drain a `find_stream` into one vector.
    async fn collect_stream(&self, query: Q, skip: usize, page_size: usize) -> Result<Vec<Entry<T, Id>>> {
        self.find_stream(query, skip, page_size).try_concat().await
    }
}

impl<D, T, Id, Q, U> DataSourceExt<T, Id, Q, U> for D
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
}
