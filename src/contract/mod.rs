//! Conformance checks any backend can run against itself.
//!
//! Each check exercises one guarantee of [`DataSource`] using records the
//! caller supplies, and reports a [`ContractViolation`] naming the broken
//! property. Checks mutate the source, so run them against a dedicated
//! instance.
//!
//! ```ignore
//! let fixture = ContractFixture {
//!     records: vec![user("a"), user("b"), user("c")],
//!     replacement: user("z"),
//!     missing_id: 9_999,
//!     everything: Filter::all(),
//! };
//! contract::run_all(&InMemoryDataSource::new(), fixture).await?;
//! ```

use std::fmt::Debug;

use futures::{stream, StreamExt, TryStreamExt};
use thiserror::Error;

use crate::datasource::DataSource;
use crate::error::DataSourceError;

#[derive(Debug, Error)]
pub enum ContractViolation {
    #[error("{property}: {detail}")]
    Property {
        property: &'static str,
        detail: String,
    },
    #[error("backend failed during a conformance check: {0}")]
    Backend(#[from] DataSourceError),
}

pub type ContractResult = Result<(), ContractViolation>;

fn violated(property: &'static str, detail: impl Into<String>) -> ContractViolation {
    ContractViolation::Property {
        property,
        detail: detail.into(),
    }
}

/// Inputs for [`run_all`].
pub struct ContractFixture<T, Id, Q> {
    /// At least three distinct records.
    pub records: Vec<T>,
    /// A record that differs from every entry in `records`.
    pub replacement: T,
    /// An id the source will never assign during the run.
    pub missing_id: Id,
    /// A query matching every record.
    pub everything: Q,
}

/// Inserting a record makes it readable under the returned id.
pub async fn insert_then_get<D, T, Id, Q, U>(source: &D, record: T) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Clone + PartialEq + Debug + Send + 'static,
    Id: Clone + PartialEq + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let id = source.insert(record.clone()).await?;
    match source.get(id.clone()).await? {
        Some((found, found_id)) if found == record && found_id == id => Ok(()),
        other => Err(violated(
            "insert_then_get",
            format!("expected Some(({:?}, {:?})), got {:?}", record, id, other),
        )),
    }
}

/// Reading an absent id is `Ok(None)`, never an error.
pub async fn missing_get_is_none<D, T, Id, Q, U>(source: &D, missing_id: Id) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Debug + Send + 'static,
    Id: Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    match source.get(missing_id).await {
        Ok(None) => Ok(()),
        Ok(Some(found)) => Err(violated(
            "missing_get_is_none",
            format!("absent id returned {:?}", found),
        )),
        Err(err) => Err(violated(
            "missing_get_is_none",
            format!("absent id produced an error: {}", err),
        )),
    }
}

/// A deleted record is no longer readable.
pub async fn delete_removes<D, T, Id, Q, U>(source: &D, record: T) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Debug + Send + 'static,
    Id: Clone + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let id = source.insert(record).await?;
    source.delete(id.clone()).await?;
    match source.get(id.clone()).await? {
        None => Ok(()),
        Some(found) => Err(violated(
            "delete_removes",
            format!("{:?} still readable after delete: {:?}", id, found),
        )),
    }
}

/// A full update replaces the stored record.
pub async fn update_replaces<D, T, Id, Q, U>(source: &D, original: T, replacement: T) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Clone + PartialEq + Debug + Send + 'static,
    Id: Clone + PartialEq + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let id = source.insert(original).await?;
    source.update(id.clone(), replacement.clone()).await?;
    match source.get(id.clone()).await? {
        Some((found, found_id)) if found == replacement && found_id == id => Ok(()),
        other => Err(violated(
            "update_replaces",
            format!("expected Some(({:?}, {:?})), got {:?}", replacement, id, other),
        )),
    }
}

/// `find(q, limit, skip)` is the unpaginated result with `skip` and `limit`
/// applied.
pub async fn find_paginates<D, T, Id, Q, U>(
    source: &D,
    query: Q,
    limit: usize,
    skip: usize,
) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: PartialEq + Debug + Send + 'static,
    Id: PartialEq + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let all = source.find(query.clone(), 0, 0).await?;
    let page = source.find(query, limit, skip).await?;

    let bound = if limit == 0 { usize::MAX } else { limit };
    let expected: Vec<_> = all.iter().skip(skip).take(bound).collect();
    let actual: Vec<_> = page.iter().collect();

    if actual == expected {
        Ok(())
    } else {
        Err(violated(
            "find_paginates",
            format!(
                "limit {} skip {}: expected {} entries {:?}, got {} entries {:?}",
                limit,
                skip,
                expected.len(),
                expected,
                actual.len(),
                actual
            ),
        ))
    }
}

/// Concatenated `find_stream` pages equal `find` without a limit, and no page
/// exceeds `page_size`.
pub async fn stream_matches_find<D, T, Id, Q, U>(
    source: &D,
    query: Q,
    skip: usize,
    page_size: usize,
) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: PartialEq + Debug + Send + 'static,
    Id: PartialEq + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let expected = source.find(query.clone(), 0, skip).await?;
    let pages: Vec<_> = source.find_stream(query, skip, page_size).try_collect().await?;

    if let Some(page) = pages
        .iter()
        .find(|page| page.is_empty() || (page_size > 0 && page.len() > page_size))
    {
        return Err(violated(
            "stream_matches_find",
            format!("page of {} entries with page_size {}", page.len(), page_size),
        ));
    }

    let streamed: Vec<_> = pages.into_iter().flatten().collect();
    if streamed == expected {
        Ok(())
    } else {
        Err(violated(
            "stream_matches_find",
            format!(
                "streamed {} entries, find returned {}",
                streamed.len(),
                expected.len()
            ),
        ))
    }
}

/// `batch_insert` of N records reports N and grows the match count by N.
pub async fn batch_insert_counts<D, T, Id, Q, U>(source: &D, everything: Q, records: Vec<T>) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let before = source.find(everything.clone(), 0, 0).await?.len();
    let expected = records.len() as u64;

    let inserted = source.batch_insert(stream::iter(records).boxed()).await?;
    if inserted != expected {
        return Err(violated(
            "batch_insert_counts",
            format!("inserted {} records, reported {}", expected, inserted),
        ));
    }

    let after = source.find(everything, 0, 0).await?.len();
    if after as u64 != before as u64 + expected {
        return Err(violated(
            "batch_insert_counts",
            format!("match count went from {} to {} after inserting {}", before, after, expected),
        ));
    }
    Ok(())
}

/// Run every check in sequence against one source.
///
/// Records are inserted more than once, so the source must assign fresh ids
/// rather than derive them from record content.
pub async fn run_all<D, T, Id, Q, U>(source: &D, fixture: ContractFixture<T, Id, Q>) -> ContractResult
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Clone + PartialEq + Debug + Send + 'static,
    Id: Clone + PartialEq + Debug + Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let ContractFixture {
        records,
        replacement,
        missing_id,
        everything,
    } = fixture;

    if records.len() < 3 {
        return Err(violated(
            "fixture",
            format!("need at least 3 records, got {}", records.len()),
        ));
    }

    missing_get_is_none::<D, T, Id, Q, U>(source, missing_id).await?;
    insert_then_get::<D, T, Id, Q, U>(source, records[0].clone()).await?;
    delete_removes::<D, T, Id, Q, U>(source, records[1].clone()).await?;
    update_replaces::<D, T, Id, Q, U>(source, records[2].clone(), replacement).await?;
    batch_insert_counts::<D, T, Id, Q, U>(source, everything.clone(), records.clone()).await?;

    let total = source.find(everything.clone(), 0, 0).await?.len();
    find_paginates::<D, T, Id, Q, U>(source, everything.clone(), 2, 1).await?;
    find_paginates::<D, T, Id, Q, U>(source, everything.clone(), 0, total / 2).await?;
    find_paginates::<D, T, Id, Q, U>(source, everything.clone(), 3, total + 1).await?;
    stream_matches_find::<D, T, Id, Q, U>(source, everything.clone(), 0, 2).await?;
    stream_matches_find::<D, T, Id, Q, U>(source, everything.clone(), 1, total.max(1)).await?;
    stream_matches_find::<D, T, Id, Q, U>(source, everything, 0, 0).await?;
    Ok(())
}
