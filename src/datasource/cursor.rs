//! Cursor-based paging on top of `find`.

use futures::stream::{self, StreamExt};

use super::{DataSource, PageStream};
use crate::error::Operation;

struct Cursor<Q> {
    query: Q,
    offset: usize,
}

/// Build a lazy page stream that issues one `find` per page.
///
/// The stream ends after the first short page (fewer than `page_size`
/// entries) or the first empty one. Errors end the stream after being
/// yielded.
pub fn paged<'a, D, T, Id, Q, U>(
    source: &'a D,
    query: Q,
    skip: usize,
    page_size: usize,
) -> PageStream<'a, T, Id>
where
    D: DataSource<T, Id, Q, U> + ?Sized,
    T: Send + 'static,
    Id: Send + 'static,
    Q: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    let start = Some(Cursor {
        query,
        offset: skip,
    });

    stream::try_unfold(start, move |state| async move {
        let cursor = match state {
            Some(cursor) => cursor,
            None => return Ok(None),
        };

        let page = source
            .find(cursor.query.clone(), page_size, cursor.offset)
            .await
            .map_err(|err| err.with_operation(Operation::FindStream))?;

        if page.is_empty() {
            return Ok(None);
        }

        let next = if page_size == 0 || page.len() < page_size {
            None
        } else {
            Some(Cursor {
                offset: cursor.offset + page.len(),
                query: cursor.query,
            })
        };

        Ok(Some((page, next)))
    })
    .boxed()
}
