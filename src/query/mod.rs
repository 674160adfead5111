//! Selectors and patches - how backends interpret `Q` and `U`.
//!
//! The contract treats queries and updates as opaque. Backends that evaluate
//! them in process (such as [`InMemoryDataSource`](crate::InMemoryDataSource))
//! require the query type to implement [`Selector`] and the update type to
//! implement [`Patch`].
//!
//! Two vocabularies are provided:
//!
//! - closures: [`Filter`] and [`Modify`], for typed records
//! - documents: [`FieldQuery`] and [`MergePatch`], for any serde record,
//!   evaluated against its JSON form

mod filter;
mod json;

use crate::error::BoxError;

/// Decides whether a record belongs to a query's result set.
///
/// An error means the record could not be evaluated. Backends fail the
/// whole operation rather than treat it as a non-match.
pub trait Selector<T>: Send + Sync {
    fn matches(&self, record: &T) -> Result<bool, BoxError>;
}

/// Applies a partial mutation to a record in place.
///
/// A failed patch must leave the record in a state the caller will discard;
/// backends apply patches to a copy and only write it back on success.
pub trait Patch<T>: Send + Sync {
    fn apply(&self, record: &mut T) -> Result<(), BoxError>;
}

pub use filter::{Filter, Modify};
pub use json::{FieldQuery, MergePatch, QueryError};
