use std::fmt;
use std::sync::Arc;

use super::{Patch, Selector};
use crate::error::BoxError;

type Predicate<T> = dyn Fn(&T) -> bool + Send + Sync;
type Mutation<T> = dyn Fn(&mut T) -> Result<(), BoxError> + Send + Sync;

/// A cloneable predicate over records.
pub struct Filter<T> {
    predicate: Arc<Predicate<T>>,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}

impl<T: 'static> Filter<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Matches every record.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Matches nothing.
    pub fn none() -> Self {
        Self::new(|_| false)
    }

    pub fn and(self, other: Filter<T>) -> Self {
        Self::new(move |record| (self.predicate)(record) && (other.predicate)(record))
    }

    pub fn or(self, other: Filter<T>) -> Self {
        Self::new(move |record| (self.predicate)(record) || (other.predicate)(record))
    }

    pub fn not(self) -> Self {
        Self::new(move |record| !(self.predicate)(record))
    }
}

impl<T> Selector<T> for Filter<T> {
    fn matches(&self, record: &T) -> Result<bool, BoxError> {
        Ok((self.predicate)(record))
    }
}

/// A cloneable in-place mutation of a record.
pub struct Modify<T> {
    mutation: Arc<Mutation<T>>,
}

impl<T> Clone for Modify<T> {
    fn clone(&self) -> Self {
        Self {
            mutation: Arc::clone(&self.mutation),
        }
    }
}

impl<T> fmt::Debug for Modify<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modify").finish_non_exhaustive()
    }
}

impl<T: 'static> Modify<T> {
    /// An infallible mutation.
    pub fn new<F>(mutation: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::try_new(move |record| {
            mutation(record);
            Ok(())
        })
    }

    /// A mutation that may reject the record.
    pub fn try_new<F>(mutation: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            mutation: Arc::new(mutation),
        }
    }
}

impl<T> Patch<T> for Modify<T> {
    fn apply(&self, record: &mut T) -> Result<(), BoxError> {
        (self.mutation)(record)
    }
}
