//! Identifier assignment for the in-memory backend.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::keyed::Keyed;

/// Chooses the identifier a newly inserted record is stored under.
pub trait IdAssigner<T, Id>: Send + Sync {
    fn assign(&self, record: &T) -> Id;

    /// Called for every id loaded by a restore, so that later assignments do
    /// not collide with it.
    fn observe(&self, _id: &Id) {}

    /// Position to carry across a snapshot, for assigners that keep one.
    fn checkpoint(&self) -> Option<u64> {
        None
    }

    /// Continue from a [`checkpoint`](Self::checkpoint) taken elsewhere.
    fn resume(&self, _checkpoint: u64) {}
}

/// Hands out `1, 2, 3, ...`.
#[derive(Debug)]
pub struct Sequential {
    next: AtomicU64,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequential {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// The id the next insert will receive.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl<T> IdAssigner<T, u64> for Sequential {
    fn assign(&self, _record: &T) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    fn observe(&self, id: &u64) {
        self.next.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    fn checkpoint(&self) -> Option<u64> {
        Some(self.peek())
    }

    fn resume(&self, checkpoint: u64) {
        self.next.fetch_max(checkpoint, Ordering::SeqCst);
    }
}

/// Uses the key the record carries.
#[derive(Debug, Default, Clone, Copy)]
pub struct Embedded;

impl<T: Keyed> IdAssigner<T, T::Key> for Embedded {
    fn assign(&self, record: &T) -> T::Key {
        record.key()
    }
}

/// Derives the id with a closure.
pub struct FromFn<F, Id> {
    derive: F,
    _id: PhantomData<fn() -> Id>,
}

pub fn from_fn<T, Id, F>(derive: F) -> FromFn<F, Id>
where
    F: Fn(&T) -> Id + Send + Sync,
{
    FromFn {
        derive,
        _id: PhantomData,
    }
}

impl<T, Id, F> IdAssigner<T, Id> for FromFn<F, Id>
where
    F: Fn(&T) -> Id + Send + Sync,
{
    fn assign(&self, record: &T) -> Id {
        (self.derive)(record)
    }
}
