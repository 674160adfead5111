use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed, thread-safe error used as the opaque cause of a failed operation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, DataSourceError>;

/// The data source operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Get,
    Delete,
    Update,
    UpdatePartial,
    Find,
    FindStream,
    BatchInsert,
    BatchDelete,
    BatchUpdate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::Update => "update",
            Operation::UpdatePartial => "update_partial",
            Operation::Find => "find",
            Operation::FindStream => "find_stream",
            Operation::BatchInsert => "batch_insert",
            Operation::BatchDelete => "batch_delete",
            Operation::BatchUpdate => "batch_update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend operation.
///
/// Every failure looks the same to calling code: the operation that failed
/// plus an opaque, backend-specific cause. Absent records are not errors;
/// `get` reports them as `Ok(None)`.
#[derive(Debug, Error)]
#[error("{operation} failed: {cause}")]
pub struct DataSourceError {
    operation: Operation,
    #[source]
    cause: BoxError,
}

impl DataSourceError {
    pub fn new(operation: Operation, cause: impl Into<BoxError>) -> Self {
        Self {
            operation,
            cause: cause.into(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Report the same cause under a different operation, for calls built on
    /// top of another one.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Returns the cause as a concrete backend error type, if it is one.
    pub fn downcast_cause<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

/// Attach the failing operation to a backend result.
pub trait ResultExt<T> {
    fn during(self, operation: Operation) -> Result<T>;
}

impl<T, E: Into<BoxError>> ResultExt<T> for std::result::Result<T, E> {
    fn during(self, operation: Operation) -> Result<T> {
        self.map_err(|cause| DataSourceError::new(operation, cause))
    }
}
