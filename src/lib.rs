pub mod contract;
mod datasource;
mod error;
mod ext;
mod keyed;
pub mod memory;
mod query;
#[cfg(feature = "scheduled")]
mod scheduled;
mod traced;

pub use datasource::{paged, DataSource, Entry, Page, PageStream, RecordStream};
pub use error::{BoxError, DataSourceError, Operation, Result, ResultExt};
pub use ext::DataSourceExt;
pub use keyed::Keyed;
pub use memory::{InMemoryDataSource, MemoryConfig, MemoryError};
pub use query::{FieldQuery, Filter, MergePatch, Modify, Patch, QueryError, Selector};
#[cfg(feature = "scheduled")]
pub use scheduled::{RunOn, ScheduleError, Scheduled};
pub use traced::Traced;

// Re-export the derive so `#[derive(Keyed)]` works with a single import
#[cfg(feature = "macros")]
pub use datasource_rust_macros::Keyed;

// Re-export the stream types that appear in the public API
pub use futures::stream::{BoxStream, Stream};
