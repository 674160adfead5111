//! InMemoryDataSource - table-backed data source for testing and development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, trace, warn};

use super::ids::{Embedded, IdAssigner, Sequential};
use super::{MemoryConfig, MemoryError};
use crate::datasource::{DataSource, Entry, RecordStream};
use crate::error::{Operation, Result, ResultExt};
use crate::keyed::Keyed;
use crate::query::{Patch, Selector};

pub(super) struct Row<T, Id> {
    pub(super) record: T,
    pub(super) id: Id,
}

/// Rows keyed by insertion slot, plus an id -> slot index.
pub(super) struct Table<T, Id> {
    pub(super) rows: BTreeMap<u64, Row<T, Id>>,
    pub(super) index: HashMap<Id, u64>,
    next_slot: u64,
}

impl<T, Id> Table<T, Id> {
    pub(super) fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            index: HashMap::new(),
            next_slot: 0,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.rows.len()
    }
}

impl<T, Id: Clone + Eq + Hash> Table<T, Id> {
    pub(super) fn push(&mut self, id: Id, record: T) {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.index.insert(id.clone(), slot);
        self.rows.insert(slot, Row { record, id });
    }

    fn row_mut(&mut self, id: &Id) -> Option<&mut Row<T, Id>> {
        let slot = *self.index.get(id)?;
        self.rows.get_mut(&slot)
    }

    fn remove(&mut self, id: &Id) -> bool {
        match self.index.remove(id) {
            Some(slot) => self.rows.remove(&slot).is_some(),
            None => false,
        }
    }

    /// Matching rows in slot order. A record the selector cannot evaluate
    /// yields an error in its place.
    fn matching<'a, Q: Selector<T>>(
        &'a self,
        query: &'a Q,
    ) -> impl Iterator<Item = std::result::Result<(u64, &'a Row<T, Id>), MemoryError>> + 'a {
        self.rows
            .iter()
            .filter_map(move |(slot, row)| match query.matches(&row.record) {
                Ok(true) => Some(Ok((*slot, row))),
                Ok(false) => None,
                Err(err) => Some(Err(MemoryError::Query(err))),
            })
    }
}

/// In-memory data source.
///
/// Clone-friendly: clones share the same table. Identifiers come from an
/// [`IdAssigner`]; [`new`](Self::new) numbers records `1, 2, 3, ...` and
/// [`keyed`](Self::keyed) uses the key embedded in the record.
///
/// Batch semantics: `batch_update` patches copies of every match first and
/// writes nothing if any patch fails; `batch_delete` removes all matches under
/// one lock; `batch_insert` commits each chunk of
/// [`insert_chunk_size`](MemoryConfig::insert_chunk_size) records atomically,
/// and chunks committed before a failure stay committed.
///
/// Selectors and patches run before anything is written, so a panic in one
/// leaves the table as it was and the source stays usable.
pub struct InMemoryDataSource<T, Id, Q, U> {
    pub(super) table: Arc<RwLock<Table<T, Id>>>,
    pub(super) ids: Arc<dyn IdAssigner<T, Id>>,
    config: Arc<MemoryConfig>,
    _marker: PhantomData<fn() -> (Q, U)>,
}

impl<T, Id, Q, U> Clone for InMemoryDataSource<T, Id, Q, U> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            ids: Arc::clone(&self.ids),
            config: Arc::clone(&self.config),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static, Q, U> Default for InMemoryDataSource<T, u64, Q, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, Q, U> InMemoryDataSource<T, u64, Q, U> {
    /// Create an empty source with sequential ids.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self::with_assigner(Sequential::new(), config)
    }
}

impl<T, Q, U> InMemoryDataSource<T, T::Key, Q, U>
where
    T: Keyed + 'static,
    T::Key: 'static,
{
    /// Create an empty source that stores records under their embedded key.
    pub fn keyed() -> Self {
        Self::keyed_with_config(MemoryConfig::default())
    }

    pub fn keyed_with_config(config: MemoryConfig) -> Self {
        Self::with_assigner(Embedded, config)
    }
}

impl<T, Id, Q, U> InMemoryDataSource<T, Id, Q, U> {
    pub fn with_assigner<A>(assigner: A, config: MemoryConfig) -> Self
    where
        A: IdAssigner<T, Id> + 'static,
    {
        Self {
            table: Arc::new(RwLock::new(Table::new())),
            ids: Arc::new(assigner),
            config: Arc::new(config),
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub(super) fn read_table(&self, during: &'static str) -> RwLockReadGuard<'_, Table<T, Id>> {
        self.table.read().unwrap_or_else(|poisoned| {
            self.recovered(during);
            poisoned.into_inner()
        })
    }

    pub(super) fn write_table(&self, during: &'static str) -> RwLockWriteGuard<'_, Table<T, Id>> {
        self.table.write().unwrap_or_else(|poisoned| {
            self.recovered(during);
            poisoned.into_inner()
        })
    }

    // Caller code only runs before the table is written, so a panic under
    // the lock cannot leave a half-applied change behind.
    fn recovered(&self, during: &'static str) {
        warn!(source = %self.config.name, during, "recovered record table after a panic");
        self.table.clear_poison();
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read_table("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, Id, Q, U> InMemoryDataSource<T, Id, Q, U>
where
    T: Clone,
    Id: Clone + Eq + Hash,
{
    /// Remove every record. Sequential ids keep counting.
    pub fn clear(&self) {
        let mut table = self.write_table("clear");
        table.rows.clear();
        table.index.clear();
    }

    fn store_one(&self, record: T) -> std::result::Result<Id, MemoryError> {
        let mut table = self.write_table("insert");
        self.check_capacity(&table, 1)?;
        let id = self.ids.assign(&record);
        if table.index.contains_key(&id) {
            return Err(MemoryError::DuplicateId);
        }
        table.push(id.clone(), record);
        Ok(id)
    }

    /// Insert a chunk all-or-nothing.
    fn store_chunk(&self, records: Vec<T>) -> std::result::Result<usize, MemoryError> {
        let mut table = self.write_table("batch insert");
        self.check_capacity(&table, records.len())?;

        let assigned: Vec<(Id, T)> = records
            .into_iter()
            .map(|record| (self.ids.assign(&record), record))
            .collect();

        {
            let mut seen = HashSet::with_capacity(assigned.len());
            for (id, _) in &assigned {
                if table.index.contains_key(id) || !seen.insert(id) {
                    return Err(MemoryError::DuplicateId);
                }
            }
        }

        let count = assigned.len();
        for (id, record) in assigned {
            table.push(id, record);
        }
        Ok(count)
    }

    fn check_capacity(
        &self,
        table: &Table<T, Id>,
        incoming: usize,
    ) -> std::result::Result<(), MemoryError> {
        match self.config.capacity {
            Some(capacity) if table.len() + incoming > capacity => {
                Err(MemoryError::CapacityExceeded { capacity })
            }
            _ => Ok(()),
        }
    }

    fn entry(&self, id: &Id) -> Option<Entry<T, Id>> {
        let table = self.read_table("get");
        table
            .index
            .get(id)
            .and_then(|slot| table.rows.get(slot))
            .map(|row| (row.record.clone(), row.id.clone()))
    }

    fn remove(&self, id: &Id) -> bool {
        self.write_table("delete").remove(id)
    }

    fn replace(&self, id: &Id, record: T) -> std::result::Result<(), MemoryError> {
        let mut table = self.write_table("update");
        let row = table.row_mut(id).ok_or(MemoryError::MissingRecord)?;
        row.record = record;
        Ok(())
    }

    fn patch_one<P: Patch<T>>(&self, id: &Id, patch: &P) -> std::result::Result<(), MemoryError> {
        let mut table = self.write_table("update partial");
        let row = table.row_mut(id).ok_or(MemoryError::MissingRecord)?;
        let mut patched = row.record.clone();
        patch.apply(&mut patched).map_err(MemoryError::Patch)?;
        row.record = patched;
        Ok(())
    }

    fn select<S: Selector<T>>(
        &self,
        query: &S,
        limit: usize,
        skip: usize,
    ) -> std::result::Result<Vec<Entry<T, Id>>, MemoryError> {
        let table = self.read_table("find");
        let limit = if limit == 0 { usize::MAX } else { limit };

        // skipped matches are still evaluated, so their errors surface too
        let mut found = Vec::new();
        for (position, matched) in table.matching(query).enumerate() {
            let (_, row) = matched?;
            if position < skip {
                continue;
            }
            found.push((row.record.clone(), row.id.clone()));
            if found.len() == limit {
                break;
            }
        }
        Ok(found)
    }

    fn remove_matching<S: Selector<T>>(&self, query: &S) -> std::result::Result<usize, MemoryError> {
        let mut table = self.write_table("batch delete");
        let doomed = table
            .matching(query)
            .map(|matched| matched.map(|(slot, _)| slot))
            .collect::<std::result::Result<Vec<u64>, MemoryError>>()?;
        for slot in &doomed {
            if let Some(row) = table.rows.remove(slot) {
                table.index.remove(&row.id);
            }
        }
        Ok(doomed.len())
    }

    fn patch_matching<S: Selector<T>, P: Patch<T>>(
        &self,
        query: &S,
        patch: &P,
    ) -> std::result::Result<usize, MemoryError> {
        let mut table = self.write_table("batch update");

        let mut patched = Vec::new();
        for matched in table.matching(query) {
            let (slot, row) = matched?;
            let mut record = row.record.clone();
            patch.apply(&mut record).map_err(MemoryError::Patch)?;
            patched.push((slot, record));
        }

        let count = patched.len();
        for (slot, record) in patched {
            if let Some(row) = table.rows.get_mut(&slot) {
                row.record = record;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl<T, Id, Q, U> DataSource<T, Id, Q, U> for InMemoryDataSource<T, Id, Q, U>
where
    T: Clone + Send + Sync + 'static,
    Id: Clone + Eq + Hash + Send + Sync + 'static,
    Q: Selector<T> + Clone + Send + Sync + 'static,
    U: Patch<T> + Send + Sync + 'static,
{
    async fn insert(&self, record: T) -> Result<Id> {
        let id = self.store_one(record).during(Operation::Insert)?;
        trace!(source = %self.config.name, "record inserted");
        Ok(id)
    }

    async fn get(&self, id: Id) -> Result<Option<Entry<T, Id>>> {
        Ok(self.entry(&id))
    }

    async fn delete(&self, id: Id) -> Result<()> {
        let existed = self.remove(&id);
        trace!(source = %self.config.name, existed, "record deleted");
        Ok(())
    }

    async fn update(&self, id: Id, record: T) -> Result<()> {
        self.replace(&id, record).during(Operation::Update)
    }

    async fn update_partial(&self, id: Id, update: U) -> Result<()> {
        self.patch_one(&id, &update).during(Operation::UpdatePartial)
    }

    async fn find(&self, query: Q, limit: usize, skip: usize) -> Result<Vec<Entry<T, Id>>> {
        self.select(&query, limit, skip).during(Operation::Find)
    }

    async fn batch_insert(&self, records: RecordStream<'_, T>) -> Result<u64> {
        let mut chunks = records.chunks(self.config.insert_chunk_size.max(1));
        let mut inserted = 0u64;

        while let Some(chunk) = chunks.next().await {
            let count = self.store_chunk(chunk).during(Operation::BatchInsert)?;
            inserted += count as u64;
            trace!(source = %self.config.name, count, "insert chunk committed");
        }

        debug!(source = %self.config.name, inserted, "batch insert complete");
        Ok(inserted)
    }

    async fn batch_delete(&self, query: Q) -> Result<()> {
        let deleted = self.remove_matching(&query).during(Operation::BatchDelete)?;
        debug!(source = %self.config.name, deleted, "batch delete complete");
        Ok(())
    }

    async fn batch_update(&self, query: Q, update: U) -> Result<()> {
        let updated = self
            .patch_matching(&query, &update)
            .during(Operation::BatchUpdate)?;
        debug!(source = %self.config.name, updated, "batch update complete");
        Ok(())
    }
}
