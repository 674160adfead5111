//! Whole-table export and import, encoded with bitcode.

use std::hash::Hash;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::store::{InMemoryDataSource, Table};
use super::MemoryError;

#[derive(Serialize)]
struct ImageRef<'a, T, Id> {
    rows: Vec<(&'a T, &'a Id)>,
    checkpoint: Option<u64>,
}

#[derive(Deserialize)]
struct Image<T, Id> {
    rows: Vec<(T, Id)>,
    checkpoint: Option<u64>,
}

impl<T, Id, Q, U> InMemoryDataSource<T, Id, Q, U>
where
    Id: Clone + Eq + Hash,
{
    /// Encode every stored record, in match order, along with the id
    /// assigner's position.
    pub fn snapshot(&self) -> Result<Vec<u8>, MemoryError>
    where
        T: Serialize,
        Id: Serialize,
    {
        let table = self.read_table("snapshot");
        let image = ImageRef {
            rows: table
                .rows
                .values()
                .map(|row| (&row.record, &row.id))
                .collect(),
            checkpoint: self.ids.checkpoint(),
        };
        bitcode::serialize(&image).map_err(|e| MemoryError::Snapshot(e.to_string()))
    }

    /// Replace the stored records with a snapshot's. Returns how many were
    /// loaded.
    ///
    /// Nothing changes if the snapshot is unreadable, holds a duplicate id or
    /// exceeds the configured capacity. Ids handed out after a restore never
    /// repeat one the snapshotted source had already assigned.
    pub fn restore(&self, bytes: &[u8]) -> Result<usize, MemoryError>
    where
        T: DeserializeOwned,
        Id: DeserializeOwned,
    {
        let image: Image<T, Id> =
            bitcode::deserialize(bytes).map_err(|e| MemoryError::Snapshot(e.to_string()))?;

        if let Some(capacity) = self.config().capacity {
            if image.rows.len() > capacity {
                return Err(MemoryError::CapacityExceeded { capacity });
            }
        }

        let mut restored = Table::new();
        for (record, id) in image.rows {
            if restored.index.contains_key(&id) {
                return Err(MemoryError::DuplicateId);
            }
            restored.push(id, record);
        }

        for row in restored.rows.values() {
            self.ids.observe(&row.id);
        }
        if let Some(checkpoint) = image.checkpoint {
            self.ids.resume(checkpoint);
        }

        let count = restored.len();
        *self.write_table("restore") = restored;
        tracing::debug!(source = %self.config().name, count, "snapshot restored");
        Ok(count)
    }
}
