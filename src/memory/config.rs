use serde::{Deserialize, Serialize};

use super::MemoryError;

/// Settings for an [`InMemoryDataSource`](super::InMemoryDataSource).
///
/// Every field has a default, so partial documents load:
///
/// ```ignore
/// let config = MemoryConfig::from_json(r#"{ "name": "users", "capacity": 10000 }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Label attached to log events.
    pub name: String,
    /// Records pulled from a `batch_insert` stream per atomic commit.
    pub insert_chunk_size: usize,
    /// Maximum number of stored records, if bounded.
    pub capacity: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            insert_chunk_size: 256,
            capacity: None,
        }
    }
}

impl MemoryConfig {
    pub fn from_json(json: &str) -> Result<Self, MemoryError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MemoryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_insert_chunk_size(mut self, size: usize) -> Self {
        self.insert_chunk_size = size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.insert_chunk_size == 0 {
            return Err(MemoryError::Config(
                "insert_chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
