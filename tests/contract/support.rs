use async_trait::async_trait;
use datasource_rust::contract::ContractFixture;
use datasource_rust::{
    DataSource, Entry, Filter, InMemoryDataSource, Modify, RecordStream, Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

pub fn person(name: &str, age: u32) -> Person {
    Person {
        name: name.to_string(),
        age,
    }
}

pub type People = InMemoryDataSource<Person, u64, Filter<Person>, Modify<Person>>;

pub fn fixture() -> ContractFixture<Person, u64, Filter<Person>> {
    ContractFixture {
        records: vec![
            person("ada", 36),
            person("grace", 45),
            person("linus", 21),
            person("barbara", 52),
            person("ken", 60),
        ],
        replacement: person("margaret", 33),
        missing_id: u64::MAX,
        everything: Filter::all(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Delegates everything except `get`, which never finds anything.
pub struct Forgetful<D>(pub D);

#[async_trait]
impl<D> DataSource<Person, u64, Filter<Person>, Modify<Person>> for Forgetful<D>
where
    D: DataSource<Person, u64, Filter<Person>, Modify<Person>>,
{
    async fn insert(&self, record: Person) -> Result<u64> {
        self.0.insert(record).await
    }

    async fn get(&self, _id: u64) -> Result<Option<Entry<Person, u64>>> {
        Ok(None)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.0.delete(id).await
    }

    async fn update(&self, id: u64, record: Person) -> Result<()> {
        self.0.update(id, record).await
    }

    async fn update_partial(&self, id: u64, update: Modify<Person>) -> Result<()> {
        self.0.update_partial(id, update).await
    }

    async fn find(
        &self,
        query: Filter<Person>,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Entry<Person, u64>>> {
        self.0.find(query, limit, skip).await
    }

    async fn batch_insert(&self, records: RecordStream<'_, Person>) -> Result<u64> {
        self.0.batch_insert(records).await
    }

    async fn batch_delete(&self, query: Filter<Person>) -> Result<()> {
        self.0.batch_delete(query).await
    }

    async fn batch_update(&self, query: Filter<Person>, update: Modify<Person>) -> Result<()> {
        self.0.batch_update(query, update).await
    }
}

/// Off-by-one paging: skips one record too many.
pub struct Skewed<D>(pub D);

#[async_trait]
impl<D> DataSource<Person, u64, Filter<Person>, Modify<Person>> for Skewed<D>
where
    D: DataSource<Person, u64, Filter<Person>, Modify<Person>>,
{
    async fn insert(&self, record: Person) -> Result<u64> {
        self.0.insert(record).await
    }

    async fn get(&self, id: u64) -> Result<Option<Entry<Person, u64>>> {
        self.0.get(id).await
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.0.delete(id).await
    }

    async fn update(&self, id: u64, record: Person) -> Result<()> {
        self.0.update(id, record).await
    }

    async fn update_partial(&self, id: u64, update: Modify<Person>) -> Result<()> {
        self.0.update_partial(id, update).await
    }

    async fn find(
        &self,
        query: Filter<Person>,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Entry<Person, u64>>> {
        let skip = if skip > 0 { skip + 1 } else { skip };
        self.0.find(query, limit, skip).await
    }

    async fn batch_insert(&self, records: RecordStream<'_, Person>) -> Result<u64> {
        self.0.batch_insert(records).await
    }

    async fn batch_delete(&self, query: Filter<Person>) -> Result<()> {
        self.0.batch_delete(query).await
    }

    async fn batch_update(&self, query: Filter<Person>, update: Modify<Person>) -> Result<()> {
        self.0.batch_update(query, update).await
    }
}
