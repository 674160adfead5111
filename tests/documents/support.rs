use datasource_rust::{FieldQuery, InMemoryDataSource, Keyed, MemoryConfig, MergePatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub city: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Keyed)]
pub struct Account {
    #[key]
    pub email: String,
    pub plan: String,
    pub seats: u32,
    pub profile: Profile,
}

pub fn account(email: &str, plan: &str, city: &str) -> Account {
    Account {
        email: email.to_string(),
        plan: plan.to_string(),
        seats: 1,
        profile: Profile {
            city: city.to_string(),
            verified: false,
        },
    }
}

pub type Accounts = InMemoryDataSource<Account, String, FieldQuery, MergePatch>;

pub fn accounts() -> Accounts {
    Accounts::keyed_with_config(MemoryConfig::default().with_name("accounts"))
}

pub fn roster() -> Vec<Account> {
    vec![
        account("ana@example.com", "free", "Lisbon"),
        account("bo@example.com", "pro", "Oslo"),
        account("cy@example.com", "free", "Oslo"),
        account("di@example.com", "team", "Lisbon"),
        account("ed@example.com", "free", "Lisbon"),
    ]
}
