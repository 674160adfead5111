mod support;

use std::collections::HashMap;

use datasource_rust::{
    DataSource, DataSourceExt, FieldQuery, InMemoryDataSource, Keyed, MemoryConfig, MemoryError,
    MergePatch, Operation, Scheduled, Traced,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use support::{account, accounts, roster, Account, Accounts};

/// Tuple map keys have no JSON form, so field queries cannot evaluate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Grid {
    tag: String,
    cells: HashMap<(u8, u8), u8>,
}

#[derive(Debug, Clone, Keyed)]
struct Ticket {
    id: u32,
    title: String,
}

fn emails(found: &[(Account, String)]) -> Vec<&str> {
    found.iter().map(|(_, email)| email.as_str()).collect()
}

#[test]
fn derive_falls_back_to_id_field() {
    let ticket = Ticket {
        id: 7,
        title: "broken build".to_string(),
    };
    assert_eq!(ticket.key(), 7);
    assert_eq!(ticket.title, "broken build");
}

#[tokio::test]
async fn records_are_stored_under_their_key() {
    let source = accounts();
    let id = source
        .insert(account("ana@example.com", "free", "Lisbon"))
        .await
        .unwrap();
    assert_eq!(id, "ana@example.com");

    let (found, found_id) = source.get(id.clone()).await.unwrap().unwrap();
    assert_eq!(found.plan, "free");
    assert_eq!(found_id, id);

    let err = source
        .insert(account("ana@example.com", "pro", "Oslo"))
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Operation::Insert);
    assert!(matches!(
        err.downcast_cause::<MemoryError>(),
        Some(MemoryError::DuplicateId)
    ));
    assert_eq!(source.len(), 1);
}

#[tokio::test]
async fn field_queries_reach_nested_fields() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    let lisbon_free = FieldQuery::new()
        .field("plan", "free")
        .field("profile.city", "Lisbon");
    let found = source.find(lisbon_free.clone(), 0, 0).await.unwrap();
    assert_eq!(emails(&found), vec!["ana@example.com", "ed@example.com"]);

    let second = source.find(lisbon_free, 1, 1).await.unwrap();
    assert_eq!(emails(&second), vec!["ed@example.com"]);

    assert_eq!(source.count(FieldQuery::new()).await.unwrap(), 5);
    assert_eq!(
        source
            .count(FieldQuery::new().field("profile.city", "Paris"))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn merge_patch_changes_only_named_fields() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    source
        .update_partial(
            "bo@example.com".to_string(),
            json!({ "seats": 12, "profile": { "verified": true } }).into(),
        )
        .await
        .unwrap();

    let bo = source
        .get_record("bo@example.com".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bo.seats, 12);
    assert!(bo.profile.verified);
    assert_eq!(bo.profile.city, "Oslo");
    assert_eq!(bo.plan, "pro");
}

#[tokio::test]
async fn shape_breaking_patch_leaves_record_alone() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    let err = source
        .update_partial(
            "cy@example.com".to_string(),
            json!({ "seats": "lots" }).into(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Operation::UpdatePartial);
    assert!(matches!(
        err.downcast_cause::<MemoryError>(),
        Some(MemoryError::Patch(_))
    ));

    let cy = source
        .get_record("cy@example.com".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cy.seats, 1);
}

#[tokio::test]
async fn partial_update_of_missing_key_fails() {
    let source = accounts();
    let err = source
        .update_partial("nobody@example.com".to_string(), json!({ "seats": 2 }).into())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_cause::<MemoryError>(),
        Some(MemoryError::MissingRecord)
    ));
}

#[tokio::test]
async fn batch_update_then_delete() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    source
        .batch_update(
            FieldQuery::new().field("plan", "free"),
            json!({ "plan": "pro" }).into(),
        )
        .await
        .unwrap();
    let pro = FieldQuery::new().field("plan", "pro");
    assert_eq!(source.count(pro.clone()).await.unwrap(), 4);

    source.batch_delete(pro).await.unwrap();
    let rest = source.find_all(FieldQuery::new()).await.unwrap();
    assert_eq!(emails(&rest), vec!["di@example.com"]);
}

#[tokio::test]
async fn failing_batch_update_changes_nothing() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    // removing a required field cannot deserialize back into an Account
    let err = source
        .batch_update(
            FieldQuery::new().field("profile.city", "Oslo"),
            json!({ "plan": "team", "seats": null }).into(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Operation::BatchUpdate);

    let team = source
        .find_all(FieldQuery::new().field("plan", "team"))
        .await
        .unwrap();
    assert_eq!(emails(&team), vec!["di@example.com"]);
}

#[tokio::test]
async fn queries_and_patches_load_from_json() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();

    let query: FieldQuery =
        serde_json::from_str(r#"{ "plan": "free", "profile.city": "Oslo" }"#).unwrap();
    let patch: MergePatch = serde_json::from_str(r#"{ "profile": { "verified": true } }"#).unwrap();

    source.batch_update(query.clone(), patch).await.unwrap();

    let verified = source
        .find_all(FieldQuery::new().field("profile.verified", true))
        .await
        .unwrap();
    assert_eq!(emails(&verified), vec!["cy@example.com"]);
    assert_eq!(serde_json::to_value(&query).unwrap()["plan"], "free");
}

#[tokio::test]
async fn snapshot_survives_clear() {
    let source = accounts();
    source.insert_all(roster()).await.unwrap();
    let image = source.snapshot().unwrap();

    source.clear();
    assert!(source.is_empty());

    assert_eq!(source.restore(&image).unwrap(), 5);
    let restored = source.find_all(FieldQuery::new()).await.unwrap();
    assert_eq!(
        emails(&restored),
        vec![
            "ana@example.com",
            "bo@example.com",
            "cy@example.com",
            "di@example.com",
            "ed@example.com"
        ]
    );

    let copy = accounts();
    copy.restore(&image).unwrap();
    assert!(copy.exists("di@example.com".to_string()).await.unwrap());
}

#[tokio::test]
async fn capacity_from_config_document() {
    let config =
        MemoryConfig::from_json(r#"{ "name": "small", "capacity": 3, "insert_chunk_size": 2 }"#)
            .unwrap();
    let source = Accounts::keyed_with_config(config);
    assert_eq!(source.config().name, "small");

    // the first chunk of two fits, the second would exceed the capacity
    let err = source.insert_all(roster()).await.unwrap_err();
    assert_eq!(err.operation(), Operation::BatchInsert);
    assert!(matches!(
        err.downcast_cause::<MemoryError>(),
        Some(MemoryError::CapacityExceeded { capacity: 3 })
    ));
    assert_eq!(source.len(), 2);
}

#[tokio::test]
async fn invalid_config_document_is_rejected() {
    let err = MemoryConfig::from_json(r#"{ "insert_chunk_size": 0 }"#).unwrap_err();
    assert!(matches!(err, MemoryError::Config(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streams_pages_through_adapters() {
    let source = Traced::new(Scheduled::on_current(accounts()).unwrap(), "accounts");
    source.insert_all(roster()).await.unwrap();

    let lisbon = FieldQuery::new().field("profile.city", "Lisbon");
    let entries = source.collect_stream(lisbon.clone(), 0, 2).await.unwrap();
    assert_eq!(
        emails(&entries),
        vec!["ana@example.com", "di@example.com", "ed@example.com"]
    );

    let first = source.find_one(lisbon).await.unwrap().unwrap();
    assert_eq!(first.1, "ana@example.com");
}

#[tokio::test]
async fn unevaluable_records_fail_queries() {
    let source = InMemoryDataSource::<Grid, u64, FieldQuery, MergePatch>::new();
    let mut cells = HashMap::new();
    cells.insert((0, 0), 1);
    source
        .insert(Grid {
            tag: "x".to_string(),
            cells,
        })
        .await
        .unwrap();

    let tagged = FieldQuery::new().field("tag", "x");

    let err = source.find(tagged.clone(), 0, 0).await.unwrap_err();
    assert_eq!(err.operation(), Operation::Find);
    assert!(matches!(
        err.downcast_cause::<MemoryError>(),
        Some(MemoryError::Query(_))
    ));

    let err = source.batch_delete(tagged.clone()).await.unwrap_err();
    assert_eq!(err.operation(), Operation::BatchDelete);

    let err = source
        .batch_update(tagged, json!({ "tag": "y" }).into())
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Operation::BatchUpdate);

    assert_eq!(source.len(), 1);
    assert_eq!(source.get(1).await.unwrap().unwrap().0.tag, "x");
}
