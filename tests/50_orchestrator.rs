
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use shopfront_api::auth::PasswordHasher;
use shopfront_api::database::models::{ACCOUNTS, ARTICLES, CATEGORIES};
use shopfront_api::database::{FieldSet, MemoryStore, Record, Selection, Store, StoreError, WriteInstruction};
use shopfront_api::services::{ResourceService, ServiceError};

/// Memory store that counts uniqueness lookups and writes
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    unique_lookups: AtomicUsize,
    writes: AtomicUsize,
    touches: AtomicUsize,
}

#[async_trait]
impl Store for CountingStore {
    async fn fetch_by_key(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError> {
        self.inner.fetch_by_key(table, id).await
    }

    async fn fetch_by_unique(&self, table: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError> {
        self.unique_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_by_unique(table, column, value).await
    }

    async fn fetch_all(&self, table: &str, selection: Selection) -> Result<Vec<Record>, StoreError> {
        self.inner.fetch_all(table, selection).await
    }

    async fn write(&self, instruction: WriteInstruction) -> Result<Option<Record>, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let touches = instruction.assignments.iter().filter(|(c, _)| *c == "updated_at").count();
        self.touches.fetch_add(touches, Ordering::SeqCst);
        self.inner.write(instruction).await
    }

    async fn delete(&self, table: &str, id: i64) -> Result<Option<i64>, StoreError> {
        self.inner.delete(table, id).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl CountingStore {
    fn reset(&self) {
        self.unique_lookups.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.touches.store(0, Ordering::SeqCst);
    }
}

fn service() -> (Arc<CountingStore>, ResourceService) {
    let store = Arc::new(CountingStore::default());
    let service = ResourceService::new(store.clone(), PasswordHasher::with_cost(4));
    (store, service)
}

fn fields(schema: &shopfront_api::database::ResourceSchema, body: Value) -> FieldSet {
    FieldSet::from_json(schema, body).unwrap()
}

#[tokio::test]
async fn idempotent_update_skips_lookups_and_touches_once() -> Result<()> {
    let (store, service) = service();
    let ana = json!({"username": "ana", "email": "ana@x.com", "password": "Abcd1234"});
    let created = service.create(&ACCOUNTS, fields(&ACCOUNTS, ana), None).await?;
    assert!(created.get("password").is_none());
    store.reset();

    let same = json!({"username": "ana", "email": "ana@x.com"});
    let updated = service.update(&ACCOUNTS, "1", fields(&ACCOUNTS, same), None).await?;

    assert_eq!(store.unique_lookups.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.touches.load(Ordering::SeqCst), 1);
    assert_eq!(updated["username"], "ana");
    Ok(())
}

#[tokio::test]
async fn changed_unique_value_is_looked_up_once() -> Result<()> {
    let (store, service) = service();
    let ana = json!({"username": "ana", "email": "ana@x.com", "password": "Abcd1234"});
    service.create(&ACCOUNTS, fields(&ACCOUNTS, ana), None).await?;
    store.reset();

    service
        .update(&ACCOUNTS, "1", fields(&ACCOUNTS, json!({"email": "ana@y.com"})), None)
        .await?;
    assert_eq!(store.unique_lookups.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn conflicts_never_write() -> Result<()> {
    let (store, service) = service();
    for name in ["ana", "budi"] {
        let body = json!({"username": name, "email": format!("{name}@x.com"), "password": "Abcd1234"});
        service.create(&ACCOUNTS, fields(&ACCOUNTS, body), None).await?;
    }
    store.reset();

    let err = service
        .update(&ACCOUNTS, "2", fields(&ACCOUNTS, json!({"username": "ana"})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(ref m) if m == "username 'ana' is already in use"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn rejected_input_never_reaches_the_store() -> Result<()> {
    let (store, service) = service();
    service
        .create(&ARTICLES, fields(&ARTICLES, json!({"title": "Hi", "body": "Body"})), None)
        .await?;
    store.reset();

    let err = service
        .update(&ARTICLES, "1", fields(&ARTICLES, json!({"status": "unknown", "title": ""})), None)
        .await
        .unwrap_err();
    let ServiceError::InvalidInput(envelope) = err else {
        panic!("expected invalid input");
    };
    // schema order: title before status
    assert_eq!(
        envelope.problems,
        vec!["title is required", "status must be one of: draft, published, archived"]
    );
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn missing_records_are_not_found() -> Result<()> {
    let (_store, service) = service();
    let err = service.delete(&CATEGORIES, "999", None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "Category not found"));

    let err = service
        .update(&CATEGORIES, "999", fields(&CATEGORIES, json!({"name": "x"})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn passwords_are_stored_hashed() -> Result<()> {
    let (store, service) = service();
    let ana = json!({"username": "ana", "email": "ana@x.com", "password": "Abcd1234"});
    service.create(&ACCOUNTS, fields(&ACCOUNTS, ana), None).await?;

    let stored = store.fetch_by_key("users", 1).await?.unwrap();
    let hash = stored["password"].as_str().unwrap();
    assert_ne!(hash, "Abcd1234");
    assert!(bcrypt::verify("Abcd1234", hash)?);
    Ok(())
}

#[tokio::test]
async fn blank_defaulted_fields_fall_back_to_their_default() -> Result<()> {
    let (store, service) = service();
    let article = service
        .create(&ARTICLES, fields(&ARTICLES, json!({"title": "t", "body": "b", "status": ""})), None)
        .await?;
    assert_eq!(article["status"], "draft");

    let ana = json!({"username": "ana", "email": "ana@x.com", "password": "Abcd1234", "role": "  "});
    let account = service.create(&ACCOUNTS, fields(&ACCOUNTS, ana), None).await?;
    assert_eq!(account["role"], "user");

    let stored = store.fetch_by_key("users", 1).await?.unwrap();
    assert_eq!(stored["role"], "user");
    Ok(())
}

#[tokio::test]
async fn blank_optional_fields_are_stored_as_null() -> Result<()> {
    let (_store, service) = service();
    let ana = json!({"username": "ana", "email": "ana@x.com", "password": "Abcd1234", "phone": "", "address": " "});
    let created = service.create(&ACCOUNTS, fields(&ACCOUNTS, ana), None).await?;
    assert_eq!(created["phone"], Value::Null);
    assert_eq!(created["address"], Value::Null);

    service
        .update(&ACCOUNTS, "1", fields(&ACCOUNTS, json!({"phone": "0812345678"})), None)
        .await?;
    let cleared = service
        .update(&ACCOUNTS, "1", fields(&ACCOUNTS, json!({"phone": ""})), None)
        .await?;
    assert_eq!(cleared["phone"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn blank_required_field_on_create_is_still_missing() -> Result<()> {
    let (store, service) = service();
    let err = service
        .create(&ARTICLES, fields(&ARTICLES, json!({"title": " ", "body": "b"})), None)
        .await
        .unwrap_err();
    let ServiceError::InvalidInput(envelope) = err else {
        panic!("expected invalid input");
    };
    assert_eq!(envelope.problems, vec!["title is required"]);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    Ok(())
}
