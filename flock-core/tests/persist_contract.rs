use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing_test::traced_test;

use flock_core::{
    ErrorKind, FieldKind, Filter, MediaReference, MemoryRecordStore, Order, PersistStatus,
    PersistableRecord, RecordPersister, RecordSchema, RecordStore, Row, StoreError, StoreResult,
    WriteTarget,
};

/// Store stub answering writes from a script; once the script runs out it
/// repeats `fallback`.
struct ScriptedStore {
    script: Mutex<VecDeque<StoreResult<Row>>>,
    fallback: StoreResult<Row>,
    calls: AtomicUsize,
    received: Mutex<Vec<Row>>,
}

impl ScriptedStore {
    fn new(script: Vec<StoreResult<Row>>, fallback: StoreResult<Row>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        })
    }

    fn always(result: StoreResult<Row>) -> Arc<Self> {
        Self::new(Vec::new(), result)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, row: Row) -> StoreResult<Row> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(row.clone());
        let scripted = self.script.lock().pop_front();
        match scripted.unwrap_or_else(|| self.fallback.clone()) {
            Ok(_) => {
                let mut stored = row;
                stored.insert("id".into(), json!("row-1"));
                Ok(stored)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn insert(&self, _table: &str, row: Row) -> StoreResult<Row> {
        self.answer(row)
    }

    async fn update(&self, _table: &str, _id: &str, row: Row) -> StoreResult<Row> {
        self.answer(row)
    }

    async fn select(&self, _table: &str, _filter: &Filter, _order: Option<&Order>) -> StoreResult<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _table: &str, _id: &str) -> StoreResult<()> {
        Ok(())
    }
}

fn members_schema() -> RecordSchema {
    RecordSchema::new("team_members")
        .required("name", FieldKind::Text)
        .required("email", FieldKind::Text)
        .optional("role", FieldKind::Text)
        .optional("description", FieldKind::Text)
        .media("photo_url")
}

fn events_schema() -> RecordSchema {
    RecordSchema::new("events")
        .required("title", FieldKind::Text)
        .optional("location", FieldKind::Text)
        .optional("description", FieldKind::Text)
        .media("image_url")
}

fn ok_row() -> StoreResult<Row> {
    Ok(Row::new())
}

fn persister(store: &Arc<ScriptedStore>, schema: RecordSchema) -> RecordPersister {
    RecordPersister::with_shared_store(store.clone(), schema)
}

#[tokio::test]
async fn blank_required_field_fails_without_touching_the_store() {
    let store = ScriptedStore::always(ok_row());
    let persister = persister(&store, members_schema());
    let record = PersistableRecord::new()
        .with_field("name", "")
        .with_field("email", "a@b.com");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Validation));
    assert!(outcome.error_detail.as_deref().unwrap().contains("name"));
    assert!(outcome.stored_record.is_none());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn validation_failure_is_repeatable() {
    let store = ScriptedStore::always(ok_row());
    let persister = persister(&store, members_schema());
    let record = PersistableRecord::new().with_field("name", "   ").with_field("email", "");

    let first = persister.persist(WriteTarget::Insert, record.clone()).await;
    let second = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(first.error_detail, second.error_detail);
    assert!(first.error_detail.as_deref().unwrap().contains("name"));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn caller_declared_required_order_decides_the_reported_field() {
    let store = ScriptedStore::always(ok_row());
    let persister = persister(&store, members_schema());
    let record = PersistableRecord::new();

    let outcome = persister
        .persist_with(WriteTarget::Insert, record, &["email", "name"])
        .await;

    assert!(outcome.error_detail.as_deref().unwrap().contains("email"));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn unknown_optional_column_degrades_after_one_retry() {
    let store = ScriptedStore::new(
        vec![Err(StoreError::undefined_column("events", "description"))],
        ok_row(),
    );
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new()
        .with_field("title", "Harvest supper")
        .with_field("location", "Fellowship hall")
        .with_field("description", "Bring a dish");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Degraded);
    assert_eq!(
        outcome.omitted_fields.iter().cloned().collect::<Vec<_>>(),
        vec!["description".to_string()]
    );
    assert_eq!(store.calls(), 2);

    let received = store.received.lock();
    assert!(received[0].contains_key("description"));
    assert!(!received[1].contains_key("description"));
    assert_eq!(received[1]["location"], json!("Fellowship hall"));

    let stored = outcome.stored_record.as_ref().unwrap();
    assert!(!stored.contains("description"));
    assert_eq!(outcome.stored_id().as_deref(), Some("row-1"));
    assert_eq!(
        outcome.user_message().unwrap(),
        "Saved, but these fields were not stored: description"
    );
}

#[tokio::test]
async fn persistent_missing_column_is_written_exactly_twice() {
    let store = ScriptedStore::always(Err(StoreError::undefined_column("events", "description")));
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new()
        .with_field("title", "Harvest supper")
        .with_field("description", "Bring a dish");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::UnrecoverableStore));
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn second_mismatch_on_another_column_is_not_retried_again() {
    let store = ScriptedStore::new(
        vec![
            Err(StoreError::undefined_column("events", "description")),
            Err(StoreError::undefined_column("events", "location")),
        ],
        ok_row(),
    );
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new()
        .with_field("title", "Harvest supper")
        .with_field("location", "Hall")
        .with_field("description", "Bring a dish");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert!(outcome.error_detail.as_deref().unwrap().contains("location"));
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn other_store_errors_fail_without_retry() {
    let store = ScriptedStore::always(Err(StoreError::new("permission denied for table events").with_code("42501")));
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new().with_field("title", "Harvest supper");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert_eq!(outcome.error_detail.as_deref(), Some("permission denied for table events"));
    assert_eq!(outcome.user_message().unwrap(), "Save failed: permission denied for table events");
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn missing_required_column_is_never_dropped() {
    let store = ScriptedStore::always(Err(StoreError::undefined_column("team_members", "email")));
    let persister = persister(&store, members_schema());
    let record = PersistableRecord::new()
        .with_field("name", "Ruth")
        .with_field("email", "ruth@example.org");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn missing_media_column_is_never_dropped() {
    let store = ScriptedStore::always(Err(StoreError::undefined_column("team_members", "photo_url")));
    let persister = persister(&store, members_schema());
    let record = PersistableRecord::new()
        .with_field("name", "Ruth")
        .with_field("email", "ruth@example.org")
        .with_media(MediaReference::remote("https://cdn.example.org/ruth.jpg").unwrap());

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn uncoded_column_message_uses_the_heuristic() {
    let store = ScriptedStore::new(
        vec![Err(StoreError::new("table events has no column named description"))],
        ok_row(),
    );
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new()
        .with_field("title", "Harvest supper")
        .with_field("description", "Bring a dish");

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Degraded);
    assert!(outcome.omitted_fields.contains("description"));
}

#[tokio::test]
async fn complete_save_returns_the_confirmed_row() {
    let store = MemoryRecordStore::new().with_table(
        "team_members",
        &["name", "email", "role", "photo_url", "created_at"],
    );
    let persister = RecordPersister::new(store, members_schema());
    let media = MediaReference::inline("image/png", b"png-bytes").unwrap();
    let record = PersistableRecord::new()
        .with_field("name", "Ruth")
        .with_field("email", "ruth@example.org")
        .with_field("role", "Deacon")
        .with_media(media.clone());

    let outcome = persister.persist(WriteTarget::Insert, record).await;

    assert_eq!(outcome.status, PersistStatus::Complete);
    assert!(outcome.omitted_fields.is_empty());
    assert!(outcome.user_message().is_none());
    let stored = outcome.stored_record.as_ref().unwrap();
    assert_eq!(stored.media(), Some(&media));
    assert!(stored.is_present("created_at"));
    assert!(outcome.stored_id().is_some());
}

#[tokio::test]
async fn update_degrades_the_same_way_as_insert() {
    let store = Arc::new(MemoryRecordStore::new().with_table("events", &["title", "image_url"]));
    let persister = RecordPersister::with_shared_store(store.clone(), events_schema());

    let created = persister
        .persist(WriteTarget::Insert, PersistableRecord::new().with_field("title", "Choir practice"))
        .await;
    let id = created.stored_id().unwrap();

    let edited = PersistableRecord::new()
        .with_field("title", "Choir rehearsal")
        .with_field("description", "Bring your folders");
    let outcome = persister.persist(WriteTarget::update(id.clone()), edited).await;

    assert_eq!(outcome.status, PersistStatus::Degraded);
    assert_eq!(store.write_attempts(), 3);

    let rows = store
        .select("events", &Filter::all().eq("id", id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(rows[0]["title"], Value::from("Choir rehearsal"));

    store.add_column("events", "description");
    let outcome = persister
        .persist(
            WriteTarget::update(id),
            PersistableRecord::new()
                .with_field("title", "Choir rehearsal")
                .with_field("description", "Bring your folders"),
        )
        .await;
    assert_eq!(outcome.status, PersistStatus::Complete);
}

#[tokio::test]
async fn update_of_unknown_row_fails() {
    let store = MemoryRecordStore::new().with_table("events", &["title"]);
    let persister = RecordPersister::new(store, events_schema());

    let outcome = persister
        .persist(
            WriteTarget::update("missing"),
            PersistableRecord::new().with_field("title", "Vespers"),
        )
        .await;

    assert_eq!(outcome.status, PersistStatus::Failed);
    assert!(outcome.error_detail.as_deref().unwrap().contains("missing"));
}

#[traced_test]
#[tokio::test]
async fn degraded_save_is_logged_as_a_warning() {
    let store = ScriptedStore::new(
        vec![Err(StoreError::undefined_column("events", "description"))],
        ok_row(),
    );
    let persister = persister(&store, events_schema());
    let record = PersistableRecord::new()
        .with_field("title", "Harvest supper")
        .with_field("description", "Bring a dish");

    persister.persist(WriteTarget::Insert, record).await;

    assert!(logs_contain("retrying without it"));
    assert!(logs_contain("record saved without optional field"));
}
