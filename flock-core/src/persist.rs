use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::errors::{ErrorKind, FlockError};
use crate::mismatch::missing_column;
use crate::record::{PersistableRecord, Row};
use crate::schema::{check_required, RecordSchema};
use crate::store::{RecordStore, StoreError, StoreResult};

/// Terminal status of one `persist` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStatus {
    Complete,
    Degraded,
    Failed,
}

impl fmt::Display for PersistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersistStatus::Complete => "complete",
            PersistStatus::Degraded => "degraded",
            PersistStatus::Failed => "failed",
        })
    }
}

/// Which write to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteTarget {
    Insert,
    Update { id: String },
}

impl WriteTarget {
    pub fn update<S: Into<String>>(id: S) -> Self {
        WriteTarget::Update { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub status: PersistStatus,
    pub stored_record: Option<PersistableRecord>,
    pub omitted_fields: BTreeSet<String>,
    pub error_detail: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl PersistOutcome {
    fn complete(stored: PersistableRecord) -> Self {
        Self {
            status: PersistStatus::Complete,
            stored_record: Some(stored),
            omitted_fields: BTreeSet::new(),
            error_detail: None,
            error_kind: None,
        }
    }

    fn degraded(stored: PersistableRecord, omitted: String) -> Self {
        Self {
            status: PersistStatus::Degraded,
            stored_record: Some(stored),
            omitted_fields: BTreeSet::from([omitted]),
            error_detail: None,
            error_kind: None,
        }
    }

    pub fn failed(err: &FlockError) -> Self {
        Self {
            status: PersistStatus::Failed,
            stored_record: None,
            omitted_fields: BTreeSet::new(),
            error_detail: Some(err.message.clone()),
            error_kind: Some(err.kind),
        }
    }

    fn store_failed(err: &StoreError) -> Self {
        Self::failed(&FlockError::unrecoverable(err.message.clone()))
    }

    pub fn is_saved(&self) -> bool {
        self.status != PersistStatus::Failed
    }

    /// The confirmed row's `id`, when the store returned one.
    pub fn stored_id(&self) -> Option<String> {
        let stored = self.stored_record.as_ref()?;
        match stored.get("id")? {
            crate::Scalar::Text(id) => Some(id.clone()),
            crate::Scalar::Integer(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// What to show the admin user: nothing on a complete save, the dropped
    /// fields on a degraded one, the failure detail otherwise.
    pub fn user_message(&self) -> Option<String> {
        match self.status {
            PersistStatus::Complete => None,
            PersistStatus::Degraded => Some(format!(
                "Saved, but these fields were not stored: {}",
                self.omitted_fields
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            PersistStatus::Failed => Some(format!(
                "Save failed: {}",
                self.error_detail.as_deref().unwrap_or("unknown error")
            )),
        }
    }
}

/// Writes records of one schema to a record store.
///
/// One `persist` call issues at most two writes: the full record, and, when
/// the store rejects a single optional column, the same record without that
/// column. Nothing is ever returned as `Err`; every path ends in a
/// `PersistOutcome`.
pub struct RecordPersister {
    store: Arc<dyn RecordStore>,
    schema: RecordSchema,
}

impl RecordPersister {
    pub fn new<S: RecordStore + 'static>(store: S, schema: RecordSchema) -> Self {
        Self {
            store: Arc::new(store),
            schema,
        }
    }

    pub fn with_shared_store(store: Arc<dyn RecordStore>, schema: RecordSchema) -> Self {
        Self { store, schema }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Persist against the schema's own required fields.
    pub async fn persist(&self, target: WriteTarget, record: PersistableRecord) -> PersistOutcome {
        let required = self.schema.required_fields();
        self.persist_with(target, record, &required).await
    }

    /// Persist with a caller-declared required set; its order decides which
    /// missing field is reported.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn persist_with(
        &self,
        target: WriteTarget,
        record: PersistableRecord,
        required: &[&str],
    ) -> PersistOutcome {
        if let Err(err) = check_required(&record, required)
            .and_then(|_| self.schema.check_kinds(&record))
        {
            debug!(error = %err, "record rejected before write");
            return PersistOutcome::failed(&err);
        }

        let first = match self.write(&target, &record).await {
            Ok(row) => {
                debug!("record written");
                return PersistOutcome::complete(self.confirmed(&row));
            }
            Err(err) => err,
        };

        let media_field = self.schema.media_field();
        let Some(missing) = missing_column(&first, &record, media_field) else {
            warn!(error = %first, code = ?first.code, "write failed");
            return PersistOutcome::store_failed(&first);
        };

        if required.contains(&missing.column.as_str()) || Some(missing.column.as_str()) == media_field {
            warn!(column = %missing.column, "store is missing a column that cannot be dropped");
            return PersistOutcome::store_failed(&first);
        }

        warn!(
            column = %missing.column,
            detection = ?missing.detection,
            "store has no column for optional field, retrying without it"
        );
        let retry = record.without_field(&missing.column);
        match self.write(&target, &retry).await {
            Ok(row) => {
                info!(omitted = %missing.column, "record saved without optional field");
                PersistOutcome::degraded(self.confirmed(&row), missing.column)
            }
            Err(err) => {
                warn!(error = %err, code = ?err.code, "retry without optional field failed");
                PersistOutcome::store_failed(&err)
            }
        }
    }

    async fn write(&self, target: &WriteTarget, record: &PersistableRecord) -> StoreResult<Row> {
        let row = record.to_row(self.schema.media_field());
        match target {
            WriteTarget::Insert => self.store.insert(self.schema.table(), row).await,
            WriteTarget::Update { id } => self.store.update(self.schema.table(), id, row).await,
        }
    }

    fn confirmed(&self, row: &Row) -> PersistableRecord {
        PersistableRecord::from_row(row, self.schema.media_field())
    }
}
