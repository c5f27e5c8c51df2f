use std::sync::Arc;

use tracing::{info, instrument, warn};

use flock_blob::{object_name_from_url, UploadCoordinator, UploadLimits, UploadOutcome, UploadRequest};
use flock_core::{
    check_required, Filter, FlockConfigSnapshot, FlockError, FlockResult, MediaReference,
    PersistOutcome, PersistableRecord, RecordPersister, RecordStore, Scalar, StoreError,
    WriteTarget,
};

use crate::content::ContentKind;

/// A file picked in an admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Form state submitted from an admin screen.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    kind: ContentKind,
    id: Option<String>,
    record: PersistableRecord,
    attachment: Option<Attachment>,
    current_media: Option<MediaReference>,
}

impl ContentDraft {
    /// A draft for a new item.
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            id: None,
            record: PersistableRecord::new(),
            attachment: None,
            current_media: None,
        }
    }

    /// A draft editing the stored item `id`.
    pub fn edit<S: Into<String>>(kind: ContentKind, id: S) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(kind)
        }
    }

    pub fn with_field<K: Into<String>, V: Into<Scalar>>(mut self, name: K, value: V) -> Self {
        self.record = self.record.with_field(name, value);
        self
    }

    /// Media the item already has; kept unless a new file is attached.
    pub fn with_current_media(mut self, media: Option<MediaReference>) -> Self {
        self.current_media = media;
        self
    }

    pub fn attach<F, M>(mut self, bytes: Vec<u8>, file_name: F, mime_type: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        self.attachment = Some(Attachment {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        });
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn record(&self) -> &PersistableRecord {
        &self.record
    }
}

/// Result of one `save`.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub kind: ContentKind,
    /// `None` when no file was attached or the draft was rejected first.
    pub upload: Option<UploadOutcome>,
    pub persist: PersistOutcome,
}

impl SaveReport {
    fn rejected(kind: ContentKind, err: &FlockError) -> Self {
        Self {
            kind,
            upload: None,
            persist: PersistOutcome::failed(err),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.persist.is_saved()
    }

    pub fn media_inlined(&self) -> bool {
        self.upload.as_ref().is_some_and(UploadOutcome::is_inlined)
    }

    /// Notices for the admin user, most important first.
    pub fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.persist.user_message().into_iter().collect();
        if self.is_saved() && self.media_inlined() {
            messages.push(format!(
                "File storage was unavailable, so the {} file was saved inside the record.",
                self.kind
            ));
        }
        messages
    }
}

/// Runs the admin save workflow: validate, upload, persist, clean up.
pub struct ContentPublisher {
    uploads: UploadCoordinator,
    records: Arc<dyn RecordStore>,
    limits: UploadLimits,
}

impl ContentPublisher {
    pub fn new(uploads: UploadCoordinator, records: Arc<dyn RecordStore>) -> Self {
        Self {
            uploads,
            records,
            limits: ContentKind::default_limits(),
        }
    }

    /// Built-in ceilings overlaid with `upload.max_bytes.*` from config.
    pub fn from_config(
        uploads: UploadCoordinator,
        records: Arc<dyn RecordStore>,
        config: &FlockConfigSnapshot,
    ) -> FlockResult<Self> {
        let limits = ContentKind::default_limits().merge(UploadLimits::from_config(config)?);
        Ok(Self::new(uploads, records).with_limits(limits))
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn persister(&self, kind: ContentKind) -> RecordPersister {
        RecordPersister::with_shared_store(self.records.clone(), kind.schema())
    }

    /// Save a draft. Validation and upload ceilings are checked before any
    /// call to blob or record storage.
    #[instrument(skip_all, fields(kind = %draft.kind(), id = ?draft.id()))]
    pub async fn save(&self, draft: ContentDraft) -> SaveReport {
        let ContentDraft {
            kind,
            id,
            record,
            attachment,
            current_media,
        } = draft;
        let persister = self.persister(kind);
        let schema = persister.schema();

        if let Err(err) = check_required(&record, &schema.required_fields())
            .and_then(|_| schema.check_kinds(&record))
        {
            return SaveReport::rejected(kind, &err);
        }

        let request = attachment.map(|file| {
            UploadRequest::new(file.bytes, file.file_name, file.mime_type, kind.namespace())
        });
        if let Some(request) = &request {
            if let Err(err) = self.limits.check(request) {
                return SaveReport::rejected(kind, &err);
            }
        }

        let upload = match request {
            Some(request) => Some(self.uploads.upload(request).await),
            None => None,
        };
        if let Some(stranded) = upload.as_ref().and_then(UploadOutcome::stranded_object) {
            self.remove_object(kind, stranded.to_string()).await;
        }
        let media = match &upload {
            Some(UploadOutcome::Failed { reason, .. }) => {
                let err = FlockError::transport(reason.clone()).with_field("file");
                return SaveReport {
                    kind,
                    upload,
                    persist: PersistOutcome::failed(&err),
                };
            }
            Some(outcome) => outcome.media().cloned(),
            None => current_media.clone(),
        };

        let target = match id {
            Some(id) => WriteTarget::update(id),
            None => WriteTarget::Insert,
        };
        let persist = persister
            .persist(target, record.with_optional_media(media))
            .await;

        // A saved record no longer points at the media it replaced; a failed
        // one never points at the new upload.
        let stale = match &upload {
            Some(_) if persist.is_saved() => current_media.as_ref(),
            Some(UploadOutcome::Stored { media, .. }) => Some(media),
            _ => None,
        };
        if let Some(stale) = stale {
            self.discard_object(kind, stale).await;
        }
        if persist.is_saved() {
            info!(status = %persist.status, "content saved");
        }

        SaveReport {
            kind,
            upload,
            persist,
        }
    }

    /// Delete a stored item, then its object in blob storage if it has one.
    #[instrument(skip_all, fields(kind = %kind, id = %id))]
    pub async fn remove(
        &self,
        kind: ContentKind,
        id: &str,
        media: Option<&MediaReference>,
    ) -> FlockResult<()> {
        self.records
            .delete(kind.table(), id)
            .await
            .map_err(store_failure)?;
        info!("content removed");

        if let Some(media) = media {
            self.discard_object(kind, media).await;
        }
        Ok(())
    }

    /// Every stored item of `kind`, in screen order.
    pub async fn list(&self, kind: ContentKind) -> FlockResult<Vec<PersistableRecord>> {
        let rows = self
            .records
            .select(kind.table(), &Filter::all(), Some(&kind.list_order()))
            .await
            .map_err(store_failure)?;
        Ok(rows
            .iter()
            .map(|row| PersistableRecord::from_row(row, Some(kind.media_field())))
            .collect())
    }

    /// Best-effort delete of a stored object. Inline media and URLs outside
    /// the kind's namespace are left alone.
    async fn discard_object(&self, kind: ContentKind, media: &MediaReference) {
        if let Some(object_name) = media.url().and_then(|url| object_name_from_url(url, kind.namespace())) {
            self.remove_object(kind, object_name).await;
        }
    }

    async fn remove_object(&self, kind: ContentKind, object_name: String) {
        let names = [object_name];
        match self.uploads.store().remove(kind.namespace(), &names).await {
            Ok(()) => info!(object = %names[0], "stale object removed"),
            Err(err) => warn!(object = %names[0], error = %err, "could not remove stale object"),
        }
    }
}

fn store_failure(err: StoreError) -> FlockError {
    FlockError::unrecoverable(err.message)
}
