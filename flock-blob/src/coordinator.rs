use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use flock_core::{FlockConfigSnapshot, MediaReference};

use crate::types::DEFAULT_MIME_TYPE;
use crate::{
    BlobError, BlobResult, BlobStore, ObjectNameStrategy, PutOptions, TimestampNameStrategy,
    UploadOutcome, UploadRequest,
};

const DEFAULT_CACHE_CONTROL: &str = "3600";

/// Places files in blob storage, inlining them when storage is unreachable.
///
/// Each `upload` issues exactly one put. Any failure of the put or of URL
/// resolution switches to the inline fallback immediately; there is no retry
/// loop. Callers check size ceilings (`UploadLimits`) before calling.
///
/// A put that succeeded before URL resolution failed leaves an object nobody
/// references; its name is reported as the outcome's `stranded_object`.
pub struct UploadCoordinator {
    store: Arc<dyn BlobStore>,
    names: Arc<dyn ObjectNameStrategy>,
    max_inline_bytes: Option<u64>,
    cache_control: Option<String>,
}

impl UploadCoordinator {
    pub fn new<S: BlobStore + 'static>(store: S) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            names: Arc::new(TimestampNameStrategy),
            max_inline_bytes: None,
            cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()),
        }
    }

    /// Reads `upload.max_inline_bytes` and `upload.cache_control`.
    pub fn from_config(store: Arc<dyn BlobStore>, config: &FlockConfigSnapshot) -> Self {
        let mut coordinator = Self::with_shared_store(store);
        coordinator.max_inline_bytes = config.get_u64("upload.max_inline_bytes");
        if let Some(cache_control) = config.get_string("upload.cache_control") {
            coordinator.cache_control = Some(cache_control);
        }
        coordinator
    }

    pub fn with_name_strategy<K: ObjectNameStrategy + 'static>(mut self, names: K) -> Self {
        self.names = Arc::new(names);
        self
    }

    /// Largest file the fallback may inline; bigger files fail outright.
    pub fn with_max_inline_bytes(mut self, max: u64) -> Self {
        self.max_inline_bytes = Some(max);
        self
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    #[instrument(
        skip_all,
        fields(
            namespace = %request.destination_namespace(),
            file = %request.file_name(),
            size = request.size_bytes()
        )
    )]
    pub async fn upload(&self, request: UploadRequest) -> UploadOutcome {
        let object_name = self
            .names
            .object_name(request.file_name(), request.extension().as_deref());

        if let Err(err) = self.put(&request, &object_name).await {
            warn!(error = %err, kind = %err.kind(), "upload failed, inlining file instead");
            return self.inline(&request, err.to_string(), None);
        }

        match self.resolve(request.destination_namespace(), &object_name) {
            Ok(media) => {
                info!(object = %object_name, "file stored");
                UploadOutcome::Stored {
                    media,
                    namespace: request.destination_namespace().to_string(),
                    object_name,
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    object = %object_name,
                    "stored object has no usable public url, inlining file instead"
                );
                self.inline(&request, err.to_string(), Some(object_name))
            }
        }
    }

    async fn put(&self, request: &UploadRequest, object_name: &str) -> BlobResult<()> {
        let mut options = PutOptions::new().with_content_type(request.mime_type());
        if let Some(cache_control) = &self.cache_control {
            options = options.with_cache_control(cache_control.clone());
        }

        self.store
            .put(
                request.destination_namespace(),
                object_name,
                request.file_bytes().clone(),
                options,
            )
            .await
    }

    fn resolve(&self, namespace: &str, object_name: &str) -> BlobResult<MediaReference> {
        let url = self.store.public_url(namespace, object_name)?;
        MediaReference::remote(url).map_err(|e| BlobError::invalid(e.message))
    }

    /// Only the inline size ceiling can make this fail. A mime type the data
    /// URI cannot carry is replaced by `application/octet-stream`.
    fn inline(
        &self,
        request: &UploadRequest,
        cause: String,
        stranded_object: Option<String>,
    ) -> UploadOutcome {
        if let Some(max) = self.max_inline_bytes {
            if request.size_bytes() > max {
                error!(max, "file too large to inline");
                return UploadOutcome::Failed {
                    reason: format!(
                        "upload failed ({cause}) and the file is too large to store inline ({} > {max} bytes)",
                        request.size_bytes()
                    ),
                    stranded_object,
                };
            }
        }

        let bytes = request.file_bytes();
        let media = MediaReference::inline(request.mime_type(), bytes).or_else(|err| {
            warn!(error = %err, "inlining with a generic mime type");
            MediaReference::inline(DEFAULT_MIME_TYPE, bytes)
        });
        match media {
            Ok(media) => UploadOutcome::Inlined {
                media,
                cause,
                stranded_object,
            },
            Err(err) => UploadOutcome::Failed {
                reason: format!("upload failed ({cause}) and inline fallback failed: {}", err.message),
                stranded_object,
            },
        }
    }
}
