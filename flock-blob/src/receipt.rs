use serde::{Deserialize, Serialize};

use flock_core::MediaReference;

/// What an upload produced.
///
/// `Stored` and `Inlined` each carry exactly one media reference; `Failed`
/// carries none and means the whole save must be abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The object is in blob storage.
    Stored {
        media: MediaReference,
        namespace: String,
        object_name: String,
    },
    /// Blob storage failed; the file is inlined as base64.
    Inlined {
        media: MediaReference,
        cause: String,
        /// Set when the put succeeded but the object is unusable; nothing
        /// references it, so it should be removed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stranded_object: Option<String>,
    },
    /// The file is too large to inline after the upload failed.
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stranded_object: Option<String>,
    },
}

impl UploadOutcome {
    pub fn media(&self) -> Option<&MediaReference> {
        match self {
            UploadOutcome::Stored { media, .. } | UploadOutcome::Inlined { media, .. } => Some(media),
            UploadOutcome::Failed { .. } => None,
        }
    }

    pub fn into_media(self) -> Option<MediaReference> {
        match self {
            UploadOutcome::Stored { media, .. } | UploadOutcome::Inlined { media, .. } => Some(media),
            UploadOutcome::Failed { .. } => None,
        }
    }

    /// Name of the stored object, for later cleanup.
    pub fn object_name(&self) -> Option<&str> {
        match self {
            UploadOutcome::Stored { object_name, .. } => Some(object_name),
            _ => None,
        }
    }

    /// Object written by the put that no media reference points at.
    pub fn stranded_object(&self) -> Option<&str> {
        match self {
            UploadOutcome::Inlined { stranded_object, .. }
            | UploadOutcome::Failed { stranded_object, .. } => stranded_object.as_deref(),
            UploadOutcome::Stored { .. } => None,
        }
    }

    pub fn is_inlined(&self) -> bool {
        matches!(self, UploadOutcome::Inlined { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadOutcome::Failed { .. })
    }
}
