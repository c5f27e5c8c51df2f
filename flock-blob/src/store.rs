use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::{BlobResult, PutOptions};

/// Object storage operations the CMS relies on.
///
/// A namespace is a bucket (or bucket-like prefix) grouping one content type's
/// objects. The upload coordinator only calls `put` and `public_url`;
/// `remove` is used for best-effort cleanup of replaced objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` as `namespace/object_name`
    async fn put(
        &self,
        namespace: &str,
        object_name: &str,
        bytes: Bytes,
        options: PutOptions,
    ) -> BlobResult<()>;

    /// Public URL of a stored object
    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String>;

    /// Delete objects; names that do not exist are ignored
    async fn remove(&self, namespace: &str, object_names: &[String]) -> BlobResult<()>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn put(
        &self,
        namespace: &str,
        object_name: &str,
        bytes: Bytes,
        options: PutOptions,
    ) -> BlobResult<()> {
        (**self).put(namespace, object_name, bytes, options).await
    }

    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String> {
        (**self).public_url(namespace, object_name)
    }

    async fn remove(&self, namespace: &str, object_names: &[String]) -> BlobResult<()> {
        (**self).remove(namespace, object_names).await
    }
}

/// Strategy for naming uploaded objects
pub trait ObjectNameStrategy: Send + Sync {
    /// Name for a new object. `extension` is the original file's, lower-cased.
    fn object_name(&self, file_name: &str, extension: Option<&str>) -> String;
}

/// Default naming: `<unix millis>-<8 random chars>.<ext>`
#[derive(Debug, Clone, Default)]
pub struct TimestampNameStrategy;

impl ObjectNameStrategy for TimestampNameStrategy {
    fn object_name(&self, _file_name: &str, extension: Option<&str>) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let random = Uuid::new_v4().simple().to_string();
        let suffix = &random[..8];

        match extension {
            Some(ext) => format!("{millis}-{suffix}.{ext}"),
            None => format!("{millis}-{suffix}"),
        }
    }
}

/// Object name from a stored public URL, when the URL points into `namespace`.
pub fn object_name_from_url(url: &str, namespace: &str) -> Option<String> {
    let marker = format!("/{namespace}/");
    let at = url.rfind(&marker)?;
    let name = &url[at + marker.len()..];
    let name = name.split(['?', '#']).next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}
