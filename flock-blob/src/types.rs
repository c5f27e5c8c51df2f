use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A local file headed for a storage namespace.
///
/// `size_bytes` is always the length of `file_bytes`; the only constructor
/// derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    file_bytes: Bytes,
    file_name: String,
    mime_type: String,
    destination_namespace: String,
}

impl UploadRequest {
    /// An empty mime type (browsers send one for unknown files) becomes
    /// `application/octet-stream`.
    pub fn new<B, F, M, N>(file_bytes: B, file_name: F, mime_type: M, destination_namespace: N) -> Self
    where
        B: Into<Bytes>,
        F: Into<String>,
        M: Into<String>,
        N: Into<String>,
    {
        let mime_type = mime_type.into();
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type.trim().to_string()
        };
        Self {
            file_bytes: file_bytes.into(),
            file_name: file_name.into(),
            mime_type,
            destination_namespace: destination_namespace.into(),
        }
    }

    pub fn file_bytes(&self) -> &Bytes {
        &self.file_bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn destination_namespace(&self) -> &str {
        &self.destination_namespace
    }

    pub fn size_bytes(&self) -> u64 {
        self.file_bytes.len() as u64
    }

    /// Lower-cased extension of the original file name, if it has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Options for a single object put.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    /// Overwrite an existing object of the same name.
    pub upsert: bool,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cache_control<S: Into<String>>(mut self, cache_control: S) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }
}
