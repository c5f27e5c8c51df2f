use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{BlobError, BlobResult, BlobStore, PutOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: Option<String>,
}

/// In-process object storage with bucket semantics: namespaces must be
/// created before use, and the whole store can be taken offline to simulate
/// an outage.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    namespaces: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
    offline: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespaces: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.create_namespace(namespace);
        self
    }

    pub fn create_namespace(&self, namespace: &str) {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default();
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Put calls received, successful or not.
    pub fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get(&self, namespace: &str, object_name: &str) -> Option<Bytes> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|objects| objects.get(object_name))
            .map(|o| o.bytes.clone())
    }

    pub fn content_type(&self, namespace: &str, object_name: &str) -> Option<String> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|objects| objects.get(object_name))
            .and_then(|o| o.content_type.clone())
    }

    pub fn object_names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .read()
            .get(namespace)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn ensure_online(&self) -> BlobResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BlobError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        namespace: &str,
        object_name: &str,
        bytes: Bytes,
        options: PutOptions,
    ) -> BlobResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let mut namespaces = self.namespaces.write();
        let objects = namespaces
            .get_mut(namespace)
            .ok_or_else(|| BlobError::namespace_not_found(namespace))?;

        if !options.upsert && objects.contains_key(object_name) {
            return Err(BlobError::conflict(namespace, object_name));
        }

        objects.insert(
            object_name.to_string(),
            StoredObject {
                bytes,
                content_type: options.content_type,
            },
        );
        Ok(())
    }

    fn public_url(&self, namespace: &str, object_name: &str) -> BlobResult<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{namespace}/{object_name}",
            self.base_url
        ))
    }

    async fn remove(&self, namespace: &str, object_names: &[String]) -> BlobResult<()> {
        self.ensure_online()?;

        let mut namespaces = self.namespaces.write();
        let objects = namespaces
            .get_mut(namespace)
            .ok_or_else(|| BlobError::namespace_not_found(namespace))?;
        for name in object_names {
            objects.remove(name);
        }
        Ok(())
    }
}
