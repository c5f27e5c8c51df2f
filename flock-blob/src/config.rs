use std::collections::HashMap;

use flock_core::{FlockConfigSnapshot, FlockError, FlockResult};

use crate::UploadRequest;

/// Per-namespace upload ceilings, checked by callers before an upload starts.
///
/// Namespaces without a ceiling are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadLimits {
    ceilings: HashMap<String, u64>,
}

impl UploadLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a ceiling for a namespace
    pub fn with_ceiling<S: Into<String>>(mut self, namespace: S, max_bytes: u64) -> Self {
        self.ceilings.insert(namespace.into(), max_bytes);
        self
    }

    pub fn ceiling(&self, namespace: &str) -> Option<u64> {
        self.ceilings.get(namespace).copied()
    }

    /// Reads `upload.max_bytes.<namespace>` keys.
    pub fn from_config(config: &FlockConfigSnapshot) -> FlockResult<Self> {
        let mut limits = Self::new();
        for (namespace, value) in config.section("upload.max_bytes") {
            let max_bytes = value.trim().parse::<u64>().map_err(|_| {
                FlockError::configuration(format!(
                    "upload.max_bytes.{namespace} must be a byte count, got '{value}'"
                ))
            })?;
            limits = limits.with_ceiling(namespace, max_bytes);
        }
        Ok(limits)
    }

    /// Layer `other` on top of these limits.
    pub fn merge(mut self, other: UploadLimits) -> Self {
        self.ceilings.extend(other.ceilings);
        self
    }

    /// Validation error when the request is over its namespace's ceiling.
    pub fn check(&self, request: &UploadRequest) -> FlockResult<()> {
        let Some(max) = self.ceiling(request.destination_namespace()) else {
            return Ok(());
        };
        if request.size_bytes() > max {
            return Err(FlockError::validation(format!(
                "'{}' is {} bytes; files for {} must be at most {} KiB",
                request.file_name(),
                request.size_bytes(),
                request.destination_namespace(),
                max / 1024
            ))
            .with_field("file"));
        }
        Ok(())
    }
}
