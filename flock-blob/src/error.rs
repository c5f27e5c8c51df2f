use thiserror::Error;

use flock_core::ErrorKind;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob operations
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },

    #[error("Storage namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    #[error("Object already exists: {namespace}/{name}")]
    Conflict { namespace: String, name: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_found<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace_not_found<S: Into<String>>(namespace: S) -> Self {
        Self::NamespaceNotFound {
            namespace: namespace.into(),
        }
    }

    pub fn conflict<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self::Conflict {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Network or service outage
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Where this error sits in the workflow's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobError::Invalid { .. } => ErrorKind::Validation,
            _ => ErrorKind::Transport,
        }
    }
}
