//! # Errors
//!
//! flock sorts every failure of the upload-and-persist workflow into one of a
//! small set of kinds. The kind decides where the failure is absorbed:
//! - `Validation` never reaches a network call
//! - `Transport` is recovered by the upload coordinator's inline fallback
//! - `SchemaMismatch` is recovered once by the persistence adapter's retry
//! - `UnrecoverableStore` is surfaced to the caller as a failed outcome
//!
//! `FlockError` can be carried through `anyhow::Error` for callers that
//! prefer a single error type at their boundary.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for flock APIs that fail with a structured error.
pub type FlockResult<T> = std::result::Result<T, FlockError>;

/// Failure categories of the upload-and-persist workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Transport,
    SchemaMismatch,
    UnrecoverableStore,
    Configuration,
}

impl ErrorKind {
    /// Human-facing name (e.g. "ValidationError")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::SchemaMismatch => "SchemaMismatchError",
            ErrorKind::UnrecoverableStore => "UnrecoverableStoreError",
            ErrorKind::Configuration => "ConfigurationError",
        }
    }

    /// Kebab-cased class name, stable for logs and client payloads.
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::SchemaMismatch => "schema-mismatch",
            ErrorKind::UnrecoverableStore => "unrecoverable-store",
            ErrorKind::Configuration => "configuration",
        }
    }

    /// Whether a component is allowed to absorb this kind locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::Transport | ErrorKind::SchemaMismatch)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured flock error.
///
/// - kind
/// - message
/// - field (the record field the error is about, if any)
/// - source (dropped by `sanitize_for_client`)
#[derive(Debug)]
pub struct FlockError {
    pub kind: ErrorKind,
    pub message: String,
    pub field: Option<String>,
    pub source: Option<AnyError>,
}

impl FlockError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            source: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `FlockError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&FlockError> {
        err.downcast_ref::<FlockError>()
    }

    /// Turn any error into a FlockError:
    /// - if it's already a FlockError, keep it
    /// - otherwise wrap as UnrecoverableStore
    pub fn normalize(err: AnyError) -> FlockError {
        match err.downcast::<FlockError>() {
            Ok(flock) => flock,
            Err(other) => {
                FlockError::new(ErrorKind::UnrecoverableStore, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy without the inner `source`, suitable for showing to an admin user.
    pub fn sanitize_for_client(&self) -> FlockError {
        FlockError {
            kind: self.kind,
            message: self.message.clone(),
            field: self.field.clone(),
            source: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut base = serde_json::json!({
            "name": self.name(),
            "className": self.class_name(),
            "message": self.message,
        });
        if let Some(field) = &self.field {
            base["field"] = serde_json::Value::String(field.clone());
        }
        base
    }

    // ---- Constructors ----

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, msg)
    }
    pub fn unrecoverable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnrecoverableStore, msg)
    }
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, msg)
    }

    /// Validation error for a required field that is missing or blank.
    pub fn missing_field(field: &str) -> Self {
        Self::validation(format!("'{field}' is required")).with_field(field)
    }
}

impl fmt::Display for FlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message)
    }
}

impl std::error::Error for FlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
