//! # flock-blob: media uploads that never strand a record
//!
//! `flock-blob` resolves a local file into a `MediaReference` that a record
//! can embed. The normal path stores the file in object storage and returns
//! its public URL. When storage is unreachable or misconfigured, the file is
//! inlined as a base64 data URI instead, so the save can still go ahead.
//!
//! ## Quick Start
//!
//! ```rust
//! use flock_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryBlobStore::new("https://cms.example.org").with_namespace("gallery");
//! let uploads = UploadCoordinator::new(store);
//!
//! let request = UploadRequest::new(b"\x89PNG".to_vec(), "choir.png", "image/png", "gallery");
//! let outcome = uploads.upload(request).await;
//! assert!(outcome.media().unwrap().is_remote());
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │   Admin workflow   │  ← checks UploadLimits, then persists the record
//! ├────────────────────┤
//! │ UploadCoordinator  │  ← one put, inline fallback
//! ├────────────────────┤
//! │     BlobStore      │  ← put / public_url / remove
//! └────────────────────┘
//! ```

mod config;
mod coordinator;
mod error;
mod memory;
mod receipt;
mod s3_store;
pub mod store;
mod types;

pub use config::UploadLimits;
pub use coordinator::UploadCoordinator;
pub use error::{BlobError, BlobResult};
pub use memory::MemoryBlobStore;
pub use receipt::UploadOutcome;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{object_name_from_url, BlobStore, ObjectNameStrategy, TimestampNameStrategy};
pub use types::{PutOptions, UploadRequest};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobResult, BlobStore, MemoryBlobStore, UploadCoordinator, UploadLimits,
        UploadOutcome, UploadRequest,
    };
}
