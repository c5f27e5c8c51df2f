//! flock-admin: the church content dashboard on top of `flock-core` and
//! `flock-blob`.
//!
//! Every admin save follows the same sequence:
//!
//! 1. check required fields and the upload ceiling (no I/O yet)
//! 2. upload the attached file, inlining it if storage is down
//! 3. persist the record, dropping one optional column the table lacks
//! 4. remove the object the record no longer points at
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use flock_admin::{ContentDraft, ContentKind, ContentPublisher};
//! use flock_blob::{MemoryBlobStore, UploadCoordinator};
//! use flock_core::MemoryRecordStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let blobs = MemoryBlobStore::new("https://cms.example.org").with_namespace("event-images");
//! let records = MemoryRecordStore::new().with_table(
//!     "events",
//!     &["title", "event_date", "image_url", "created_at"],
//! );
//! let publisher = ContentPublisher::new(UploadCoordinator::new(blobs), Arc::new(records));
//!
//! let draft = ContentDraft::new(ContentKind::Event)
//!     .with_field("title", "Harvest supper")
//!     .with_field("event_date", "2025-10-12")
//!     .with_field("location", "Church hall")
//!     .attach(b"\x89PNG".to_vec(), "supper.png", "image/png");
//!
//! let report = publisher.save(draft).await;
//! assert!(report.is_saved());
//! assert!(report.persist.omitted_fields.contains("location"));
//! # }
//! ```

mod about;
mod content;
mod publisher;
pub mod screen;

pub use about::{AboutPage, TeamProfile};
pub use content::{ContentKind, TEAM_PHOTO_MAX_BYTES};
pub use publisher::{Attachment, ContentDraft, ContentPublisher, SaveReport};
pub use screen::{actions_for, reduce, ListAction, ListState};
