//! flock-core: data model and resilient persistence for the flock CMS.
//!
//! A save in the admin dashboard is two steps: resolve the media (see
//! `flock-blob`), then persist the record that embeds it. This crate owns the
//! second step and everything both steps share:
//!
//! - `MediaReference`: a public URL or an inlined base64 payload
//! - `PersistableRecord` + `RecordSchema`: ordered fields, required/optional tags
//! - `RecordStore`: the hosted table API as a trait (`MemoryRecordStore` in-process)
//! - `RecordPersister`: validate, write, and retry once without an optional
//!   column the table does not have yet
//!
//! ```rust
//! use flock_core::{
//!     FieldKind, MemoryRecordStore, PersistStatus, PersistableRecord, RecordPersister,
//!     RecordSchema, WriteTarget,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryRecordStore::new().with_table("events", &["title", "created_at"]);
//! let schema = RecordSchema::new("events")
//!     .required("title", FieldKind::Text)
//!     .optional("description", FieldKind::Text);
//! let persister = RecordPersister::new(store, schema);
//!
//! let record = PersistableRecord::new()
//!     .with_field("title", "Harvest supper")
//!     .with_field("description", "Bring a dish to share");
//!
//! let outcome = persister.persist(WriteTarget::Insert, record).await;
//! assert_eq!(outcome.status, PersistStatus::Degraded);
//! assert!(outcome.omitted_fields.contains("description"));
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod media;
pub mod memory;
pub mod mismatch;
pub mod persist;
pub mod record;
pub mod schema;
pub mod store;

pub use config::{FlockConfig, FlockConfigSnapshot};
pub use errors::{ErrorKind, FlockError, FlockResult};
pub use media::MediaReference;
pub use memory::MemoryRecordStore;
pub use mismatch::{Detection, MissingColumn};
pub use persist::{PersistOutcome, PersistStatus, RecordPersister, WriteTarget};
pub use record::{PersistableRecord, Row, Scalar};
pub use schema::{check_required, FieldKind, FieldSpec, RecordSchema};
pub use store::{Filter, Order, RecordStore, StoreError, StoreResult};
