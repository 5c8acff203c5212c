//! JSON-over-cloud-storage persistence bridge.
//!
//! Persists structured records as individual JSON documents in an
//! S3-compatible bucket, one object per record at
//! `<basePath>/<primaryKey>`.  Requests are signed with the legacy
//! HMAC-SHA1 header scheme, each operation opens a fresh connection, and
//! listings decode both the JSON-array and `<ListBucketResult>` XML
//! response shapes.
//!
//! [`PersistenceBridge`] is the entry point; [`StoreConfig`] carries the
//! endpoint, credentials, and realm.

pub mod bridge;
pub mod bucket;
pub mod client;
pub mod config;
pub mod document;
pub mod errors;
pub mod listing;
pub mod record;
pub mod signer;

pub use bridge::{InMemoryRegistry, PersistenceBridge, TypeRegistry};
pub use config::{load_config, StoreConfig};
pub use document::{DirectCodec, Document, RecordCodec};
pub use errors::{classify_status, StatusClass, StoreError};
pub use record::{
    IdentityKind, ListingEntry, Record, TypeInfo, VersionMeta, VersionState, VersionStrategy,
};
