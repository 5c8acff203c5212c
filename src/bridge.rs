//! Persistence bridge: CRUD and listing over the signed wire layer.
//!
//! The bridge owns no mutable state of its own — every operation issues
//! one fresh connection and works on the record it was handed.  The only
//! cross-call memory is the [`TypeRegistry`] seam, a host collaborator
//! recording which types have already been prepared so bucket creation
//! happens lazily, once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, trace};

use crate::bucket;
use crate::client::{WireClient, WireResponse};
use crate::config::StoreConfig;
use crate::document::{parse_array, parse_document, DirectCodec, Document, RecordCodec};
use crate::errors::{StatusClass, StoreError};
use crate::listing;
use crate::record::{IdentityKind, Record, TypeInfo, VersionState, VersionStrategy};

/// Characters escaped in the listing prefix query value.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'+')
    .add(b'%')
    .add(b'?');

// ── Type registration seam ──────────────────────────────────────────

/// Records which types have been prepared against the backend.
///
/// The first insert of an unregistered type triggers the idempotent
/// bucket-creation call before the write.
pub trait TypeRegistry: Send + Sync {
    /// Whether the named type has already been registered.
    fn is_registered(&self, type_name: &str) -> bool;

    /// Mark the named type as registered.
    fn register(&self, type_name: &str);
}

/// Process-local registry; the default when the host supplies none.
#[derive(Default)]
pub struct InMemoryRegistry {
    names: Mutex<HashSet<String>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TypeRegistry for InMemoryRegistry {
    fn is_registered(&self, type_name: &str) -> bool {
        self.names.lock().expect("registry lock").contains(type_name)
    }

    fn register(&self, type_name: &str) {
        self.names
            .lock()
            .expect("registry lock")
            .insert(type_name.to_string());
    }
}

// ── Bridge ──────────────────────────────────────────────────────────

/// Orchestrates insert / update / delete / fetch / locate / list against
/// an S3-compatible bucket.
pub struct PersistenceBridge {
    config: StoreConfig,
    codec: Box<dyn RecordCodec>,
    registry: Arc<dyn TypeRegistry>,
}

impl PersistenceBridge {
    /// Create a bridge with the pass-through codec and a process-local
    /// type registry.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            codec: Box::new(DirectCodec),
            registry: Arc::new(InMemoryRegistry::new()),
        }
    }

    /// Replace the record codec.
    pub fn with_codec(mut self, codec: Box<dyn RecordCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the type registry.
    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The bridge's read-only configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn wire(&self) -> WireClient<'_> {
        WireClient::new(&self.config)
    }

    fn ensure_registered(&self, type_name: &str) -> Result<(), StoreError> {
        if !self.registry.is_registered(type_name) {
            bucket::ensure_bucket(&self.config)?;
            self.registry.register(type_name);
        }
        Ok(())
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Insert a record as a new JSON document at its storage key.
    ///
    /// The document carries the datastore-id column (datastore identity
    /// only), the seeded version column, and all declared fields.  On
    /// success the record's in-memory version holds the seeded value.
    pub fn insert(&self, record: &mut Record) -> Result<(), StoreError> {
        self.ensure_registered(&record.type_info.type_name)?;
        debug!(key = %record.storage_key(), "insert");

        let mut doc = Document::new();
        if record.type_info.identity_kind == IdentityKind::Datastore {
            doc.insert(record.type_info.key_column.clone(), record.key.clone());
        }
        if let Some(vermeta) = record.type_info.version.clone() {
            let seeded = vermeta.strategy.seed();
            if let Some(value) = seeded.as_json() {
                doc.insert(vermeta.column.clone(), value.clone());
                if vermeta.stored_in_field {
                    record.fields.insert(vermeta.column.clone(), value);
                }
            }
            record.version = seeded;
        }
        let columns = record.type_info.columns.clone();
        self.codec.encode(record, &columns, &mut doc)?;

        let body = serde_json::to_string(&doc).expect("serialize document");
        let response = self
            .wire()
            .execute(Method::PUT, &record.storage_key(), Some(body), false)?;
        expect_write_success(response)
    }

    /// Write the changed columns of a record as a partial document.
    ///
    /// The version column is advanced per the type's strategy and, when
    /// it is a tracked field missing from `changed_columns`, appended to
    /// the written set.  Primary-key fields always travel with the body.
    ///
    /// The record's in-memory version is advanced *before* the call is
    /// attempted: a failed write leaves it ahead of storage, and callers
    /// must treat errors as requiring a reload.
    pub fn update(&self, record: &mut Record, changed_columns: &[String]) -> Result<(), StoreError> {
        self.ensure_registered(&record.type_info.type_name)?;
        debug!(key = %record.storage_key(), columns = ?changed_columns, "update");

        let mut doc = Document::new();
        let mut columns: Vec<String> = changed_columns.to_vec();
        if let Some(vermeta) = record.type_info.version.clone() {
            let next = vermeta.strategy.next(&record.version);
            if let Some(value) = next.as_json() {
                doc.insert(vermeta.column.clone(), value.clone());
                if vermeta.stored_in_field {
                    record.fields.insert(vermeta.column.clone(), value);
                    if !columns.contains(&vermeta.column) {
                        columns.push(vermeta.column.clone());
                    }
                }
            }
            record.version = next;
        }
        self.codec.encode(record, &columns, &mut doc)?;
        match record.type_info.identity_kind {
            IdentityKind::Datastore => {
                doc.insert(record.type_info.key_column.clone(), record.key.clone());
            }
            IdentityKind::Application => {
                let key_column = vec![record.type_info.key_column.clone()];
                self.codec.encode(record, &key_column, &mut doc)?;
            }
        }

        let body = serde_json::to_string(&doc).expect("serialize document");
        let response = self
            .wire()
            .execute(Method::PUT, &record.storage_key(), Some(body), false)?;
        expect_write_success(response)
    }

    /// Delete the record's document.  HTTP 404 raises
    /// [`StoreError::NotFound`] — terminal, never retried.
    pub fn delete(&self, record: &Record) -> Result<(), StoreError> {
        debug!(key = %record.storage_key(), "delete");
        let response = self
            .wire()
            .execute(Method::DELETE, &record.storage_key(), None, false)?;
        match response.class() {
            StatusClass::Success => Ok(()),
            _ => Err(response.store_error()),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Fetch the record's document and decode the requested columns into
    /// its fields.  HTTP 404 raises [`StoreError::NotFound`].
    pub fn fetch(&self, record: &mut Record, requested_columns: &[String]) -> Result<(), StoreError> {
        debug!(key = %record.storage_key(), columns = ?requested_columns, "fetch");

        // Probe document holding only identity fields, for symmetry with
        // the write paths; the GET wire format does not use it.
        let mut probe = Document::new();
        match record.type_info.identity_kind {
            IdentityKind::Datastore => {
                probe.insert(record.type_info.key_column.clone(), record.key.clone());
            }
            IdentityKind::Application => {
                let key_column = vec![record.type_info.key_column.clone()];
                self.codec.encode(record, &key_column, &mut probe)?;
            }
        }
        trace!(probe = %serde_json::to_string(&probe).expect("serialize document"), "fetch probe");

        let response = self
            .wire()
            .execute(Method::GET, &record.storage_key(), None, true)?;
        match response.class() {
            StatusClass::Success => {
                let doc = parse_document(&response.url, &response.body)?;
                self.codec.decode(&doc, requested_columns, record)
            }
            _ => Err(response.store_error()),
        }
    }

    /// Test whether the record's document exists (HEAD, no body read).
    /// HTTP 404 raises [`StoreError::NotFound`].
    pub fn locate(&self, record: &Record) -> Result<(), StoreError> {
        debug!(key = %record.storage_key(), "locate");
        let response = self
            .wire()
            .execute(Method::HEAD, &record.storage_key(), None, false)?;
        match response.class() {
            StatusClass::Success => Ok(()),
            _ => Err(response.store_error()),
        }
    }

    /// List all records under the type's prefix.
    ///
    /// HTTP 404 yields an empty list — "nothing matches this prefix" is a
    /// valid outcome, not an error.  Subtype inclusion is unsupported:
    /// listing is always confined to the exact type prefix.
    pub fn list(
        &self,
        type_info: &TypeInfo,
        include_subtypes: bool,
    ) -> Result<Vec<Record>, StoreError> {
        if include_subtypes {
            debug!(
                type_name = %type_info.type_name,
                "subtype listing unsupported; listing exact prefix only"
            );
        }
        let path = listing_path(type_info.base_path());
        let response = self.wire().execute(Method::GET, &path, None, true)?;
        match response.class() {
            StatusClass::NotFound => Ok(Vec::new()),
            StatusClass::Success => self.decode_listing(type_info, response),
            StatusClass::Redirect => Err(response.redirect_error()),
            StatusClass::Error => Err(response.request_error()),
        }
    }

    fn decode_listing(
        &self,
        type_info: &TypeInfo,
        response: WireResponse,
    ) -> Result<Vec<Record>, StoreError> {
        if listing::is_xml_listing(&response.content_type) {
            debug!(url = %response.url, "decoding XML key enumeration fallback");
            let entries = listing::parse_xml_keys(&response.url, &response.body)?;
            return Ok(entries
                .into_iter()
                .map(|entry| {
                    let key = Value::String(entry.primary_key);
                    let mut record = Record::new(type_info.clone(), key.clone());
                    record
                        .fields
                        .insert(type_info.key_column.clone(), key);
                    record
                })
                .collect());
        }

        let docs = parse_array(&response.url, &response.body)?;
        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            results.push(self.record_from_document(type_info, &response.url, doc)?);
        }
        Ok(results)
    }

    fn record_from_document(
        &self,
        type_info: &TypeInfo,
        url: &str,
        doc: Document,
    ) -> Result<Record, StoreError> {
        let key = doc
            .get(&type_info.key_column)
            .cloned()
            .ok_or_else(|| StoreError::MalformedResponse {
                url: url.to_string(),
                detail: format!("listing element missing key column `{}`", type_info.key_column),
            })?;
        let mut record = Record::new(type_info.clone(), key);

        if let Some(vermeta) = &type_info.version {
            // A missing or non-numeric version column yields no version,
            // never an error.
            record.version = doc
                .get(&vermeta.column)
                .and_then(Value::as_i64)
                .map_or(VersionState::None, |n| match vermeta.strategy {
                    VersionStrategy::Number => u64::try_from(n)
                        .map(VersionState::Number)
                        .unwrap_or(VersionState::None),
                    VersionStrategy::Timestamp => VersionState::Timestamp(n),
                });
        }

        self.codec.decode(&doc, &type_info.columns, &mut record)?;
        Ok(record)
    }
}

/// The listing request path: `basePath?prefix=basePath`.
fn listing_path(base_path: &str) -> String {
    format!(
        "{base_path}?prefix={}",
        utf8_percent_encode(base_path, QUERY_VALUE)
    )
}

/// Classify a write response: 2xx succeeds, redirects are fatal, and
/// everything else (404 included) is a store error.
fn expect_write_success(response: WireResponse) -> Result<(), StoreError> {
    match response.class() {
        StatusClass::Success => Ok(()),
        StatusClass::Redirect => Err(response.redirect_error()),
        _ => Err(response.request_error()),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_empty() {
        let registry = InMemoryRegistry::new();
        assert!(!registry.is_registered("com.example.Person"));
    }

    #[test]
    fn test_registry_remembers_registration() {
        let registry = InMemoryRegistry::new();
        registry.register("com.example.Person");
        assert!(registry.is_registered("com.example.Person"));
        assert!(!registry.is_registered("com.example.Other"));
    }

    #[test]
    fn test_listing_path_shape() {
        assert_eq!(
            listing_path("com.example.Foo"),
            "com.example.Foo?prefix=com.example.Foo"
        );
    }

    #[test]
    fn test_listing_path_escapes_query_value() {
        assert_eq!(listing_path("my types"), "my types?prefix=my%20types");
    }

    #[test]
    fn test_write_classification() {
        let response = |status| WireResponse {
            verb: "PUT".to_string(),
            url: "http://x/b/Foo/1".to_string(),
            status,
            status_text: String::new(),
            content_type: String::new(),
            body: String::new(),
        };
        assert!(expect_write_success(response(200)).is_ok());
        assert!(matches!(
            expect_write_success(response(301)),
            Err(StoreError::RedirectUnsupported { status: 301, .. })
        ));
        // A 404 on a write is a plain store error, not NotFound.
        assert!(matches!(
            expect_write_success(response(404)),
            Err(StoreError::Request { status: 404, .. })
        ));
        assert!(matches!(
            expect_write_success(response(500)),
            Err(StoreError::Request { status: 500, .. })
        ));
    }
}
