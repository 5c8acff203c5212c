//! Records, identities, storage keys, and optimistic version state.
//!
//! A [`Record`] is the transient unit of one store operation: the type
//! metadata supplied by the host, the identity value, the current version,
//! and an ordered column→value map.  Nothing here is kept between calls.

use chrono::Utc;
use serde_json::Value;

use crate::document::Document;

// ── Identity ────────────────────────────────────────────────────────

/// How a record's identity is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Identity assigned by the datastore; the key is stored in a
    /// dedicated column of the document.
    Datastore,
    /// Identity carried by the record's own primary-key field(s); only a
    /// single leading key field is supported.
    Application,
}

// ── Versioning ──────────────────────────────────────────────────────

/// Optimistic-concurrency versioning strategy for a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStrategy {
    /// Monotonic counter starting at 1.
    Number,
    /// Epoch-millisecond timestamp.
    Timestamp,
}

impl VersionStrategy {
    /// The version stored with a freshly inserted record.
    pub fn seed(&self) -> VersionState {
        match self {
            VersionStrategy::Number => VersionState::Number(1),
            VersionStrategy::Timestamp => VersionState::Timestamp(now_millis()),
        }
    }

    /// The version an update writes, given the record's current version.
    ///
    /// Timestamps are forced strictly past the previous value so repeated
    /// updates within one millisecond still produce increasing versions.
    pub fn next(&self, current: &VersionState) -> VersionState {
        match (self, current) {
            (VersionStrategy::Number, VersionState::Number(n)) => VersionState::Number(n + 1),
            (VersionStrategy::Number, _) => VersionState::Number(1),
            (VersionStrategy::Timestamp, VersionState::Timestamp(prev)) => {
                VersionState::Timestamp(now_millis().max(prev + 1))
            }
            (VersionStrategy::Timestamp, _) => VersionState::Timestamp(now_millis()),
        }
    }
}

/// A record's current optimistic version.
///
/// The bridge seeds and advances this but never enforces compare-and-swap;
/// conflict detection is the caller's responsibility using the value
/// echoed back here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    /// The type is not versioned.
    None,
    /// Counter version, always ≥ 1.
    Number(u64),
    /// Epoch-millisecond timestamp version.
    Timestamp(i64),
}

impl VersionState {
    /// The JSON value written to the version column, if any.
    pub fn as_json(&self) -> Option<Value> {
        match self {
            VersionState::None => None,
            VersionState::Number(n) => Some(Value::from(*n)),
            VersionState::Timestamp(t) => Some(Value::from(*t)),
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Version column metadata for a versioned record type.
#[derive(Debug, Clone)]
pub struct VersionMeta {
    /// Column the version is stored under.
    pub column: String,
    /// Transition strategy.
    pub strategy: VersionStrategy,
    /// Whether the version column is also a declared record field (as
    /// opposed to a surrogate column that exists only in the document).
    pub stored_in_field: bool,
}

// ── Type metadata ───────────────────────────────────────────────────

/// Record-type metadata supplied by the host's object/metadata model.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Fully-qualified record-type name.
    pub type_name: String,
    /// Storage path override; the type name is used when absent.
    pub base_path_override: Option<String>,
    /// How identity is assigned for this type.
    pub identity_kind: IdentityKind,
    /// Column holding the key (datastore-id column or primary-key column).
    pub key_column: String,
    /// Version metadata, when the type is versioned.
    pub version: Option<VersionMeta>,
    /// All declared columns, in mapping order.
    pub columns: Vec<String>,
}

impl TypeInfo {
    /// The path segment all of this type's documents live under.
    pub fn base_path(&self) -> &str {
        self.base_path_override
            .as_deref()
            .unwrap_or(&self.type_name)
            .trim_end_matches('/')
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// The structured entity being persisted, owned transiently by the bridge
/// for the duration of one operation.
#[derive(Debug, Clone)]
pub struct Record {
    /// Type metadata.
    pub type_info: TypeInfo,
    /// Identity value (primary key or datastore id).
    pub key: Value,
    /// Current optimistic version.
    pub version: VersionState,
    /// Column→value map.
    pub fields: Document,
}

impl Record {
    /// Create an unversioned record with empty fields.
    pub fn new(type_info: TypeInfo, key: Value) -> Self {
        Self {
            type_info,
            key,
            version: VersionState::None,
            fields: Document::new(),
        }
    }

    /// The key rendered as path text (strings unquoted, other JSON values
    /// in their literal form).
    pub fn key_text(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The storage key identifying this record's document in the bucket:
    /// `<basePath>/<primaryKeyValue>`.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.type_info.base_path(), self.key_text())
    }
}

// ── Listing entries ─────────────────────────────────────────────────

/// One identity synthesized from a bucket key listing.
///
/// `Ord`/`Eq` give set semantics: duplicate (type, key) pairs collapse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListingEntry {
    /// Type-name segment before the first `/` of the key.
    pub type_name: String,
    /// Remainder of the key after the first `/`.
    pub primary_key: String,
}

// ── Test support ────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde_json::json;

    pub fn sample_type() -> TypeInfo {
        TypeInfo {
            type_name: "com.example.Person".to_string(),
            base_path_override: None,
            identity_kind: IdentityKind::Application,
            key_column: "id".to_string(),
            version: None,
            columns: vec!["id".to_string(), "name".to_string(), "age".to_string()],
        }
    }

    pub fn sample_record() -> Record {
        let mut record = Record::new(sample_type(), json!("1"));
        record.fields.insert("id".to_string(), json!("1"));
        record
    }
}

// ── Tests ───────────────────────────────────────────────────────────
