//! Dynamic JSON documents and the record/codec boundary.
//!
//! Stored documents are schemaless: an ordered mapping from column name to
//! a JSON value (string, number, boolean, null, nested object or array).
//! [`RecordCodec`] is the seam between record field values and those
//! key/value pairs; hosts with richer type mappings supply their own
//! implementation, [`DirectCodec`] passes values through unchanged.

use serde_json::Value;

use crate::errors::StoreError;
use crate::record::Record;

/// An ordered column-name → JSON-value mapping.
pub type Document = serde_json::Map<String, Value>;

/// Converts between record field values and JSON key/value pairs.
pub trait RecordCodec: Send + Sync {
    /// Write the named columns of `record` into `doc`.
    fn encode(
        &self,
        record: &Record,
        columns: &[String],
        doc: &mut Document,
    ) -> Result<(), StoreError>;

    /// Read the named columns of `doc` into `record`'s fields.
    fn decode(
        &self,
        doc: &Document,
        columns: &[String],
        record: &mut Record,
    ) -> Result<(), StoreError>;
}

/// Pass-through codec: record fields already hold JSON values.
///
/// Columns absent on either side are skipped, not errors — a stored
/// document may predate a schema change.
pub struct DirectCodec;

impl RecordCodec for DirectCodec {
    fn encode(
        &self,
        record: &Record,
        columns: &[String],
        doc: &mut Document,
    ) -> Result<(), StoreError> {
        for column in columns {
            if let Some(value) = record.fields.get(column) {
                doc.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn decode(
        &self,
        doc: &Document,
        columns: &[String],
        record: &mut Record,
    ) -> Result<(), StoreError> {
        for column in columns {
            if let Some(value) = doc.get(column) {
                record.fields.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }
}

// ── Response body decoding ──────────────────────────────────────────

/// Parse a response body as a single JSON document.
pub fn parse_document(url: &str, body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::MalformedResponse {
            url: url.to_string(),
            detail: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(StoreError::MalformedResponse {
            url: url.to_string(),
            detail: e.to_string(),
        }),
    }
}

/// Parse a response body as a JSON array of documents.
pub fn parse_array(url: &str, body: &str) -> Result<Vec<Document>, StoreError> {
    let value = serde_json::from_str::<Value>(body).map_err(|e| StoreError::MalformedResponse {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    let Value::Array(items) = value else {
        return Err(StoreError::MalformedResponse {
            url: url.to_string(),
            detail: format!("expected a JSON array, got {}", json_kind(&value)),
        });
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::MalformedResponse {
                url: url.to_string(),
                detail: format!("expected array of objects, got {}", json_kind(&other)),
            }),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::sample_record;
    use serde_json::json;

    #[test]
    fn test_direct_codec_encodes_subset() {
        let mut record = sample_record();
        record.fields.insert("name".to_string(), json!("alice"));
        record.fields.insert("age".to_string(), json!(42));

        let mut doc = Document::new();
        DirectCodec
            .encode(&record, &["name".to_string()], &mut doc)
            .unwrap();
        assert_eq!(doc.get("name"), Some(&json!("alice")));
        assert!(doc.get("age").is_none());
    }

    #[test]
    fn test_direct_codec_decode_roundtrip() {
        let mut record = sample_record();
        record.fields.insert("name".to_string(), json!("alice"));
        record.fields.insert("age".to_string(), json!(42));

        let columns = ["name".to_string(), "age".to_string()];
        let mut doc = Document::new();
        DirectCodec.encode(&record, &columns, &mut doc).unwrap();

        let mut fetched = sample_record();
        DirectCodec.decode(&doc, &columns, &mut fetched).unwrap();
        assert_eq!(fetched.fields, record.fields);
    }

    #[test]
    fn test_direct_codec_skips_absent_columns() {
        let record = sample_record();
        let mut doc = Document::new();
        DirectCodec
            .encode(&record, &["missing".to_string()], &mut doc)
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_document_rejects_non_object() {
        let err = parse_document("http://x/y", "[1, 2]").unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_array_rejects_garbage() {
        assert!(parse_array("http://x/y", "<xml/>").is_err());
        assert!(parse_array("http://x/y", "{\"a\": 1}").is_err());
        assert!(parse_array("http://x/y", "[1]").is_err());
    }

    #[test]
    fn test_parse_array_of_objects() {
        let docs = parse_array("http://x/y", r#"[{"id": "1"}, {"id": "2"}]"#).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].get("id"), Some(&json!("2")));
    }

    #[test]
    fn test_document_preserves_insertion_order() {
        let mut doc = Document::new();
        doc.insert("z".to_string(), json!(1));
        doc.insert("a".to_string(), json!(2));
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
