//! Listing response decoding.
//!
//! A listing GET can come back in two incompatible shapes.  Backends with
//! a native JSON endpoint return an array of per-record documents.  Plain
//! bucket APIs return their native `<ListBucketResult>` XML key
//! enumeration instead; that fallback is recognized by `Content-Type` and
//! decoded here into identity-only entries.

use std::collections::BTreeSet;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::errors::StoreError;
use crate::record::ListingEntry;

/// Whether a response `Content-Type` announces the XML key enumeration.
///
/// An optional charset suffix (`application/xml; charset=UTF-8`) is
/// ignored.
pub fn is_xml_listing(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim();
    media_type.eq_ignore_ascii_case("application/xml") || media_type.eq_ignore_ascii_case("text/xml")
}

/// Parse a `<ListBucketResult>` body into deduplicated identity entries.
///
/// Each `<Contents><Key>` of the form `<typeName>/<primaryKeyText>` yields
/// one entry.  Keys with no `/` at position ≥ 1, or an empty remainder,
/// are silently skipped.  Duplicate (type, key) pairs collapse.
pub fn parse_xml_keys(url: &str, body: &str) -> Result<Vec<ListingEntry>, StoreError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut entries = BTreeSet::new();
    let mut in_contents = false;
    let mut in_key = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"Contents" => in_contents = true,
                b"Key" if in_contents => in_key = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"Contents" => in_contents = false,
                b"Key" => in_key = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_key => {
                let key_text = t.unescape().map_err(|e| StoreError::MalformedResponse {
                    url: url.to_string(),
                    detail: e.to_string(),
                })?;
                if let Some(entry) = split_key(&key_text) {
                    entries.insert(entry);
                } else {
                    debug!(key = %key_text, "ignoring listing key without type/key shape");
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(StoreError::MalformedResponse {
                    url: url.to_string(),
                    detail: e.to_string(),
                })
            }
        }
    }

    Ok(entries.into_iter().collect())
}

/// Split a bucket key on its first `/` into (type, primary key).
///
/// Returns `None` when the `/` is absent or at position 0, or when the
/// remainder is empty.
fn split_key(key_text: &str) -> Option<ListingEntry> {
    let slash = key_text.find('/')?;
    if slash < 1 {
        return None;
    }
    let primary_key = &key_text[slash + 1..];
    if primary_key.is_empty() {
        return None;
    }
    Some(ListingEntry {
        type_name: key_text[..slash].to_string(),
        primary_key: primary_key.to_string(),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
